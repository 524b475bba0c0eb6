//! Change-feed cursor model

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum accepted cursor length
pub const MAX_CURSOR_LEN: usize = 128;

/// Error for a cursor that fails charset or length validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidCursor {
    #[error("cursor is {len} characters long (max {max})", max = MAX_CURSOR_LEN)]
    TooLong { len: usize },
    #[error("cursor contains disallowed character {ch:?} at position {position}")]
    BadCharacter { ch: char, position: usize },
}

/// Opaque continuation token of the transactions change-feed.
///
/// The empty cursor means "start of history". A non-empty cursor is
/// restricted to `[A-Za-z0-9=]{1,128}`, so it is safe to persist and to
/// embed in generated identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cursor(String);

impl Cursor {
    /// The cursor that requests full history
    pub fn start() -> Self {
        Self(String::new())
    }

    /// Validate and wrap a raw cursor string
    pub fn parse(raw: impl Into<String>) -> Result<Self, InvalidCursor> {
        let raw = raw.into();
        validate(&raw)?;
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this cursor points at the start of history
    pub fn is_start(&self) -> bool {
        self.0.is_empty()
    }
}

fn validate(raw: &str) -> Result<(), InvalidCursor> {
    let len = raw.chars().count();
    if len > MAX_CURSOR_LEN {
        return Err(InvalidCursor::TooLong { len });
    }
    if let Some((position, ch)) = raw
        .chars()
        .enumerate()
        .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '='))
    {
        return Err(InvalidCursor::BadCharacter { ch, position });
    }
    Ok(())
}

impl TryFrom<String> for Cursor {
    type Error = InvalidCursor;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl From<Cursor> for String {
    fn from(c: Cursor) -> Self {
        c.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_cursor_is_empty() {
        let cursor = Cursor::start();
        assert!(cursor.is_start());
        assert_eq!(cursor.as_str(), "");
        assert_eq!(Cursor::parse("").unwrap(), cursor);
    }

    #[test]
    fn test_accepts_allowed_charset() {
        let cursor = Cursor::parse("CAESJ0tSRzZWemF3bz0=").unwrap();
        assert_eq!(cursor.as_str(), "CAESJ0tSRzZWemF3bz0=");
        assert!(!cursor.is_start());
    }

    #[test]
    fn test_rejects_disallowed_characters() {
        for raw in ["abc/def", "abc+def", "has space", "../etc", "cur_sor", "é"] {
            assert!(
                matches!(Cursor::parse(raw), Err(InvalidCursor::BadCharacter { .. })),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn test_length_bound() {
        assert!(Cursor::parse("a".repeat(MAX_CURSOR_LEN)).is_ok());
        assert_eq!(
            Cursor::parse("a".repeat(MAX_CURSOR_LEN + 1)),
            Err(InvalidCursor::TooLong { len: MAX_CURSOR_LEN + 1 })
        );
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: Cursor = serde_json::from_str(r#""abc=""#).unwrap();
        assert_eq!(ok.as_str(), "abc=");
        assert!(serde_json::from_str::<Cursor>(r#""a/b""#).is_err());
    }
}
