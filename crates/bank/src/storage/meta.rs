//! Persisted per-run sync metadata

use serde::{Deserialize, Serialize};

use crate::models::AccountRef;
use crate::sync::{ErrorDetail, SyncResult};

/// Error as stored in a meta record: structured, or a bare message
/// written by older tooling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaError {
    Detail(ErrorDetail),
    Message(String),
}

impl MetaError {
    pub fn error_code(&self) -> Option<&str> {
        match self {
            Self::Detail(detail) => Some(&detail.error_code),
            Self::Message(_) => None,
        }
    }
}

/// Outcome of one sync run, written once and never modified
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaRecord {
    pub account_id: String,
    /// Raw cursor, kept even when the run failed
    pub cursor: Option<String>,
    pub error: Option<MetaError>,
}

impl MetaRecord {
    pub fn from_result(account: &AccountRef, result: &SyncResult) -> Self {
        Self {
            account_id: account.account_id.clone(),
            cursor: Some(result.cursor.as_str().to_string()),
            error: result.error.as_ref().map(|e| MetaError::Detail(e.detail())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_structured_and_string_errors() {
        let structured: MetaRecord = serde_json::from_str(
            r#"{"account_id": "a", "cursor": "c1", "error": {"status_code": null, "error_code": "EMPTY_NEXT_CURSOR"}}"#,
        )
        .unwrap();
        assert_eq!(
            structured.error.as_ref().and_then(|e| e.error_code()),
            Some("EMPTY_NEXT_CURSOR")
        );

        let message: MetaRecord =
            serde_json::from_str(r#"{"account_id": "a", "cursor": null, "error": "boom"}"#).unwrap();
        assert_eq!(message.error, Some(MetaError::Message("boom".into())));
        assert!(message.cursor.is_none());

        let clean: MetaRecord =
            serde_json::from_str(r#"{"account_id": "a", "cursor": "c2", "error": null}"#).unwrap();
        assert!(clean.error.is_none());
    }
}
