//! Failure modes of a sync run that are reported as data, not raised

use serde::{Deserialize, Serialize};

use crate::models::InvalidCursor;

/// Error code reported when the feed never produced a usable cursor
pub const EMPTY_NEXT_CURSOR: &str = "EMPTY_NEXT_CURSOR";
/// Error code reported when the feed produced a cursor we refuse to persist
pub const INVALID_NEXT_CURSOR: &str = "INVALID_NEXT_CURSOR";
/// Error code for a request that exceeded its timeout budget
pub const TIMEOUT: &str = "TIMEOUT";
/// Error code for connection-level or decoding failures
pub const TRANSPORT_ERROR: &str = "TRANSPORT_ERROR";

/// Structured error, in the shape persisted to meta records and exports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub status_code: Option<u16>,
    pub error_code: String,
    #[serde(default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub display_message: Option<String>,
}

/// A failed upstream call: API error response, timeout, or transport failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("upstream fault {}", describe(.0))]
pub struct UpstreamFault(pub ErrorDetail);

fn describe(detail: &ErrorDetail) -> String {
    let message = detail.display_message.as_deref().unwrap_or("no message");
    match detail.status_code {
        Some(status) => format!("{}: {} (HTTP {})", detail.error_code, message, status),
        None => format!("{}: {}", detail.error_code, message),
    }
}

impl UpstreamFault {
    pub fn new(
        status_code: Option<u16>,
        error_code: impl Into<String>,
        error_type: Option<String>,
        display_message: Option<String>,
    ) -> Self {
        Self(ErrorDetail {
            status_code,
            error_code: error_code.into(),
            error_type,
            display_message,
        })
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(None, TIMEOUT, Some("TRANSPORT".into()), Some(message.into()))
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(None, TRANSPORT_ERROR, Some("TRANSPORT".into()), Some(message.into()))
    }

    pub fn error_code(&self) -> &str {
        &self.0.error_code
    }
}

/// Why a sync run stopped before reaching the end of the feed
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Upstream(#[from] UpstreamFault),
    #[error("next_cursor stayed empty after {attempts} attempts")]
    EmptyCursorExhausted { attempts: u32 },
    #[error("upstream returned an unusable next_cursor: {0}")]
    InvalidNextCursor(InvalidCursor),
}

impl SyncError {
    pub fn error_code(&self) -> &str {
        match self {
            Self::Upstream(fault) => fault.error_code(),
            Self::EmptyCursorExhausted { .. } => EMPTY_NEXT_CURSOR,
            Self::InvalidNextCursor(_) => INVALID_NEXT_CURSOR,
        }
    }

    /// Structured form for persistence and exports
    pub fn detail(&self) -> ErrorDetail {
        match self {
            Self::Upstream(fault) => fault.0.clone(),
            other => ErrorDetail {
                status_code: None,
                error_code: other.error_code().to_string(),
                error_type: Some("SYNC_ERROR".into()),
                display_message: Some(other.to_string()),
            },
        }
    }
}
