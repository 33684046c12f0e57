//! Error taxonomy for the ingestion and query pipeline.
//!
//! Callers need to distinguish "bad input" (Parse, Validation) from
//! "system state conflict" (DuplicateScan) from "not yet scanned"
//! (NotFound). Anything below the store surfaces as Storage.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, MonitorError>;

/// Unified error type for all monitor operations.
#[derive(Error, Debug)]
pub enum MonitorError {
    /// Raw scanner output is malformed or missing the top-level results
    /// collection. Fatal to the ingestion call; the store is untouched.
    #[error("failed to parse scanner output: {reason}")]
    Parse {
        reason: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// A scan with this id is already stored. Ingestion is append-only;
    /// the original record is left untouched.
    #[error("scan {scan_id} already ingested")]
    DuplicateScan { scan_id: String },

    /// Caller-supplied parameter outside its allowed range or format.
    #[error("invalid parameter: {message}")]
    Validation { message: String },

    /// Lookup of a specific scan id that does not exist. A repository
    /// with zero recorded scans is zero-valued data, not this error.
    #[error("scan {scan_id} not found")]
    NotFound { scan_id: String },

    /// Database-level failure.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Filesystem failure while opening the store.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl MonitorError {
    /// Parse error from a serde_json failure.
    pub fn parse(source: serde_json::Error) -> Self {
        Self::Parse {
            reason: source.to_string(),
            source: Some(source),
        }
    }

    /// Parse error for structurally invalid output (valid JSON, wrong shape).
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Parse {
            reason: reason.into(),
            source: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}
