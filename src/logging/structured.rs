//! Structured logging utilities.
//!
//! Provides context-aware logging with repository and scan_id included
//! in every log message.

use std::fmt;

/// Logging context for monitor operations.
#[derive(Debug, Clone)]
pub struct LogContext {
    pub repository: String,
    pub scan_id: Option<String>,
}

impl LogContext {
    pub fn new(repository: &str) -> Self {
        Self {
            repository: repository.to_string(),
            scan_id: None,
        }
    }

    pub fn with_scan(&self, scan_id: &str) -> Self {
        Self {
            repository: self.repository.clone(),
            scan_id: Some(scan_id.to_string()),
        }
    }
}

impl fmt::Display for LogContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scan_id {
            Some(sid) => write!(f, "[repo={}] [scan={}]", self.repository, sid),
            None => write!(f, "[repo={}]", self.repository),
        }
    }
}
