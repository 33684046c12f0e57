//! Scan context management.
//!
//! Carries the identifiers for one ingestion call. Everything the pipeline
//! needs to know about a scan arrives through this struct; there is no
//! ambient configuration.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::logging::structured::LogContext;

/// Context for one scan ingestion.
#[derive(Debug, Clone)]
pub struct ScanContext {
    /// Generator-assigned, unique per ingestion.
    pub scan_id: String,
    pub repository: String,
    pub commit: String,
    /// When the scan completed; all time-windowed queries key on this.
    pub timestamp: DateTime<Utc>,
    /// Caller-measured scan duration in seconds, overriding whatever the
    /// raw output reports.
    pub duration: Option<f64>,
}

impl ScanContext {
    /// Build a context for a scan of `repository` at `commit`.
    ///
    /// `completed_at` is the RFC 3339 completion time from the underlying
    /// scan; the current time is used when it is absent or unparseable.
    pub fn new(repository: &str, commit: &str, completed_at: Option<&str>) -> Self {
        let scan_id = format!("scan-{}", Uuid::new_v4());

        let timestamp = completed_at
            .and_then(|ts| {
                DateTime::parse_from_rfc3339(ts)
                    .map(|dt| dt.with_timezone(&Utc))
                    .ok()
            })
            .unwrap_or_else(Utc::now);

        Self {
            scan_id,
            repository: repository.to_string(),
            commit: commit.to_string(),
            timestamp,
            duration: None,
        }
    }

    /// Attach a caller-measured duration (seconds, clamped to >= 0).
    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration = Some(seconds.max(0.0));
        self
    }

    pub fn log_context(&self) -> LogContext {
        LogContext::new(&self.repository).with_scan(&self.scan_id)
    }
}
