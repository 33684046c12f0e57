//! Data models for scan storage and queries.
//!
//! These models represent the rows of the scan_summaries and findings
//! tables, plus the shapes returned by aggregate queries.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::normalize::severity::Severity;

/// Aggregate metadata and severity tally for one completed analysis run.
///
/// Invariant: `total_findings == error_count + warning_count + info_count`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSummary {
    pub scan_id: String,
    pub repository: String,
    pub commit: String,
    pub timestamp: DateTime<Utc>,
    pub total_findings: u64,
    pub error_count: u64,
    pub warning_count: u64,
    pub info_count: u64,
    /// Elapsed scan time in seconds; 0 if unknown.
    pub duration: f64,
    /// Distinct rule ids that produced at least one finding.
    pub rules_applied: u64,
}

/// A single reported issue at a specific code location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    /// Never empty; "unknown" when absent from the source data.
    pub rule_id: String,
    pub severity: Severity,
    pub category: Option<String>,
    pub owasp: Option<String>,
    pub cwe: Option<String>,
    /// File path relative to the scanned root; empty if absent.
    pub path: String,
    /// 1-based; `end_line >= start_line` when both present.
    pub start_line: Option<u32>,
    pub end_line: Option<u32>,
    pub message: String,
}

/// Finding counts grouped by severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityDistribution {
    pub errors: u64,
    pub warnings: u64,
    pub infos: u64,
}

impl SeverityDistribution {
    pub fn total(&self) -> u64 {
        self.errors + self.warnings + self.infos
    }
}

/// One of the most frequently violated rules for a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopIssue {
    pub rule_id: String,
    pub count: u64,
}

/// The most recent scan recorded for a repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LastScan {
    pub timestamp: DateTime<Utc>,
    pub total_findings: u64,
    pub duration: f64,
}

/// Per-repository aggregate statistics across all recorded scans.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryStats {
    pub repository: String,
    pub total_scans: u64,
    pub severity_distribution: SeverityDistribution,
    /// At most five entries, ranked by count descending then rule_id.
    pub top_issues: Vec<TopIssue>,
    /// None if the repository has no recorded scans.
    pub last_scan: Option<LastScan>,
}

/// One calendar date's summed severity counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub errors: u64,
    pub warnings: u64,
    pub infos: u64,
}

/// A recently recorded finding, joined with its scan metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentFinding {
    pub id: i64,
    pub repository: String,
    pub rule_id: String,
    pub severity: Severity,
    pub path: String,
    pub start_line: Option<u32>,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}
