//! Consolidated repository reports.
//!
//! The aggregate security score is computed from the repository's
//! cumulative severity distribution across all recorded scans, not just
//! the latest scan: the score represents overall historical exposure,
//! while the trend shows recent movement.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::scoring::engine::{grade, score, score_counts, Grade};
use crate::storage::models::{RepositoryStats, TrendPoint};
use crate::storage::store::ScanStore;

/// Grade shown when a repository has no recorded scans. A no-data
/// sentinel, distinct from the score engine's F band.
pub const NO_DATA_GRADE: &str = "N/A";

/// Days of trend history included in a summary report.
pub const REPORT_TREND_DAYS: u32 = 7;

/// Consolidated report for one repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryReport {
    pub repository: String,
    pub security_score: f64,
    /// Letter grade, or "N/A" when nothing has been scanned yet.
    pub security_grade: String,
    pub statistics: RepositoryStats,
    pub trend: Vec<TrendPoint>,
}

/// Security score for one repository, as of `timestamp`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityScore {
    pub repository: String,
    pub score: f64,
    pub grade: String,
    pub timestamp: DateTime<Utc>,
}

/// One row of the dashboard's recent-scan feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentScan {
    pub repository: String,
    pub timestamp: DateTime<Utc>,
    pub total_findings: u64,
    /// Score of this scan alone, not the repository aggregate.
    pub score: f64,
}

/// Summary statistics across the whole store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub total_repositories: u64,
    pub total_scans: u64,
    pub total_findings: u64,
    /// Mean of the per-repository aggregate scores; 0 with no repositories.
    pub average_score: f64,
    pub recent_scans: Vec<RecentScan>,
}

/// Build the consolidated report for one repository.
pub fn summary_report(store: &ScanStore, repository: &str) -> Result<SummaryReport> {
    let statistics = store.repository_stats(repository)?;

    let (security_score, security_grade) = match aggregate_score(&statistics) {
        Some((s, g)) => (s, g.as_str().to_string()),
        None => (0.0, NO_DATA_GRADE.to_string()),
    };

    let trend = store.trend(Some(repository), REPORT_TREND_DAYS)?;

    log::info!(
        "[repo={}] REPORT_BUILT score={} grade={} scans={}",
        repository,
        security_score,
        security_grade,
        statistics.total_scans
    );

    Ok(SummaryReport {
        repository: repository.to_string(),
        security_score,
        security_grade,
        statistics,
        trend,
    })
}

/// The repository's aggregate score and grade, as of now.
pub fn repository_score(store: &ScanStore, repository: &str) -> Result<SecurityScore> {
    let statistics = store.repository_stats(repository)?;

    let (score, grade) = match aggregate_score(&statistics) {
        Some((s, g)) => (s, g.as_str().to_string()),
        None => (0.0, NO_DATA_GRADE.to_string()),
    };

    Ok(SecurityScore {
        repository: repository.to_string(),
        score,
        grade,
        timestamp: Utc::now(),
    })
}

/// Summary statistics across all repositories for the dashboard feed.
pub fn dashboard_summary(store: &ScanStore, recent_limit: usize) -> Result<DashboardSummary> {
    let (total_repositories, total_scans, total_findings) = store.totals()?;

    let repositories = store.repositories()?;
    let mut score_sum = 0.0;
    let mut scored = 0u64;
    for repository in &repositories {
        let stats = store.repository_stats(repository)?;
        if let Some((s, _)) = aggregate_score(&stats) {
            score_sum += s;
            scored += 1;
        }
    }
    let average_score = if scored == 0 {
        0.0
    } else {
        (score_sum / scored as f64 * 100.0).round() / 100.0
    };

    let recent_scans = store
        .recent_scans(recent_limit)?
        .into_iter()
        .map(|summary| RecentScan {
            score: score(&summary),
            repository: summary.repository,
            timestamp: summary.timestamp,
            total_findings: summary.total_findings,
        })
        .collect();

    Ok(DashboardSummary {
        total_repositories,
        total_scans,
        total_findings,
        average_score,
        recent_scans,
    })
}

/// Score over the cumulative severity distribution. None when the
/// repository has no recorded scans.
fn aggregate_score(stats: &RepositoryStats) -> Option<(f64, Grade)> {
    stats.last_scan.as_ref()?;
    let dist = stats.severity_distribution;
    let s = score_counts(dist.errors, dist.warnings, dist.infos);
    Some((s, grade(s)))
}
