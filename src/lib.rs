//! ScanLens Core - Scan result ingestion and security scoring pipeline
//!
//! This crate provides the core scan processing functionality for ScanLens:
//! raw scanner output is normalized into a canonical model, persisted per
//! repository/commit with referential integrity, and turned into a security
//! posture (score, grade, trend) for dashboards and APIs. The surrounding
//! service layer (webhook receiver, report rendering) calls into this crate
//! and serializes its results.
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `normalize` - Raw scanner output to canonical summary + findings
//! - `pipeline` - Ingestion orchestrator and per-scan context
//! - `storage` - Embedded SQLite store, models and aggregate queries
//! - `scoring` - Pure score/grade computation
//! - `report` - Consolidated repository and dashboard reports
//! - `logging` - Structured logging with scan context
//! - `error` - Typed error taxonomy

use std::path::PathBuf;

pub mod error;
pub mod logging;
pub mod normalize;
pub mod pipeline;
pub mod report;
pub mod scoring;
pub mod storage;

pub use error::{MonitorError, Result};
pub use normalize::severity::Severity;
pub use pipeline::context::ScanContext;
pub use report::aggregator::{DashboardSummary, SecurityScore, SummaryReport};
pub use scoring::engine::Grade;
pub use storage::models::{
    Finding, RecentFinding, RepositoryStats, ScanSummary, TrendPoint,
};
pub use storage::store::ScanStore;

use pipeline::ingestion::ingest_scan;
use report::aggregator::{dashboard_summary, repository_score, summary_report};

/// Initialize the module-level logger.
pub fn init_logger() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp_millis()
        .try_init();
}

/// Configuration for one monitor instance.
///
/// Passed explicitly to `ScanMonitor::open`; nothing in this crate reads
/// ambient global state.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Location of the SQLite database file.
    pub db_path: PathBuf,
    /// Trend window used when the caller does not specify one.
    pub default_trend_days: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("scanlens.db"),
            default_trend_days: report::aggregator::REPORT_TREND_DAYS,
        }
    }
}

/// Facade wiring the store, normalizer, score engine and aggregator into
/// the operation surface consumed by the API layer.
pub struct ScanMonitor {
    store: ScanStore,
    config: MonitorConfig,
}

impl ScanMonitor {
    /// Open (or create) the monitor's database and return a ready monitor.
    pub fn open(config: MonitorConfig) -> Result<Self> {
        init_logger();
        let store = ScanStore::open(&config.db_path)?;
        Ok(Self { store, config })
    }

    /// Monitor backed by an in-memory database. Used by tests.
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            store: ScanStore::open_in_memory()?,
            config: MonitorConfig::default(),
        })
    }

    /// The underlying store, for callers composing their own queries.
    pub fn store(&self) -> &ScanStore {
        &self.store
    }

    /// Normalize and persist one raw scanner result set.
    ///
    /// Returns the assigned scan_id. Fails with `Parse` on malformed
    /// output or `DuplicateScan` on a scan_id collision.
    pub fn ingest(&self, ctx: &ScanContext, raw: &str) -> Result<String> {
        ingest_scan(&self.store, ctx, raw)
    }

    /// Aggregate statistics for one repository; zero-valued when the
    /// repository has never been scanned.
    pub fn stats(&self, repository: &str) -> Result<RepositoryStats> {
        self.store.repository_stats(repository)
    }

    /// Aggregate security score and grade for one repository.
    pub fn score(&self, repository: &str) -> Result<SecurityScore> {
        repository_score(&self.store, repository)
    }

    /// Daily severity totals. `repository = None` spans all repositories;
    /// `window_days = None` uses the configured default.
    pub fn trend(
        &self,
        repository: Option<&str>,
        window_days: Option<u32>,
    ) -> Result<Vec<TrendPoint>> {
        let days = window_days.unwrap_or(self.config.default_trend_days);
        self.store.trend(repository, days)
    }

    /// Consolidated report for one repository.
    pub fn report(&self, repository: &str) -> Result<SummaryReport> {
        summary_report(&self.store, repository)
    }

    /// One stored scan summary. Fails with `NotFound` for an unknown id.
    pub fn scan(&self, scan_id: &str) -> Result<ScanSummary> {
        self.store.scan_summary(scan_id)
    }

    /// All findings of one stored scan, in normalized order.
    pub fn findings(&self, scan_id: &str) -> Result<Vec<Finding>> {
        self.store.findings_for_scan(scan_id)
    }

    /// Distinct repositories with at least one recorded scan.
    pub fn repositories(&self) -> Result<Vec<String>> {
        self.store.repositories()
    }

    /// Recently recorded findings, optionally narrowed to one severity.
    pub fn recent_findings(
        &self,
        limit: usize,
        severity: Option<Severity>,
    ) -> Result<Vec<RecentFinding>> {
        self.store.recent_findings(limit, severity)
    }

    /// Summary statistics across the whole store.
    pub fn dashboard(&self, recent_limit: usize) -> Result<DashboardSummary> {
        dashboard_summary(&self.store, recent_limit)
    }
}
