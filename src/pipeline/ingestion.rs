//! Main scan ingestion pipeline.
//!
//! Coordinates one ingestion call:
//! 1. Normalize the raw scanner output
//! 2. Persist summary and findings as one transaction
//! 3. Return the assigned scan_id
//!
//! A parse failure or duplicate scan_id aborts the call with nothing
//! persisted.

use crate::error::Result;
use crate::normalize::semgrep::normalize_scan;
use crate::pipeline::context::ScanContext;
use crate::storage::store::ScanStore;

/// Ingest one raw scanner result set.
///
/// Main entry point for scan processing. Fails with `Parse` if the raw
/// output is malformed, or `DuplicateScan` if the context's scan_id is
/// already stored.
pub fn ingest_scan(store: &ScanStore, ctx: &ScanContext, raw: &str) -> Result<String> {
    let log_ctx = ctx.log_context();

    log::info!(
        "{} SCAN_RECEIVED commit={} bytes={}",
        log_ctx,
        ctx.commit,
        raw.len()
    );

    let (summary, findings) = normalize_scan(raw, ctx)?;

    store.insert(&summary, &findings)?;

    log::info!(
        "{} SCAN_STORED findings={} errors={} warnings={} infos={}",
        log_ctx,
        summary.total_findings,
        summary.error_count,
        summary.warning_count,
        summary.info_count
    );

    Ok(summary.scan_id)
}
