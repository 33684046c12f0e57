//! Raw scanner output normalization.
//!
//! Parses one semgrep-style JSON result set into a canonical `ScanSummary`
//! plus an ordered list of `Finding`s. The scanner frequently omits fields,
//! so every extraction degrades to a documented default instead of failing;
//! only a missing or ill-typed top-level `results` collection is an error.

use std::cmp::Ordering;
use std::collections::HashSet;

use serde_json::Value;

use crate::error::{MonitorError, Result};
use crate::logging::structured::LogContext;
use crate::normalize::severity::{raw_severity_rank, Severity};
use crate::pipeline::context::ScanContext;
use crate::storage::models::{Finding, ScanSummary};

/// Normalize one raw scanner result set.
///
/// # Arguments
/// * `raw` - The scanner's JSON output, as written to its output file
/// * `ctx` - Scan context supplying scan_id, repository, commit and timestamp
///
/// # Returns
/// The scan summary and its findings, sorted by severity rank, then path,
/// then start line. Zero results is valid and yields zero findings.
pub fn normalize_scan(raw: &str, ctx: &ScanContext) -> Result<(ScanSummary, Vec<Finding>)> {
    let log_ctx = ctx.log_context();

    let data: Value = serde_json::from_str(raw).map_err(|e| {
        log::warn!("{} PARSE_FAILED error={}", log_ctx, e);
        MonitorError::parse(e)
    })?;

    let results = data
        .get("results")
        .and_then(|r| r.as_array())
        .ok_or_else(|| {
            log::warn!("{} PARSE_FAILED reason=missing_results_array", log_ctx);
            MonitorError::malformed("missing top-level results array")
        })?;

    let mut entries: Vec<(u8, Finding)> = Vec::with_capacity(results.len());
    let mut rules: HashSet<String> = HashSet::new();
    let mut error_count = 0u64;
    let mut warning_count = 0u64;
    let mut info_count = 0u64;

    for record in results {
        let (raw_rank, finding) = normalize_record(record, &log_ctx);

        match finding.severity {
            Severity::Error => error_count += 1,
            Severity::Warning => warning_count += 1,
            Severity::Info => info_count += 1,
        }
        rules.insert(finding.rule_id.clone());
        entries.push((raw_rank, finding));
    }

    // The ordering contract for every downstream view: severity rank of the
    // raw value (unknown severities last), then path, then start line.
    entries.sort_by(|a, b| compare_entries(a, b));
    let findings: Vec<Finding> = entries.into_iter().map(|(_, f)| f).collect();

    let summary = ScanSummary {
        scan_id: ctx.scan_id.clone(),
        repository: ctx.repository.clone(),
        commit: ctx.commit.clone(),
        timestamp: ctx.timestamp,
        total_findings: findings.len() as u64,
        error_count,
        warning_count,
        info_count,
        duration: ctx.duration.unwrap_or_else(|| extract_duration(&data)),
        rules_applied: rules.len() as u64,
    };

    log::info!(
        "{} NORMALIZE_COMPLETE findings={} errors={} warnings={} infos={} rules={}",
        log_ctx,
        summary.total_findings,
        error_count,
        warning_count,
        info_count,
        summary.rules_applied
    );

    Ok((summary, findings))
}

fn compare_entries(a: &(u8, Finding), b: &(u8, Finding)) -> Ordering {
    a.0.cmp(&b.0)
        .then_with(|| a.1.path.cmp(&b.1.path))
        .then_with(|| {
            a.1.start_line
                .unwrap_or(0)
                .cmp(&b.1.start_line.unwrap_or(0))
        })
}

/// Normalize a single raw result record, repairing missing fields.
///
/// Returns the raw severity rank alongside the finding so the sort can
/// order unrecognized severities last even though they are stored as Info.
fn normalize_record(record: &Value, ctx: &LogContext) -> (u8, Finding) {
    let extra = record.get("extra");

    let rule_id = record
        .get("check_id")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("unknown")
        .to_string();

    // Severity lives in the extra block; older scanner versions put it at
    // the top level.
    let raw_severity = extra
        .and_then(|e| e.get("severity"))
        .or_else(|| record.get("severity"))
        .and_then(|v| v.as_str())
        .unwrap_or("INFO");
    let severity = Severity::from_raw(raw_severity);

    if severity.as_str() != raw_severity.to_ascii_uppercase() {
        log::debug!(
            "{} SEVERITY_COERCED rule={} raw={:?} stored={}",
            ctx,
            rule_id,
            raw_severity,
            severity.as_str()
        );
    }

    let metadata = extra.and_then(|e| e.get("metadata"));

    let path = record
        .get("path")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();

    let start_line = location_line(record, "start");
    let mut end_line = location_line(record, "end");
    // A scanner that reports an end before the start gets clamped.
    if let (Some(s), Some(e)) = (start_line, end_line) {
        if e < s {
            end_line = Some(s);
        }
    }

    let message = extra
        .and_then(|e| e.get("message"))
        .or_else(|| record.get("message"))
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();

    let finding = Finding {
        rule_id,
        severity,
        category: metadata_tag(metadata, "category"),
        owasp: metadata_tag(metadata, "owasp"),
        cwe: metadata_tag(metadata, "cwe"),
        path,
        start_line,
        end_line,
        message,
    };

    (raw_severity_rank(raw_severity), finding)
}

/// Read a 1-based line number from a nested location block.
fn location_line(record: &Value, key: &str) -> Option<u32> {
    record
        .get(key)?
        .get("line")?
        .as_u64()
        .and_then(|l| u32::try_from(l).ok())
        .filter(|l| *l > 0)
}

/// Read a classification tag from the metadata block. Semgrep emits these
/// as either a plain string or an array of strings; the first entry wins.
fn metadata_tag(metadata: Option<&Value>, key: &str) -> Option<String> {
    match metadata?.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Array(arr) => arr
            .iter()
            .find_map(|e| e.as_str().filter(|s| !s.is_empty()).map(|s| s.to_string())),
        _ => None,
    }
}

/// Pull the scan duration out of the scanner's timing block, if present.
fn extract_duration(data: &Value) -> f64 {
    data.get("time")
        .and_then(|t| {
            t.get("profiling_times")
                .and_then(|p| p.get("total_time"))
                .or_else(|| t.get("total_time"))
        })
        .and_then(|v| v.as_f64())
        .filter(|d| *d >= 0.0)
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> ScanContext {
        ScanContext::new("acme/api", "deadbeef", Some("2026-08-01T12:00:00Z"))
    }

    fn record(severity: &str, path: &str, line: u64) -> Value {
        json!({
            "check_id": "rules.hardcoded-credentials",
            "path": path,
            "start": {"line": line, "col": 1},
            "end": {"line": line + 1, "col": 10},
            "extra": {
                "severity": severity,
                "message": "Hardcoded credentials detected",
                "metadata": {
                    "category": "security",
                    "owasp": "A07:2021",
                    "cwe": ["CWE-798: Use of Hard-coded Credentials"]
                }
            }
        })
    }

    #[test]
    fn test_normalize_counts_and_invariant() {
        let raw = json!({
            "results": [
                record("ERROR", "src/a.py", 10),
                record("ERROR", "src/b.py", 3),
                record("WARNING", "src/a.py", 20),
                record("WARNING", "src/c.py", 1),
                record("WARNING", "src/c.py", 9),
                record("INFO", "src/d.py", 2),
            ]
        })
        .to_string();

        let (summary, findings) = normalize_scan(&raw, &ctx()).unwrap();
        assert_eq!(summary.total_findings, 6);
        assert_eq!(summary.error_count, 2);
        assert_eq!(summary.warning_count, 3);
        assert_eq!(summary.info_count, 1);
        assert_eq!(
            summary.total_findings,
            summary.error_count + summary.warning_count + summary.info_count
        );
        assert_eq!(summary.rules_applied, 1);
        assert_eq!(findings.len(), 6);
    }

    #[test]
    fn test_sort_contract() {
        let raw = json!({
            "results": [
                record("INFO", "z.py", 5),
                record("ERROR", "b.py", 9),
                record("WARNING", "a.py", 1),
                record("ERROR", "a.py", 2),
            ]
        })
        .to_string();

        let (_, findings) = normalize_scan(&raw, &ctx()).unwrap();
        let order: Vec<(&str, &str)> = findings
            .iter()
            .map(|f| (f.severity.as_str(), f.path.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("ERROR", "a.py"),
                ("ERROR", "b.py"),
                ("WARNING", "a.py"),
                ("INFO", "z.py"),
            ]
        );
    }

    #[test]
    fn test_errors_ordered_by_path_then_line() {
        let raw = json!({
            "results": [
                record("ERROR", "same.py", 30),
                record("ERROR", "same.py", 4),
            ]
        })
        .to_string();

        let (_, findings) = normalize_scan(&raw, &ctx()).unwrap();
        assert_eq!(findings[0].start_line, Some(4));
        assert_eq!(findings[1].start_line, Some(30));
    }

    #[test]
    fn test_unknown_severity_coerced_but_sorted_last() {
        let raw = json!({
            "results": [
                record("CRITICAL", "a.py", 1),
                record("INFO", "b.py", 1),
            ]
        })
        .to_string();

        let (summary, findings) = normalize_scan(&raw, &ctx()).unwrap();
        // CRITICAL counts as INFO in the tally and in the store...
        assert_eq!(summary.info_count, 2);
        assert_eq!(findings[1].severity, Severity::Info);
        // ...but orders after every recognized severity.
        assert_eq!(findings[1].path, "a.py");
    }

    #[test]
    fn test_missing_fields_repaired_with_defaults() {
        let raw = json!({"results": [{}]}).to_string();

        let (summary, findings) = normalize_scan(&raw, &ctx()).unwrap();
        let f = &findings[0];
        assert_eq!(f.rule_id, "unknown");
        assert_eq!(f.severity, Severity::Info);
        assert_eq!(f.path, "");
        assert_eq!(f.start_line, None);
        assert_eq!(f.end_line, None);
        assert_eq!(f.message, "");
        assert!(f.category.is_none() && f.owasp.is_none() && f.cwe.is_none());
        assert_eq!(summary.info_count, 1);
    }

    #[test]
    fn test_severity_falls_back_to_top_level() {
        let raw = json!({
            "results": [{"check_id": "r1", "severity": "WARNING", "path": "x.py"}]
        })
        .to_string();

        let (summary, findings) = normalize_scan(&raw, &ctx()).unwrap();
        assert_eq!(findings[0].severity, Severity::Warning);
        assert_eq!(summary.warning_count, 1);
    }

    #[test]
    fn test_cwe_accepts_string_and_array() {
        let raw = json!({
            "results": [
                {"check_id": "r1", "path": "x.py",
                 "extra": {"severity": "INFO", "metadata": {"cwe": "CWE-89"}}},
                {"check_id": "r2", "path": "y.py",
                 "extra": {"severity": "INFO", "metadata": {"cwe": ["CWE-798", "CWE-259"]}}},
            ]
        })
        .to_string();

        let (_, findings) = normalize_scan(&raw, &ctx()).unwrap();
        assert_eq!(findings[0].cwe.as_deref(), Some("CWE-89"));
        assert_eq!(findings[1].cwe.as_deref(), Some("CWE-798"));
    }

    #[test]
    fn test_end_line_clamped_to_start() {
        let raw = json!({
            "results": [{
                "check_id": "r1", "path": "x.py",
                "start": {"line": 10}, "end": {"line": 3},
                "extra": {"severity": "ERROR"}
            }]
        })
        .to_string();

        let (_, findings) = normalize_scan(&raw, &ctx()).unwrap();
        assert_eq!(findings[0].start_line, Some(10));
        assert_eq!(findings[0].end_line, Some(10));
    }

    #[test]
    fn test_distinct_rules_counted() {
        let raw = json!({
            "results": [
                {"check_id": "r1", "path": "a.py", "extra": {"severity": "ERROR"}},
                {"check_id": "r1", "path": "b.py", "extra": {"severity": "ERROR"}},
                {"check_id": "r2", "path": "c.py", "extra": {"severity": "INFO"}},
            ]
        })
        .to_string();

        let (summary, _) = normalize_scan(&raw, &ctx()).unwrap();
        assert_eq!(summary.total_findings, 3);
        assert_eq!(summary.rules_applied, 2);
    }

    #[test]
    fn test_empty_results_is_valid() {
        let (summary, findings) = normalize_scan(r#"{"results": []}"#, &ctx()).unwrap();
        assert_eq!(summary.total_findings, 0);
        assert_eq!(summary.error_count, 0);
        assert_eq!(summary.warning_count, 0);
        assert_eq!(summary.info_count, 0);
        assert_eq!(summary.rules_applied, 0);
        assert!(findings.is_empty());
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let err = normalize_scan("not json{", &ctx()).unwrap_err();
        assert!(matches!(err, MonitorError::Parse { .. }));
    }

    #[test]
    fn test_missing_results_is_parse_error() {
        let err = normalize_scan(r#"{"version": "1.0"}"#, &ctx()).unwrap_err();
        assert!(matches!(err, MonitorError::Parse { .. }));

        // results present but not an array is just as malformed
        let err = normalize_scan(r#"{"results": "nope"}"#, &ctx()).unwrap_err();
        assert!(matches!(err, MonitorError::Parse { .. }));
    }

    #[test]
    fn test_duration_from_timing_block() {
        let raw = json!({
            "results": [],
            "time": {"profiling_times": {"total_time": 12.5}}
        })
        .to_string();
        let (summary, _) = normalize_scan(&raw, &ctx()).unwrap();
        assert_eq!(summary.duration, 12.5);

        let raw = json!({"results": [], "time": {"total_time": 3.25}}).to_string();
        let (summary, _) = normalize_scan(&raw, &ctx()).unwrap();
        assert_eq!(summary.duration, 3.25);
    }

    #[test]
    fn test_duration_override_from_context() {
        let ctx = ctx().with_duration(42.0);
        let raw = json!({"results": [], "time": {"total_time": 3.25}}).to_string();
        let (summary, _) = normalize_scan(&raw, &ctx).unwrap();
        assert_eq!(summary.duration, 42.0);
    }
}
