//! Embedded SQLite store for scan summaries and findings.
//!
//! Every operation is a self-contained transaction; an insert is visible
//! all-or-nothing to concurrent readers. The store is local and embedded,
//! so there is no network failure mode to handle.

use std::path::Path;

use chrono::{NaiveDate, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{MonitorError, Result};
use crate::normalize::severity::Severity;
use crate::storage::models::{
    Finding, LastScan, RecentFinding, RepositoryStats, ScanSummary, SeverityDistribution,
    TopIssue, TrendPoint,
};

/// Allowed range for trend windows, in days.
pub const MIN_TREND_DAYS: u32 = 1;
pub const MAX_TREND_DAYS: u32 = 365;

/// Durable, queryable persistence for scan summaries and their findings.
pub struct ScanStore {
    conn: Mutex<Connection>,
}

impl ScanStore {
    /// Create or open the database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;

        log::info!("STORE_OPENED path={}", path.display());
        Ok(store)
    }

    /// Open an in-memory database. Used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let store = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS scan_summaries (
                scan_id TEXT PRIMARY KEY,
                repository TEXT NOT NULL,
                commit_sha TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                total_findings INTEGER NOT NULL,
                error_count INTEGER NOT NULL,
                warning_count INTEGER NOT NULL,
                info_count INTEGER NOT NULL,
                duration REAL NOT NULL,
                rules_applied INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS findings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                scan_id TEXT NOT NULL,
                rule_id TEXT NOT NULL,
                severity TEXT NOT NULL,
                category TEXT,
                owasp TEXT,
                cwe TEXT,
                path TEXT NOT NULL,
                start_line INTEGER,
                end_line INTEGER,
                message TEXT NOT NULL,
                FOREIGN KEY (scan_id) REFERENCES scan_summaries (scan_id)
            );

            CREATE INDEX IF NOT EXISTS idx_summaries_repository
                ON scan_summaries (repository);
            CREATE INDEX IF NOT EXISTS idx_summaries_timestamp
                ON scan_summaries (timestamp);
            CREATE INDEX IF NOT EXISTS idx_findings_scan
                ON findings (scan_id);
            CREATE INDEX IF NOT EXISTS idx_findings_severity
                ON findings (severity);
            "#,
        )?;

        Ok(())
    }

    /// Persist a summary and all of its findings as one durable unit.
    ///
    /// Ingestion is append-only: an existing `scan_id` fails with
    /// `DuplicateScan` and the stored record is left untouched.
    pub fn insert(&self, summary: &ScanSummary, findings: &[Finding]) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let exists: Option<i64> = tx
            .query_row(
                "SELECT 1 FROM scan_summaries WHERE scan_id = ?1",
                params![summary.scan_id],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_some() {
            log::warn!(
                "[repo={}] [scan={}] DUPLICATE_SCAN rejected",
                summary.repository,
                summary.scan_id
            );
            return Err(MonitorError::DuplicateScan {
                scan_id: summary.scan_id.clone(),
            });
        }

        tx.execute(
            "INSERT INTO scan_summaries
                (scan_id, repository, commit_sha, timestamp, total_findings,
                 error_count, warning_count, info_count, duration, rules_applied)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                summary.scan_id,
                summary.repository,
                summary.commit,
                summary.timestamp.to_rfc3339(),
                summary.total_findings as i64,
                summary.error_count as i64,
                summary.warning_count as i64,
                summary.info_count as i64,
                summary.duration,
                summary.rules_applied as i64,
            ],
        )?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO findings
                    (scan_id, rule_id, severity, category, owasp, cwe,
                     path, start_line, end_line, message)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;
            for finding in findings {
                stmt.execute(params![
                    summary.scan_id,
                    finding.rule_id,
                    finding.severity.as_str(),
                    finding.category,
                    finding.owasp,
                    finding.cwe,
                    finding.path,
                    finding.start_line,
                    finding.end_line,
                    finding.message,
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// Look up one scan summary. Unknown `scan_id` fails with `NotFound`.
    pub fn scan_summary(&self, scan_id: &str) -> Result<ScanSummary> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT scan_id, repository, commit_sha, timestamp, total_findings,
                    error_count, warning_count, info_count, duration, rules_applied
             FROM scan_summaries WHERE scan_id = ?1",
        )?;

        stmt.query_row(params![scan_id], row_to_summary)
            .optional()?
            .ok_or_else(|| MonitorError::NotFound {
                scan_id: scan_id.to_string(),
            })
    }

    /// All findings of one scan, in normalized order.
    pub fn findings_for_scan(&self, scan_id: &str) -> Result<Vec<Finding>> {
        // Distinguish "no findings" from "no such scan".
        self.scan_summary(scan_id)?;

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT rule_id, severity, category, owasp, cwe,
                    path, start_line, end_line, message
             FROM findings WHERE scan_id = ?1 ORDER BY id",
        )?;

        let findings = stmt
            .query_map(params![scan_id], |row| {
                Ok(Finding {
                    rule_id: row.get(0)?,
                    severity: severity_from_row(row.get::<_, String>(1)?),
                    category: row.get(2)?,
                    owasp: row.get(3)?,
                    cwe: row.get(4)?,
                    path: row.get(5)?,
                    start_line: row.get(6)?,
                    end_line: row.get(7)?,
                    message: row.get(8)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(findings)
    }

    /// Aggregate statistics for one repository across all recorded scans.
    ///
    /// A repository with zero scans returns zero-valued stats with
    /// `last_scan = None`, not an error.
    pub fn repository_stats(&self, repository: &str) -> Result<RepositoryStats> {
        let conn = self.conn.lock();

        let total_scans: i64 = conn.query_row(
            "SELECT COUNT(*) FROM scan_summaries WHERE repository = ?1",
            params![repository],
            |row| row.get(0),
        )?;

        let mut severity_distribution = SeverityDistribution::default();
        {
            let mut stmt = conn.prepare(
                "SELECT f.severity, COUNT(*)
                 FROM findings f
                 JOIN scan_summaries s ON f.scan_id = s.scan_id
                 WHERE s.repository = ?1
                 GROUP BY f.severity",
            )?;
            let rows = stmt.query_map(params![repository], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?;
            for row in rows {
                let (severity, count) = row?;
                match Severity::from_str(&severity) {
                    Some(Severity::Error) => severity_distribution.errors += count as u64,
                    Some(Severity::Warning) => severity_distribution.warnings += count as u64,
                    Some(Severity::Info) | None => severity_distribution.infos += count as u64,
                }
            }
        }

        let top_issues = {
            let mut stmt = conn.prepare(
                "SELECT f.rule_id, COUNT(*) AS cnt
                 FROM findings f
                 JOIN scan_summaries s ON f.scan_id = s.scan_id
                 WHERE s.repository = ?1
                 GROUP BY f.rule_id
                 ORDER BY cnt DESC, f.rule_id ASC
                 LIMIT 5",
            )?;
            let rows = stmt.query_map(params![repository], |row| {
                Ok(TopIssue {
                    rule_id: row.get(0)?,
                    count: row.get::<_, i64>(1)? as u64,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        };

        let last_scan = conn
            .query_row(
                "SELECT timestamp, total_findings, duration
                 FROM scan_summaries
                 WHERE repository = ?1
                 ORDER BY timestamp DESC
                 LIMIT 1",
                params![repository],
                |row| {
                    Ok(LastScan {
                        timestamp: parse_timestamp(row.get::<_, String>(0)?),
                        total_findings: row.get::<_, i64>(1)? as u64,
                        duration: row.get(2)?,
                    })
                },
            )
            .optional()?;

        Ok(RepositoryStats {
            repository: repository.to_string(),
            total_scans: total_scans as u64,
            severity_distribution,
            top_issues,
            last_scan,
        })
    }

    /// Daily severity totals over the trailing window, oldest date first.
    ///
    /// `repository = None` aggregates across all repositories. Dates with
    /// no scans are omitted, not zero-filled. `window_days` outside
    /// 1..=365 fails with `Validation`.
    pub fn trend(&self, repository: Option<&str>, window_days: u32) -> Result<Vec<TrendPoint>> {
        if !(MIN_TREND_DAYS..=MAX_TREND_DAYS).contains(&window_days) {
            return Err(MonitorError::validation(format!(
                "window_days must be between {} and {}, got {}",
                MIN_TREND_DAYS, MAX_TREND_DAYS, window_days
            )));
        }

        let conn = self.conn.lock();
        let window = format!("-{} days", window_days);

        let mut query = String::from(
            "SELECT DATE(timestamp) AS date,
                    SUM(error_count), SUM(warning_count), SUM(info_count)
             FROM scan_summaries
             WHERE datetime(timestamp) >= datetime('now', ?1)",
        );
        if repository.is_some() {
            query.push_str(" AND repository = ?2");
        }
        query.push_str(" GROUP BY DATE(timestamp) ORDER BY date");

        let mut stmt = conn.prepare(&query)?;
        let map_row = |row: &rusqlite::Row<'_>| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
            ))
        };
        let rows: Vec<(String, i64, i64, i64)> = match repository {
            Some(repo) => stmt
                .query_map(params![window, repo], map_row)?
                .collect::<std::result::Result<_, _>>()?,
            None => stmt
                .query_map(params![window], map_row)?
                .collect::<std::result::Result<_, _>>()?,
        };

        let mut points = Vec::with_capacity(rows.len());
        for (date, errors, warnings, infos) in rows {
            let date = match date.parse::<NaiveDate>() {
                Ok(d) => d,
                Err(_) => continue,
            };
            points.push(TrendPoint {
                date,
                errors: errors as u64,
                warnings: warnings as u64,
                infos: infos as u64,
            });
        }

        Ok(points)
    }

    /// Distinct repositories with at least one recorded scan, sorted.
    pub fn repositories(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT DISTINCT repository FROM scan_summaries ORDER BY repository",
        )?;

        let repos = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(repos)
    }

    /// The newest scans across all repositories, newest first.
    pub fn recent_scans(&self, limit: usize) -> Result<Vec<ScanSummary>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT scan_id, repository, commit_sha, timestamp, total_findings,
                    error_count, warning_count, info_count, duration, rules_applied
             FROM scan_summaries
             ORDER BY timestamp DESC
             LIMIT ?1",
        )?;

        let scans = stmt
            .query_map(params![limit as i64], row_to_summary)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(scans)
    }

    /// Recently recorded findings, newest scan first, then severity rank.
    /// `severity` narrows the result to one severity.
    pub fn recent_findings(
        &self,
        limit: usize,
        severity: Option<Severity>,
    ) -> Result<Vec<RecentFinding>> {
        let conn = self.conn.lock();

        let mut query = String::from(
            "SELECT f.id, s.repository, f.rule_id, f.severity, f.path,
                    f.start_line, f.message, s.timestamp
             FROM findings f
             JOIN scan_summaries s ON f.scan_id = s.scan_id",
        );
        if severity.is_some() {
            query.push_str(" WHERE f.severity = ?2");
        }
        query.push_str(
            " ORDER BY s.timestamp DESC,
                       CASE f.severity
                           WHEN 'ERROR' THEN 0
                           WHEN 'WARNING' THEN 1
                           ELSE 2
                       END,
                       f.id
              LIMIT ?1",
        );

        let mut stmt = conn.prepare(&query)?;
        let map_row = |row: &rusqlite::Row<'_>| {
            Ok(RecentFinding {
                id: row.get(0)?,
                repository: row.get(1)?,
                rule_id: row.get(2)?,
                severity: severity_from_row(row.get::<_, String>(3)?),
                path: row.get(4)?,
                start_line: row.get(5)?,
                message: row.get(6)?,
                timestamp: parse_timestamp(row.get::<_, String>(7)?),
            })
        };
        let findings: Vec<RecentFinding> = match severity {
            Some(sev) => stmt
                .query_map(params![limit as i64, sev.as_str()], map_row)?
                .collect::<std::result::Result<_, _>>()?,
            None => stmt
                .query_map(params![limit as i64], map_row)?
                .collect::<std::result::Result<_, _>>()?,
        };

        Ok(findings)
    }

    /// Global row counts: (repositories, scans, findings).
    pub fn totals(&self) -> Result<(u64, u64, u64)> {
        let conn = self.conn.lock();

        let (repositories, scans): (i64, i64) = conn.query_row(
            "SELECT COUNT(DISTINCT repository), COUNT(*) FROM scan_summaries",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let findings: i64 =
            conn.query_row("SELECT COUNT(*) FROM findings", [], |row| row.get(0))?;

        Ok((repositories as u64, scans as u64, findings as u64))
    }
}

fn row_to_summary(row: &rusqlite::Row<'_>) -> rusqlite::Result<ScanSummary> {
    Ok(ScanSummary {
        scan_id: row.get(0)?,
        repository: row.get(1)?,
        commit: row.get(2)?,
        timestamp: parse_timestamp(row.get::<_, String>(3)?),
        total_findings: row.get::<_, i64>(4)? as u64,
        error_count: row.get::<_, i64>(5)? as u64,
        warning_count: row.get::<_, i64>(6)? as u64,
        info_count: row.get::<_, i64>(7)? as u64,
        duration: row.get(8)?,
        rules_applied: row.get::<_, i64>(9)? as u64,
    })
}

fn parse_timestamp(raw: String) -> chrono::DateTime<Utc> {
    raw.parse().unwrap_or_else(|_| Utc::now())
}

/// Only the closed set is ever written; anything else reads back as Info.
fn severity_from_row(raw: String) -> Severity {
    Severity::from_str(&raw).unwrap_or(Severity::Info)
}
