//! Score and grade computation.
//!
//! The score starts at 100 and is reduced by a weighted penalty per
//! finding; higher is better. Deterministic, no side effects, defined for
//! any non-negative counts.

use serde::{Deserialize, Serialize};

use crate::storage::models::ScanSummary;

/// Penalty weights per finding severity.
pub const ERROR_WEIGHT: u64 = 10;
pub const WARNING_WEIGHT: u64 = 5;
pub const INFO_WEIGHT: u64 = 1;

/// Letter grade derived from a security score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        }
    }
}

/// Compute the security score for a scan summary's severity counts.
///
/// `score = max(0, 100 - (10*errors + 5*warnings + 1*infos))`, rounded to
/// two decimal places.
pub fn score(summary: &ScanSummary) -> f64 {
    score_counts(summary.error_count, summary.warning_count, summary.info_count)
}

/// Score from raw severity counts.
pub fn score_counts(errors: u64, warnings: u64, infos: u64) -> f64 {
    let penalty = ERROR_WEIGHT * errors + WARNING_WEIGHT * warnings + INFO_WEIGHT * infos;
    let score = 100.0 - penalty as f64;
    round2(score.max(0.0))
}

/// Grade band for a score: >=90 A, >=80 B, >=70 C, >=60 D, else F.
pub fn grade(score: f64) -> Grade {
    if score >= 90.0 {
        Grade::A
    } else if score >= 80.0 {
        Grade::B
    } else if score >= 70.0 {
        Grade::C
    } else if score >= 60.0 {
        Grade::D
    } else {
        Grade::F
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
