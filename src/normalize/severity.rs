//! Finding severity.
//!
//! Scanners emit severity as a loosely-typed string. It is modeled here as a
//! closed enumeration with an explicit unknown-to-Info coercion rule at the
//! normalization boundary.

use serde::{Deserialize, Serialize};

/// Severity of a single finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    /// Coerce a raw scanner severity string. Anything outside the closed set
    /// (including the empty string) becomes `Info`.
    pub fn from_raw(raw: &str) -> Self {
        match raw.to_ascii_uppercase().as_str() {
            "ERROR" => Severity::Error,
            "WARNING" => Severity::Warning,
            "INFO" => Severity::Info,
            _ => Severity::Info,
        }
    }

    /// Strict parse for values read back from the store, where only the
    /// closed set is ever written.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "ERROR" => Some(Severity::Error),
            "WARNING" => Some(Severity::Warning),
            "INFO" => Some(Severity::Info),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "ERROR",
            Severity::Warning => "WARNING",
            Severity::Info => "INFO",
        }
    }

    /// Display rank: Error orders before Warning orders before Info.
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Error => 0,
            Severity::Warning => 1,
            Severity::Info => 2,
        }
    }
}

/// Display rank of a *raw* severity string, before coercion. Values outside
/// the closed set sort after Info. The ordering contract is applied to the
/// raw value so an exotic severity still lands last even though it is stored
/// as Info.
pub fn raw_severity_rank(raw: &str) -> u8 {
    match raw.to_ascii_uppercase().as_str() {
        "ERROR" => 0,
        "WARNING" => 1,
        "INFO" => 2,
        _ => 3,
    }
}
