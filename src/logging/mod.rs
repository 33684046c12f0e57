//! Structured logging with scan context.
//!
//! Provides logging utilities that include repository and scan_id in every
//! log message for easy correlation.

pub mod structured;

pub use structured::*;
