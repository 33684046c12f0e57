//! Storage module.
//!
//! Data models and the embedded SQLite store for scan summaries and
//! findings.

pub mod models;
pub mod store;

pub use models::*;
pub use store::*;
