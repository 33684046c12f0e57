//! Security score engine.
//!
//! Pure functions mapping severity counts to a 0-100 score and letter
//! grade.

pub mod engine;

pub use engine::*;
