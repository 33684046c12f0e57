//! Report aggregation.
//!
//! Composes store queries and the score engine into consolidated reports
//! for the API layer to serialize.

pub mod aggregator;

pub use aggregator::*;
