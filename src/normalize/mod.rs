//! Finding normalization.
//!
//! Converts one raw scanner result set into a canonical scan summary plus an
//! ordered list of canonical findings. All field-level repair (defaults,
//! severity coercion) happens here; free-form scanner values never reach the
//! store.

pub mod semgrep;
pub mod severity;

pub use semgrep::*;
pub use severity::*;
