//! Error types for the benchmark harness.
//!
//! Errors are concrete enums rather than generic wrappers like `anyhow` or
//! `Box<dyn Error>`, so callers can tell configuration, capability and runtime
//! failures apart.

mod harness_error;

pub use harness_error::HarnessError;

/// Result type alias for harness operations.
pub type HarnessResult<T> = std::result::Result<T, HarnessError>;
