//! Accelerator-specific error types.

use thiserror::Error;

/// Errors raised by an accelerator runtime while managing resident buffers.
#[derive(Error, Debug)]
pub enum AcceleratorError {
    #[error("Accelerator not available: {message}")]
    DeviceNotAvailable { message: String },

    #[error("Buffer size mismatch: buffer holds {expected} bytes, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    #[error("Buffer read-back failed: {message}")]
    ReadBackFailed { message: String },
}

pub type AcceleratorResult<T> = std::result::Result<T, AcceleratorError>;
