//! Error types for benchmark harness operations.

use crate::accelerator::AcceleratorError;
use crate::tensor::DataType;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while configuring, feeding, running or reading back a benchmark.
///
/// Every variant is fatal to the benchmark invocation; the harness never retries.
#[derive(Error, Debug)]
pub enum HarnessError {
    // Configuration errors.
    #[error("Backend is not supported: {backend}")]
    UnsupportedBackend { backend: String },

    #[error("Input name and {list} should have the same number of items: {names} != {items}")]
    InputCountMismatch {
        list: &'static str,
        names: usize,
        items: usize,
    },

    #[error("You requested input tensors, but neither input_file nor input_dims is set")]
    MissingInputSource,

    #[error("Unsupported input type: {type_name}")]
    UnsupportedInputType { type_name: String },

    #[error("Invalid dimension '{value}' in input dims '{group}'")]
    InvalidInputDims { group: String, value: String },

    #[error("Number of main runs should be non negative, provided {iter}")]
    NegativeIterationCount { iter: i64 },

    #[error("Input dims '{group}' describe a {data_type} tensor too large to address")]
    InputTooLarge { group: String, data_type: DataType },

    // Capability errors.
    #[error("No GPU support")]
    AcceleratorNotCompiled,

    #[error("No GPU support on this host machine")]
    AcceleratorNotPresent,

    #[error(transparent)]
    Accelerator(#[from] AcceleratorError),

    // Runtime errors.
    #[error("Failed to create net '{net}': {message}")]
    NetCreationFailed { net: String, message: String },

    #[error("Init run of net '{net}' has failed: {message}")]
    InitRunFailed { net: String, message: String },

    #[error("Warmup run {index} has failed: {message}")]
    WarmupRunFailed { index: usize, message: String },

    #[error("Main run {index} has failed: {message}")]
    MainRunFailed { index: usize, message: String },

    #[error("Main run {index} with operator has failed: {message}")]
    OperatorRunFailed { index: usize, message: String },

    #[error("The execution loop already failed and cannot be run again")]
    LoopAlreadyFailed,

    #[error("Operator {index} ({op_type}) failed: {message}")]
    OperatorFailed {
        index: usize,
        op_type: String,
        message: String,
    },

    #[error("You requested a non-existing blob: {name}")]
    NonExistingBlob { name: String },

    #[error("Blob '{name}' does not hold a tensor")]
    EmptyBlob { name: String },

    #[error("Failed to read '{}': {source}", path.display())]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write '{}': {source}", path.display())]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to decode '{}': {source}", path.display())]
    Decode {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to encode blob '{name}': {source}")]
    Encode {
        name: String,
        source: serde_json::Error,
    },

    #[error("Shape {dims:?} is too large to allocate")]
    ShapeTooLarge { dims: Vec<usize> },

    #[error("Host allocation of {byte_len} bytes failed")]
    HostAllocationFailed { byte_len: usize },

    #[error("Blob '{name}' holds {actual} elements but its shape requires {expected}")]
    CorruptBlob {
        name: String,
        expected: usize,
        actual: usize,
    },
}

impl HarnessError {
    /// Returns true for errors raised because of an invalid benchmark configuration.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            HarnessError::UnsupportedBackend { .. }
                | HarnessError::InputCountMismatch { .. }
                | HarnessError::MissingInputSource
                | HarnessError::UnsupportedInputType { .. }
                | HarnessError::InvalidInputDims { .. }
                | HarnessError::NegativeIterationCount { .. }
                | HarnessError::InputTooLarge { .. }
        )
    }

    /// Returns true for errors raised because accelerator support is missing.
    pub fn is_capability(&self) -> bool {
        matches!(
            self,
            HarnessError::AcceleratorNotCompiled | HarnessError::AcceleratorNotPresent
        )
    }
}
