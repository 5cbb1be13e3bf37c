//! Accelerator capability abstraction.
//!
//! The harness never branches on compile-time flags. Instead it asks an
//! [`Accelerator`] whether support was compiled in and whether a device is
//! present, and allocates accelerator-resident buffers through it.
//!
//! With the `gpu` feature the default accelerator is backed by wgpu; without
//! it, [`NoAccelerator`] reports that support was not compiled in.

pub mod errors;
#[cfg(feature = "gpu")]
pub mod wgpu_accelerator;

pub use errors::{AcceleratorError, AcceleratorResult};
#[cfg(feature = "gpu")]
pub use wgpu_accelerator::WgpuAccelerator;

use crate::errors::{HarnessError, HarnessResult};
use std::fmt;
use std::sync::Arc;

/// A contiguous buffer living in accelerator memory.
pub trait ResidentBuffer: Send + Sync + fmt::Debug {
    /// Returns the number of meaningful bytes held by the buffer.
    fn byte_len(&self) -> usize;

    /// Copies the buffer contents back into host memory.
    fn read_back(&self) -> AcceleratorResult<Vec<u8>>;

    /// Overwrites the buffer contents. `bytes` must be exactly `byte_len()` long.
    fn write(&mut self, bytes: &[u8]) -> AcceleratorResult<()>;
}

/// Runtime capability query plus an opaque resident-buffer allocator.
pub trait Accelerator: Send + Sync {
    /// Short human readable name of the runtime.
    fn name(&self) -> &str;

    /// Whether accelerator support was compiled into this binary.
    fn compiled_in(&self) -> bool;

    /// Whether a usable accelerator device was found on this host.
    fn device_present(&self) -> bool;

    fn has_accelerator(&self) -> bool {
        self.compiled_in() && self.device_present()
    }

    /// Allocates a zero-filled resident buffer of `byte_len` bytes.
    fn allocate(&self, byte_len: usize) -> AcceleratorResult<Box<dyn ResidentBuffer>>;
}

/// Fails with the capability error matching why the accelerator cannot be used.
pub fn require_accelerator(accelerator: &dyn Accelerator) -> HarnessResult<()> {
    if !accelerator.compiled_in() {
        return Err(HarnessError::AcceleratorNotCompiled);
    }
    if !accelerator.device_present() {
        return Err(HarnessError::AcceleratorNotPresent);
    }
    Ok(())
}

/// Accelerator used when no accelerator support is compiled in.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAccelerator;

impl Accelerator for NoAccelerator {
    fn name(&self) -> &str {
        "none"
    }

    fn compiled_in(&self) -> bool {
        false
    }

    fn device_present(&self) -> bool {
        false
    }

    fn allocate(&self, _byte_len: usize) -> AcceleratorResult<Box<dyn ResidentBuffer>> {
        Err(AcceleratorError::DeviceNotAvailable {
            message: "accelerator support was not compiled in".to_string(),
        })
    }
}

/// Returns the accelerator for this build: wgpu when the `gpu` feature is on.
pub fn default_accelerator() -> Arc<dyn Accelerator> {
    #[cfg(feature = "gpu")]
    {
        Arc::new(WgpuAccelerator::new())
    }
    #[cfg(not(feature = "gpu"))]
    {
        Arc::new(NoAccelerator)
    }
}
