//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use graphbench::accelerator::{Accelerator, AcceleratorError, AcceleratorResult, ResidentBuffer};
use graphbench::errors::HarnessResult;
use graphbench::graph_definition::GraphDefinition;
use graphbench::net::{Net, NetFactory};
use graphbench::observer::NetObserver;
use graphbench::tensor_store::TensorStore;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Accelerator whose "device memory" is plain host memory.
#[derive(Debug, Clone, Copy)]
pub struct FakeAccelerator {
    pub compiled_in: bool,
    pub device_present: bool,
}

impl FakeAccelerator {
    pub fn available() -> Arc<dyn Accelerator> {
        Arc::new(Self {
            compiled_in: true,
            device_present: true,
        })
    }

    pub fn without_device() -> Arc<dyn Accelerator> {
        Arc::new(Self {
            compiled_in: true,
            device_present: false,
        })
    }
}

impl Accelerator for FakeAccelerator {
    fn name(&self) -> &str {
        "fake"
    }

    fn compiled_in(&self) -> bool {
        self.compiled_in
    }

    fn device_present(&self) -> bool {
        self.device_present
    }

    fn allocate(&self, byte_len: usize) -> AcceleratorResult<Box<dyn ResidentBuffer>> {
        if !self.has_accelerator() {
            return Err(AcceleratorError::DeviceNotAvailable {
                message: "fake device disabled".to_string(),
            });
        }
        Ok(Box::new(HostBackedBuffer {
            bytes: vec![0; byte_len],
        }))
    }
}

#[derive(Debug)]
struct HostBackedBuffer {
    bytes: Vec<u8>,
}

impl ResidentBuffer for HostBackedBuffer {
    fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    fn read_back(&self) -> AcceleratorResult<Vec<u8>> {
        Ok(self.bytes.clone())
    }

    fn write(&mut self, bytes: &[u8]) -> AcceleratorResult<()> {
        if bytes.len() != self.bytes.len() {
            return Err(AcceleratorError::BufferSizeMismatch {
                expected: self.bytes.len(),
                actual: bytes.len(),
            });
        }
        self.bytes.copy_from_slice(bytes);
        Ok(())
    }
}

/// Run counter shared by the nets of one factory, with an optional failing run.
#[derive(Debug, Default)]
pub struct RunLog {
    pub runs: AtomicUsize,
    pub fail_on_run: Mutex<Option<usize>>,
}

impl RunLog {
    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

/// Net that only counts its runs, optionally failing on one of them.
pub struct CountingNet {
    name: String,
    log: Arc<RunLog>,
}

impl Net for CountingNet {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&mut self, _store: &mut TensorStore, _observer: &mut dyn NetObserver) -> HarnessResult<()> {
        let run = self.log.runs.fetch_add(1, Ordering::SeqCst);
        let fail_on = *self.log.fail_on_run.lock().unwrap();
        if fail_on == Some(run) {
            return Err(graphbench::HarnessError::OperatorFailed {
                index: 0,
                op_type: "Fake".to_string(),
                message: format!("run {} failed", run),
            });
        }
        Ok(())
    }
}

/// Factory handing out [`CountingNet`]s that share one [`RunLog`].
#[derive(Default)]
pub struct CountingFactory {
    pub log: Arc<RunLog>,
}

impl CountingFactory {
    /// Factory whose nets fail on the run with zero-based index `run`.
    pub fn failing_on(run: usize) -> Self {
        let factory = Self::default();
        *factory.log.fail_on_run.lock().unwrap() = Some(run);
        factory
    }
}

impl NetFactory for CountingFactory {
    fn create_net(
        &self,
        definition: &GraphDefinition,
        _store: &mut TensorStore,
    ) -> HarnessResult<Box<dyn Net>> {
        Ok(Box::new(CountingNet {
            name: definition.name_or_default().to_string(),
            log: self.log.clone(),
        }))
    }
}
