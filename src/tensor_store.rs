//! Named blob storage shared by every stage of a benchmark.

use crate::accelerator::Accelerator;
use crate::tensor::{AcceleratorTensor, HostTensor, Residency, Tensor, TensorOps};
use std::collections::HashMap;
use std::sync::Arc;

/// Named container holding zero or one tensor.
#[derive(Debug, Default)]
pub struct Blob {
    tensor: Option<Tensor>,
}

impl Blob {
    pub fn tensor(&self) -> Option<&Tensor> {
        self.tensor.as_ref()
    }

    pub fn tensor_mut(&mut self) -> Option<&mut Tensor> {
        self.tensor.as_mut()
    }

    pub fn is_empty(&self) -> bool {
        self.tensor.is_none()
    }

    /// Replaces the held tensor.
    pub fn set_tensor(&mut self, tensor: Tensor) {
        self.tensor = Some(tensor);
    }

    pub fn reset(&mut self) {
        self.tensor = None;
    }

    /// Returns the held host tensor, replacing whatever else the blob held.
    pub fn host_tensor_mut(&mut self) -> &mut dyn TensorOps {
        let tensor = match self.tensor.take() {
            Some(host @ Tensor::Host(_)) => host,
            _ => Tensor::Host(HostTensor::default()),
        };
        self.tensor.insert(tensor).ops_mut()
    }

    /// Returns the held accelerator tensor, replacing whatever else the blob held.
    pub fn accelerator_tensor_mut(
        &mut self,
        accelerator: &Arc<dyn Accelerator>,
    ) -> &mut dyn TensorOps {
        let tensor = match self.tensor.take() {
            Some(resident @ Tensor::Accelerator(_)) => resident,
            _ => Tensor::Accelerator(AcceleratorTensor::new(accelerator.clone())),
        };
        self.tensor.insert(tensor).ops_mut()
    }

    /// Resolves the tensor of the requested residency inside this blob.
    pub fn tensor_for(
        &mut self,
        residency: Residency,
        accelerator: &Arc<dyn Accelerator>,
    ) -> &mut dyn TensorOps {
        match residency {
            Residency::Host => self.host_tensor_mut(),
            Residency::Accelerator => self.accelerator_tensor_mut(accelerator),
        }
    }
}

/// Mapping from unique blob name to blob. Exclusively owned by the harness.
#[derive(Debug, Default)]
pub struct TensorStore {
    blobs: HashMap<String, Blob>,
}

impl TensorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the blob named `name`, creating an empty one if needed.
    pub fn create_blob(&mut self, name: &str) -> &mut Blob {
        self.blobs.entry(name.to_string()).or_default()
    }

    pub fn get_blob(&self, name: &str) -> Option<&Blob> {
        self.blobs.get(name)
    }

    pub fn get_blob_mut(&mut self, name: &str) -> Option<&mut Blob> {
        self.blobs.get_mut(name)
    }

    pub fn has_blob(&self, name: &str) -> bool {
        self.blobs.contains_key(name)
    }

    pub fn remove_blob(&mut self, name: &str) -> Option<Blob> {
        self.blobs.remove(name)
    }

    /// Names of every blob currently in the store, sorted.
    pub fn blob_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.blobs.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}
