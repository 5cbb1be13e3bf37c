//! Typed tensors held by blobs.
//!
//! A tensor is either host-resident ([`HostTensor`]) or accelerator-resident
//! ([`AcceleratorTensor`]). Both implement [`TensorOps`], so callers that only
//! need to shape, allocate or read back a tensor don't care where it lives.

use crate::accelerator::{Accelerator, ResidentBuffer};
use crate::errors::{HarnessError, HarnessResult};
use std::collections::TryReserveError;
use std::fmt;
use std::sync::Arc;

/// Element type of a tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    U8,
    F32,
}

impl DataType {
    /// Parses the element type names accepted on the command line.
    pub fn parse(type_name: &str) -> HarnessResult<Self> {
        match type_name.trim() {
            "uint8_t" => Ok(DataType::U8),
            "float" => Ok(DataType::F32),
            other => Err(HarnessError::UnsupportedInputType {
                type_name: other.to_string(),
            }),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DataType::U8 => "uint8_t",
            DataType::F32 => "float",
        }
    }

    pub fn size_in_bytes(self) -> usize {
        match self {
            DataType::U8 => std::mem::size_of::<u8>(),
            DataType::F32 => std::mem::size_of::<f32>(),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Number of elements described by `dims`. A rank-0 shape holds one element.
/// Saturates at `usize::MAX`; use [`checked_numel`] before allocating.
pub fn numel(dims: &[usize]) -> usize {
    dims.iter().fold(1usize, |acc, &dim| acc.saturating_mul(dim))
}

/// Number of elements described by `dims`, `None` on overflow.
pub fn checked_numel(dims: &[usize]) -> Option<usize> {
    dims.iter().try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
}

/// Storage size of a `dims` shaped tensor of `data_type`, `None` when it
/// cannot be addressed.
pub fn checked_byte_len(dims: &[usize], data_type: DataType) -> Option<usize> {
    checked_numel(dims)?
        .checked_mul(data_type.size_in_bytes())
        .filter(|&byte_len| byte_len <= isize::MAX as usize)
}

/// Where a tensor's storage lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Residency {
    Host,
    Accelerator,
}

/// Contiguous typed element storage.
#[derive(Debug, Clone, PartialEq)]
pub enum TensorData {
    U8(Vec<u8>),
    F32(Vec<f32>),
}

impl TensorData {
    /// Zero-filled storage of `len` elements. Fails instead of aborting when
    /// the host cannot provide the memory.
    pub fn try_zeros(data_type: DataType, len: usize) -> HarnessResult<Self> {
        let failed = |_: TryReserveError| HarnessError::HostAllocationFailed {
            byte_len: len.saturating_mul(data_type.size_in_bytes()),
        };
        match data_type {
            DataType::U8 => {
                let mut values = Vec::new();
                values.try_reserve_exact(len).map_err(failed)?;
                values.resize(len, 0);
                Ok(TensorData::U8(values))
            }
            DataType::F32 => {
                let mut values = Vec::new();
                values.try_reserve_exact(len).map_err(failed)?;
                values.resize(len, 0.0);
                Ok(TensorData::F32(values))
            }
        }
    }

    pub fn data_type(&self) -> DataType {
        match self {
            TensorData::U8(_) => DataType::U8,
            TensorData::F32(_) => DataType::F32,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            TensorData::U8(values) => values.len(),
            TensorData::F32(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw native-endian view of the elements.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            TensorData::U8(values) => values,
            TensorData::F32(values) => bytemuck::cast_slice(values),
        }
    }

    /// Rebuilds typed storage from raw bytes. Trailing bytes that do not form
    /// a whole element are ignored.
    pub fn from_bytes(data_type: DataType, bytes: &[u8]) -> Self {
        match data_type {
            DataType::U8 => TensorData::U8(bytes.to_vec()),
            DataType::F32 => {
                let whole = bytes.len() - bytes.len() % DataType::F32.size_in_bytes();
                TensorData::F32(bytemuck::pod_collect_to_vec(&bytes[..whole]))
            }
        }
    }

    /// Element values as text, one entry per element.
    pub fn value_strings(&self) -> Vec<String> {
        match self {
            TensorData::U8(values) => values.iter().map(|v| v.to_string()).collect(),
            TensorData::F32(values) => values.iter().map(|v| v.to_string()).collect(),
        }
    }
}

/// Interface shared by host and accelerator tensors.
pub trait TensorOps {
    fn residency(&self) -> Residency;

    fn dims(&self) -> &[usize];

    fn numel(&self) -> usize {
        numel(self.dims())
    }

    /// Element type of the allocated storage, `None` until allocated.
    fn data_type(&self) -> Option<DataType>;

    fn is_allocated(&self) -> bool;

    /// Changes the shape. Storage is released when the element count changes.
    fn resize(&mut self, dims: &[usize]);

    /// Ensures storage of `data_type` backs every element of the current shape.
    fn allocate(&mut self, data_type: DataType) -> HarnessResult<()>;

    /// Copies the tensor into host memory.
    fn to_host(&self) -> HarnessResult<HostTensor>;

    /// Replaces shape and contents with those of `source`.
    fn assign(&mut self, source: &HostTensor) -> HarnessResult<()>;
}

/// Tensor whose storage lives in host memory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostTensor {
    dims: Vec<usize>,
    data: Option<TensorData>,
}

impl HostTensor {
    pub fn new(dims: Vec<usize>) -> Self {
        Self { dims, data: None }
    }

    /// Creates an allocated tensor. Fails when `data` does not match the shape.
    pub fn from_data(dims: Vec<usize>, data: TensorData) -> HarnessResult<Self> {
        let expected =
            checked_numel(&dims).ok_or_else(|| HarnessError::ShapeTooLarge { dims: dims.clone() })?;
        if data.len() != expected {
            return Err(HarnessError::CorruptBlob {
                name: String::new(),
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            dims,
            data: Some(data),
        })
    }

    /// One-element float tensor of shape `[1]`.
    pub fn scalar(value: f32) -> Self {
        Self {
            dims: vec![1],
            data: Some(TensorData::F32(vec![value])),
        }
    }

    pub fn data(&self) -> Option<&TensorData> {
        self.data.as_ref()
    }

    pub fn data_mut(&mut self) -> Option<&mut TensorData> {
        self.data.as_mut()
    }

    pub fn as_f32(&self) -> Option<&[f32]> {
        match &self.data {
            Some(TensorData::F32(values)) => Some(values),
            _ => None,
        }
    }

    pub fn as_f32_mut(&mut self) -> Option<&mut [f32]> {
        match &mut self.data {
            Some(TensorData::F32(values)) => Some(values),
            _ => None,
        }
    }

    pub fn as_u8(&self) -> Option<&[u8]> {
        match &self.data {
            Some(TensorData::U8(values)) => Some(values),
            _ => None,
        }
    }
}

impl TensorOps for HostTensor {
    fn residency(&self) -> Residency {
        Residency::Host
    }

    fn dims(&self) -> &[usize] {
        &self.dims
    }

    fn data_type(&self) -> Option<DataType> {
        self.data.as_ref().map(TensorData::data_type)
    }

    fn is_allocated(&self) -> bool {
        self.data.is_some()
    }

    fn resize(&mut self, dims: &[usize]) {
        if numel(dims) != numel(&self.dims) {
            self.data = None;
        }
        self.dims = dims.to_vec();
    }

    fn allocate(&mut self, data_type: DataType) -> HarnessResult<()> {
        if checked_byte_len(&self.dims, data_type).is_none() {
            return Err(HarnessError::ShapeTooLarge {
                dims: self.dims.clone(),
            });
        }
        let len = self.numel();
        let reusable = matches!(
            &self.data,
            Some(data) if data.data_type() == data_type && data.len() == len
        );
        if !reusable {
            self.data = Some(TensorData::try_zeros(data_type, len)?);
        }
        Ok(())
    }

    fn to_host(&self) -> HarnessResult<HostTensor> {
        Ok(self.clone())
    }

    fn assign(&mut self, source: &HostTensor) -> HarnessResult<()> {
        self.clone_from(source);
        Ok(())
    }
}

/// Tensor whose storage lives in accelerator memory.
pub struct AcceleratorTensor {
    dims: Vec<usize>,
    data_type: Option<DataType>,
    buffer: Option<Box<dyn ResidentBuffer>>,
    accelerator: Arc<dyn Accelerator>,
}

impl AcceleratorTensor {
    pub fn new(accelerator: Arc<dyn Accelerator>) -> Self {
        Self {
            dims: Vec::new(),
            data_type: None,
            buffer: None,
            accelerator,
        }
    }

    pub fn buffer(&self) -> Option<&dyn ResidentBuffer> {
        self.buffer.as_deref()
    }
}

impl fmt::Debug for AcceleratorTensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AcceleratorTensor")
            .field("dims", &self.dims)
            .field("data_type", &self.data_type)
            .field("buffer", &self.buffer)
            .field("accelerator", &self.accelerator.name())
            .finish()
    }
}

impl TensorOps for AcceleratorTensor {
    fn residency(&self) -> Residency {
        Residency::Accelerator
    }

    fn dims(&self) -> &[usize] {
        &self.dims
    }

    fn data_type(&self) -> Option<DataType> {
        self.buffer.as_ref().and(self.data_type)
    }

    fn is_allocated(&self) -> bool {
        self.buffer.is_some()
    }

    fn resize(&mut self, dims: &[usize]) {
        if numel(dims) != numel(&self.dims) {
            self.buffer = None;
        }
        self.dims = dims.to_vec();
    }

    fn allocate(&mut self, data_type: DataType) -> HarnessResult<()> {
        let byte_len = checked_byte_len(&self.dims, data_type).ok_or_else(|| {
            HarnessError::ShapeTooLarge {
                dims: self.dims.clone(),
            }
        })?;
        let reusable = self.data_type == Some(data_type)
            && matches!(&self.buffer, Some(buffer) if buffer.byte_len() == byte_len);
        if !reusable {
            self.buffer = Some(self.accelerator.allocate(byte_len)?);
            self.data_type = Some(data_type);
        }
        Ok(())
    }

    fn to_host(&self) -> HarnessResult<HostTensor> {
        match (&self.buffer, self.data_type) {
            (Some(buffer), Some(data_type)) => {
                let bytes = buffer.read_back()?;
                HostTensor::from_data(
                    self.dims.clone(),
                    TensorData::from_bytes(data_type, &bytes),
                )
            }
            _ => Ok(HostTensor::new(self.dims.clone())),
        }
    }

    fn assign(&mut self, source: &HostTensor) -> HarnessResult<()> {
        self.resize(source.dims());
        match source.data() {
            Some(data) => {
                self.allocate(data.data_type())?;
                if let Some(buffer) = self.buffer.as_mut() {
                    buffer.write(data.as_bytes())?;
                }
            }
            None => self.buffer = None,
        }
        Ok(())
    }
}

/// A tensor of either residency.
#[derive(Debug)]
pub enum Tensor {
    Host(HostTensor),
    Accelerator(AcceleratorTensor),
}

impl Tensor {
    pub fn ops(&self) -> &dyn TensorOps {
        match self {
            Tensor::Host(tensor) => tensor,
            Tensor::Accelerator(tensor) => tensor,
        }
    }

    pub fn ops_mut(&mut self) -> &mut dyn TensorOps {
        match self {
            Tensor::Host(tensor) => tensor,
            Tensor::Accelerator(tensor) => tensor,
        }
    }

    pub fn residency(&self) -> Residency {
        self.ops().residency()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_data_type() {
        assert_eq!(DataType::parse("uint8_t").unwrap(), DataType::U8);
        assert_eq!(DataType::parse(" float ").unwrap(), DataType::F32);
        assert!(matches!(
            DataType::parse("double"),
            Err(HarnessError::UnsupportedInputType { type_name }) if type_name == "double"
        ));
    }

    #[test]
    fn test_resize_then_allocate_host_tensor() {
        let mut tensor = HostTensor::default();
        tensor.resize(&[1, 3, 2, 2]);
        assert!(!tensor.is_allocated());

        tensor.allocate(DataType::F32).unwrap();
        assert_eq!(tensor.dims(), &[1, 3, 2, 2]);
        assert_eq!(tensor.data_type(), Some(DataType::F32));
        assert_eq!(tensor.as_f32().unwrap().len(), 12);
    }

    #[test]
    fn test_resize_keeps_storage_when_element_count_is_unchanged() {
        let mut tensor =
            HostTensor::from_data(vec![2, 2], TensorData::F32(vec![1.0, 2.0, 3.0, 4.0])).unwrap();
        tensor.resize(&[4]);
        assert_eq!(tensor.as_f32().unwrap(), &[1.0, 2.0, 3.0, 4.0]);

        tensor.resize(&[5]);
        assert!(!tensor.is_allocated());
    }

    #[test]
    fn test_allocate_with_new_type_replaces_storage() {
        let mut tensor = HostTensor::new(vec![3]);
        tensor.allocate(DataType::F32).unwrap();
        tensor.allocate(DataType::U8).unwrap();
        assert_eq!(tensor.as_u8().unwrap(), &[0, 0, 0]);
    }

    #[test]
    fn test_from_data_rejects_wrong_length() {
        let result = HostTensor::from_data(vec![2, 3], TensorData::U8(vec![0; 5]));
        assert!(matches!(
            result,
            Err(HarnessError::CorruptBlob {
                expected: 6,
                actual: 5,
                ..
            })
        ));
    }

    #[test]
    fn test_overflowing_shape_is_rejected() {
        let dims = [1usize << 32, 1usize << 32];
        assert_eq!(checked_numel(&dims), None);
        assert_eq!(numel(&dims), usize::MAX);

        let mut tensor = HostTensor::default();
        tensor.resize(&dims);
        assert!(matches!(
            tensor.allocate(DataType::F32),
            Err(HarnessError::ShapeTooLarge { .. })
        ));
        assert!(!tensor.is_allocated());
    }

    #[test]
    fn test_unaddressable_byte_len_is_rejected() {
        let len = isize::MAX as usize / 2;
        assert_eq!(checked_byte_len(&[len], DataType::U8), Some(len));
        assert_eq!(checked_byte_len(&[len + 1], DataType::F32), None);

        let mut tensor = HostTensor::new(vec![len + 1]);
        assert!(matches!(
            tensor.allocate(DataType::F32),
            Err(HarnessError::ShapeTooLarge { .. })
        ));
    }

    #[test]
    fn test_failed_host_reservation_is_an_error() {
        assert!(matches!(
            TensorData::try_zeros(DataType::U8, isize::MAX as usize),
            Err(HarnessError::HostAllocationFailed { .. })
        ));
    }

    #[test]
    fn test_bytes_round_trip_for_f32() {
        let data = TensorData::F32(vec![1.5, -2.0, 0.25]);
        let restored = TensorData::from_bytes(DataType::F32, data.as_bytes());
        assert_eq!(restored, data);
    }
}
