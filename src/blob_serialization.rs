//! Blob encoding used for input files and binary outputs.
//!
//! A serialized blob is a JSON record carrying the blob name, the residency it
//! was captured from, and the tensor shape and typed elements. `float`
//! elements are stored as IEEE-754 bit patterns so NaN and infinities survive
//! the JSON encoding.

use crate::accelerator::{Accelerator, require_accelerator};
use crate::errors::{HarnessError, HarnessResult};
use crate::graph_definition::DeviceType;
use crate::tensor::{HostTensor, Residency, TensorData, TensorOps, checked_numel};
use crate::tensor_store::Blob;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// On-disk representation of a blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlobRecord {
    pub name: String,
    #[serde(default)]
    pub device_type: DeviceType,
    pub tensor: TensorRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensorRecord {
    pub dims: Vec<usize>,
    #[serde(with = "element_payload")]
    pub data: TensorData,
}

mod element_payload {
    use super::*;

    #[derive(Serialize)]
    enum PayloadRef<'a> {
        #[serde(rename = "uint8_t")]
        U8(&'a [u8]),
        #[serde(rename = "float_bits")]
        F32Bits(&'a [u32]),
    }

    #[derive(Deserialize)]
    enum Payload {
        #[serde(rename = "uint8_t")]
        U8(Vec<u8>),
        #[serde(rename = "float_bits")]
        F32Bits(Vec<u32>),
    }

    pub fn serialize<S: Serializer>(data: &TensorData, serializer: S) -> Result<S::Ok, S::Error> {
        match data {
            TensorData::U8(values) => PayloadRef::U8(values),
            TensorData::F32(values) => PayloadRef::F32Bits(bytemuck::cast_slice(values)),
        }
        .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<TensorData, D::Error> {
        Ok(match Payload::deserialize(deserializer)? {
            Payload::U8(values) => TensorData::U8(values),
            Payload::F32Bits(bits) => TensorData::F32(bits.into_iter().map(f32::from_bits).collect()),
        })
    }
}

/// Encodes the tensor held by `blob` under `name`.
pub fn serialize_blob(name: &str, blob: &Blob) -> HarnessResult<Vec<u8>> {
    let tensor = blob.tensor().ok_or_else(|| HarnessError::EmptyBlob {
        name: name.to_string(),
    })?;
    let device_type = match tensor.residency() {
        Residency::Host => DeviceType::Cpu,
        Residency::Accelerator => DeviceType::Cuda,
    };
    let host = tensor.ops().to_host()?;
    let data = host.data().cloned().ok_or_else(|| HarnessError::EmptyBlob {
        name: name.to_string(),
    })?;

    let record = BlobRecord {
        name: name.to_string(),
        device_type,
        tensor: TensorRecord {
            dims: host.dims().to_vec(),
            data,
        },
    };
    serde_json::to_vec(&record).map_err(|source| HarnessError::Encode {
        name: name.to_string(),
        source,
    })
}

/// Restores a decoded record into `blob`, replacing what it held. Records
/// captured from accelerator memory go back to accelerator memory.
pub fn restore_blob(
    record: BlobRecord,
    blob: &mut Blob,
    accelerator: &Arc<dyn Accelerator>,
) -> HarnessResult<()> {
    let expected = checked_numel(&record.tensor.dims).ok_or_else(|| {
        HarnessError::ShapeTooLarge {
            dims: record.tensor.dims.clone(),
        }
    })?;
    let actual = record.tensor.data.len();
    if expected != actual {
        return Err(HarnessError::CorruptBlob {
            name: record.name,
            expected,
            actual,
        });
    }

    let host = HostTensor::from_data(record.tensor.dims, record.tensor.data)?;
    match record.device_type {
        DeviceType::Cpu => blob.host_tensor_mut().assign(&host),
        DeviceType::Cuda => {
            require_accelerator(accelerator.as_ref())?;
            blob.accelerator_tensor_mut(accelerator).assign(&host)
        }
    }
}

/// Reads the serialized blob stored at `path` into `blob`.
pub fn read_blob_file(
    path: &Path,
    blob: &mut Blob,
    accelerator: &Arc<dyn Accelerator>,
) -> HarnessResult<()> {
    let bytes = fs::read(path).map_err(|source| HarnessError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let record: BlobRecord =
        serde_json::from_slice(&bytes).map_err(|source| HarnessError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
    restore_blob(record, blob, accelerator)
}
