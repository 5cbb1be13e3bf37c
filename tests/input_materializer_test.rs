//! Input materialization into the tensor store.

mod common;

use common::FakeAccelerator;
use graphbench::accelerator::{Accelerator, NoAccelerator};
use graphbench::blob_serialization::serialize_blob;
use graphbench::errors::HarnessError;
use graphbench::input_materializer::{InputDescriptors, load_inputs};
use graphbench::tensor::{DataType, HostTensor, Residency, TensorData, TensorOps};
use graphbench::tensor_store::TensorStore;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

fn descriptors(input: &str, input_file: &str, dims: &str, types: &str) -> InputDescriptors {
    InputDescriptors {
        input: input.to_string(),
        input_file: input_file.to_string(),
        input_dims: dims.to_string(),
        input_type: types.to_string(),
    }
}

fn host_only() -> Arc<dyn Accelerator> {
    Arc::new(NoAccelerator)
}

#[cfg(test)]
mod shape_input_tests {
    use super::*;

    #[test]
    fn test_allocates_every_shape_input_on_host() {
        let resolved = descriptors("data,label", "", "1,3,2,2;4", "float;uint8_t")
            .resolve()
            .unwrap();
        let mut store = TensorStore::new();
        load_inputs(&mut store, &resolved, false, &host_only()).unwrap();

        let data = store.get_blob("data").unwrap().tensor().unwrap();
        assert_eq!(data.residency(), Residency::Host);
        assert_eq!(data.ops().dims(), &[1, 3, 2, 2]);
        assert_eq!(data.ops().data_type(), Some(DataType::F32));
        assert_eq!(data.ops().numel(), 12);

        let label = store.get_blob("label").unwrap().tensor().unwrap();
        assert_eq!(label.ops().dims(), &[4]);
        assert_eq!(label.ops().data_type(), Some(DataType::U8));
    }

    #[test]
    fn test_reuses_existing_blob() {
        let mut store = TensorStore::new();
        store.create_blob("data");
        let resolved = descriptors("data", "", "2,2", "float").resolve().unwrap();
        load_inputs(&mut store, &resolved, false, &host_only()).unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.get_blob("data").unwrap().tensor().unwrap().ops().is_allocated());
    }

    #[test]
    fn test_accelerator_inputs_are_resident() {
        let accelerator = FakeAccelerator::available();
        let resolved = descriptors("data", "", "2,3", "float").resolve().unwrap();
        let mut store = TensorStore::new();
        load_inputs(&mut store, &resolved, true, &accelerator).unwrap();

        let data = store.get_blob("data").unwrap().tensor().unwrap();
        assert_eq!(data.residency(), Residency::Accelerator);
        assert_eq!(data.ops().dims(), &[2, 3]);
        assert_eq!(data.ops().to_host().unwrap().as_f32().unwrap(), &[0.0; 6]);
    }

    #[test]
    fn test_accelerator_inputs_without_support_fail() {
        let resolved = descriptors("data", "", "2", "float").resolve().unwrap();
        let mut store = TensorStore::new();
        let result = load_inputs(&mut store, &resolved, true, &host_only());
        assert!(matches!(result, Err(HarnessError::AcceleratorNotCompiled)));

        let result = load_inputs(&mut store, &resolved, true, &FakeAccelerator::without_device());
        assert!(matches!(result, Err(HarnessError::AcceleratorNotPresent)));
        assert!(store.is_empty());
    }
}

#[cfg(test)]
mod descriptor_validation_tests {
    use super::*;

    #[test]
    fn test_missing_dims_and_type() {
        assert!(matches!(
            descriptors("data", "", "", "").resolve(),
            Err(HarnessError::MissingInputSource)
        ));
    }

    #[test]
    fn test_dims_count_mismatch() {
        assert!(matches!(
            descriptors("a,b", "", "1,2", "float;float").resolve(),
            Err(HarnessError::InputCountMismatch { list: "dims", names: 2, items: 1 })
        ));
    }

    #[test]
    fn test_type_count_mismatch() {
        assert!(matches!(
            descriptors("a,b", "", "1;2", "float").resolve(),
            Err(HarnessError::InputCountMismatch { list: "type", names: 2, items: 1 })
        ));
    }

    #[test]
    fn test_file_count_mismatch() {
        assert!(matches!(
            descriptors("a,b", "a.blob", "", "").resolve(),
            Err(HarnessError::InputCountMismatch { list: "file", .. })
        ));
    }

    #[test]
    fn test_unsupported_type_is_configuration_error() {
        let err = descriptors("a", "", "1", "double").resolve().unwrap_err();
        assert!(err.is_configuration());
        assert!(matches!(err, HarnessError::UnsupportedInputType { type_name } if type_name == "double"));
    }

    #[test]
    fn test_oversized_shape_is_configuration_error() {
        let err = descriptors("data", "", "4294967296,4294967296", "float")
            .resolve()
            .unwrap_err();
        assert!(err.is_configuration());
        assert!(matches!(
            err,
            HarnessError::InputTooLarge { group, data_type: DataType::F32 } if group == "4294967296,4294967296"
        ));
    }

    #[test]
    fn test_no_inputs_loads_nothing() {
        let resolved = descriptors("", "", "", "").resolve().unwrap();
        assert!(resolved.is_empty());
        let mut store = TensorStore::new();
        load_inputs(&mut store, &resolved, true, &host_only()).unwrap();
        assert!(store.is_empty());
    }
}

#[cfg(test)]
mod file_input_tests {
    use super::*;

    #[test]
    fn test_file_inputs_restore_saved_blobs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.blob");

        let mut source = TensorStore::new();
        source
            .create_blob("data")
            .host_tensor_mut()
            .assign(&HostTensor::from_data(vec![2], TensorData::F32(vec![1.5, -2.0])).unwrap())
            .unwrap();
        let bytes = serialize_blob("data", source.get_blob("data").unwrap()).unwrap();
        fs::write(&path, bytes).unwrap();

        // Dims and type are ignored once files are given.
        let resolved = descriptors("data", path.to_str().unwrap(), "9,9", "double")
            .resolve()
            .unwrap();
        let mut store = TensorStore::new();
        load_inputs(&mut store, &resolved, false, &host_only()).unwrap();

        let restored = store.get_blob("data").unwrap().tensor().unwrap();
        let restored = restored.ops().to_host().unwrap();
        assert_eq!(restored.dims(), &[2]);
        assert_eq!(restored.as_f32().unwrap(), &[1.5, -2.0]);
    }

    #[test]
    fn test_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.blob");
        let resolved = descriptors("data", path.to_str().unwrap(), "", "")
            .resolve()
            .unwrap();
        let mut store = TensorStore::new();
        assert!(matches!(
            load_inputs(&mut store, &resolved, false, &host_only()),
            Err(HarnessError::FileRead { .. })
        ));
    }

    #[test]
    fn test_garbage_file_fails_to_decode() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("garbage.blob");
        fs::write(&path, b"\x00\x01not a blob").unwrap();
        let resolved = descriptors("data", path.to_str().unwrap(), "", "")
            .resolve()
            .unwrap();
        let mut store = TensorStore::new();
        assert!(matches!(
            load_inputs(&mut store, &resolved, false, &host_only()),
            Err(HarnessError::Decode { .. })
        ));
    }
}
