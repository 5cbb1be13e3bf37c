//! Input tensor materialization.
//!
//! Inputs are described by parallel lists: comma-separated blob names, plus
//! either comma-separated file paths or semicolon-separated dimension groups
//! with semicolon-separated element types. Every descriptor is parsed and
//! validated before the store is touched, so a bad configuration never leaves
//! a partially populated store behind.

use crate::accelerator::{Accelerator, require_accelerator};
use crate::blob_serialization::read_blob_file;
use crate::errors::{HarnessError, HarnessResult};
use crate::tensor::{DataType, Residency, checked_byte_len};
use crate::tensor_store::TensorStore;
use log::{debug, info};
use std::path::PathBuf;
use std::sync::Arc;

/// Splits a delimited parameter list. An empty parameter yields no items.
pub fn split_list(value: &str, delimiter: char) -> Vec<String> {
    if value.is_empty() {
        return Vec::new();
    }
    value
        .split(delimiter)
        .map(|item| item.trim().to_string())
        .collect()
}

/// Parses one comma-separated dimension group, e.g. `1,3,224,224`.
pub fn parse_dims(group: &str) -> HarnessResult<Vec<usize>> {
    group
        .split(',')
        .map(|value| {
            value
                .trim()
                .parse::<usize>()
                .map_err(|_| HarnessError::InvalidInputDims {
                    group: group.to_string(),
                    value: value.to_string(),
                })
        })
        .collect()
}

/// Where an input tensor comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum InputSource {
    /// A serialized blob file.
    File(PathBuf),
    /// A freshly allocated tensor of the given shape and element type.
    Shape { dims: Vec<usize>, data_type: DataType },
}

#[derive(Debug, Clone, PartialEq)]
pub struct InputDescriptor {
    pub name: String,
    pub source: InputSource,
}

/// Raw input parameters as given to the harness.
#[derive(Debug, Clone, Default)]
pub struct InputDescriptors {
    pub input: String,
    pub input_file: String,
    pub input_dims: String,
    pub input_type: String,
}

impl InputDescriptors {
    /// Parses and validates the parallel lists into one descriptor per input name.
    pub fn resolve(&self) -> HarnessResult<Vec<InputDescriptor>> {
        let names = split_list(&self.input, ',');
        if names.is_empty() {
            return Ok(Vec::new());
        }

        if !self.input_file.is_empty() {
            let files = split_list(&self.input_file, ',');
            if names.len() != files.len() {
                return Err(HarnessError::InputCountMismatch {
                    list: "file",
                    names: names.len(),
                    items: files.len(),
                });
            }
            return Ok(names
                .into_iter()
                .zip(files)
                .map(|(name, file)| InputDescriptor {
                    name,
                    source: InputSource::File(PathBuf::from(file)),
                })
                .collect());
        }

        if self.input_dims.is_empty() && self.input_type.is_empty() {
            return Err(HarnessError::MissingInputSource);
        }

        let dims_list = split_list(&self.input_dims, ';');
        if names.len() != dims_list.len() {
            return Err(HarnessError::InputCountMismatch {
                list: "dims",
                names: names.len(),
                items: dims_list.len(),
            });
        }
        let type_list = split_list(&self.input_type, ';');
        if names.len() != type_list.len() {
            return Err(HarnessError::InputCountMismatch {
                list: "type",
                names: names.len(),
                items: type_list.len(),
            });
        }

        names
            .into_iter()
            .zip(dims_list.iter().zip(type_list.iter()))
            .map(|(name, (group, type_name))| {
                let dims = parse_dims(group)?;
                let data_type = DataType::parse(type_name)?;
                if checked_byte_len(&dims, data_type).is_none() {
                    return Err(HarnessError::InputTooLarge {
                        group: group.clone(),
                        data_type,
                    });
                }
                Ok(InputDescriptor {
                    name,
                    source: InputSource::Shape { dims, data_type },
                })
            })
            .collect()
    }
}

/// Populates `store` so that every descriptor maps to a fully backed tensor.
///
/// Shape-described inputs are created accelerator-resident when
/// `run_on_accelerator` is set, host-resident otherwise.
pub fn load_inputs(
    store: &mut TensorStore,
    descriptors: &[InputDescriptor],
    run_on_accelerator: bool,
    accelerator: &Arc<dyn Accelerator>,
) -> HarnessResult<()> {
    let has_shape_inputs = descriptors
        .iter()
        .any(|d| matches!(d.source, InputSource::Shape { .. }));
    if run_on_accelerator && has_shape_inputs {
        require_accelerator(accelerator.as_ref())?;
        info!("Running on GPU.");
    }
    let residency = if run_on_accelerator {
        Residency::Accelerator
    } else {
        Residency::Host
    };

    for descriptor in descriptors {
        match &descriptor.source {
            InputSource::File(path) => {
                debug!(
                    "Loading input '{}' from {}",
                    descriptor.name,
                    path.display()
                );
                let blob = store.create_blob(&descriptor.name);
                blob.reset();
                read_blob_file(path, blob, accelerator)?;
            }
            InputSource::Shape { dims, data_type } => {
                debug!(
                    "Allocating input '{}' as {} {:?}",
                    descriptor.name, data_type, dims
                );
                let tensor = store
                    .create_blob(&descriptor.name)
                    .tensor_for(residency, accelerator);
                tensor.resize(dims);
                tensor.allocate(*data_type)?;
            }
        }
    }

    Ok(())
}
