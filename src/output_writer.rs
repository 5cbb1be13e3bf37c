//! Output capture.
//!
//! Selected blobs are written either as serialized blobs (binary mode, one
//! file `<folder>/<name>` per blob) or as text dumps (`<folder>/<name>.txt`,
//! a header line followed by one element value per line).

use crate::accelerator::Accelerator;
use crate::blob_serialization::serialize_blob;
use crate::errors::{HarnessError, HarnessResult};
use crate::input_materializer::split_list;
use crate::tensor::{HostTensor, Residency, Tensor, TensorOps};
use crate::tensor_store::TensorStore;
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};

/// Which blobs to write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputSelection {
    /// Every blob currently in the store.
    All,
    Names(Vec<String>),
}

impl OutputSelection {
    /// Parses `*` or a comma-separated list of blob names.
    pub fn parse(output: &str) -> Self {
        if output.trim() == "*" {
            OutputSelection::All
        } else {
            OutputSelection::Names(split_list(output, ','))
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, OutputSelection::Names(names) if names.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Binary,
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRequest {
    pub selection: OutputSelection,
    /// Directory prefix; `None` writes next to the working directory.
    pub folder: Option<PathBuf>,
    pub format: OutputFormat,
}

impl OutputRequest {
    pub fn new(output: &str, output_folder: &str, text_output: bool) -> Self {
        Self {
            selection: OutputSelection::parse(output),
            folder: (!output_folder.is_empty()).then(|| PathBuf::from(output_folder)),
            format: if text_output {
                OutputFormat::Text
            } else {
                OutputFormat::Binary
            },
        }
    }

    fn path_for(&self, file_name: &str) -> PathBuf {
        match &self.folder {
            Some(folder) => folder.join(file_name),
            None => PathBuf::from(file_name),
        }
    }
}

/// Resolves the selection to blob names, failing on the first missing blob.
pub fn resolve_output_names(
    store: &TensorStore,
    selection: &OutputSelection,
) -> HarnessResult<Vec<String>> {
    match selection {
        OutputSelection::All => Ok(store.blob_names()),
        OutputSelection::Names(names) => {
            if let Some(missing) = names.iter().find(|name| !store.has_blob(name)) {
                return Err(HarnessError::NonExistingBlob {
                    name: missing.clone(),
                });
            }
            Ok(names.clone())
        }
    }
}

/// Renders a host tensor as text: `# <name> <dtype> [dims]` then one value per line.
pub fn render_text(name: &str, tensor: &HostTensor) -> String {
    let data_type = tensor
        .data_type()
        .map(|data_type| data_type.name())
        .unwrap_or("unallocated");
    let mut text = format!("# {} {} {:?}\n", name, data_type, tensor.dims());
    if let Some(data) = tensor.data() {
        for value in data.value_strings() {
            text.push_str(&value);
            text.push('\n');
        }
    }
    text
}

fn read_back_for_text(
    name: &str,
    tensor: &Tensor,
    accelerator: &dyn Accelerator,
) -> HarnessResult<HostTensor> {
    match tensor.residency() {
        Residency::Host => tensor.ops().to_host(),
        Residency::Accelerator => {
            if !accelerator.compiled_in() {
                return Err(HarnessError::AcceleratorNotCompiled);
            }
            debug!("Reading back accelerator tensor '{}'", name);
            tensor.ops().to_host()
        }
    }
}

fn write_file(path: &Path, contents: &[u8]) -> HarnessResult<()> {
    fs::write(path, contents).map_err(|source| HarnessError::FileWrite {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes every requested blob and returns the written paths.
///
/// All names are checked before anything is written. An empty selection does
/// nothing.
pub fn write_outputs(
    store: &TensorStore,
    request: &OutputRequest,
    accelerator: &dyn Accelerator,
) -> HarnessResult<Vec<PathBuf>> {
    if request.selection.is_empty() {
        return Ok(Vec::new());
    }

    let names = resolve_output_names(store, &request.selection)?;
    let mut written = Vec::with_capacity(names.len());
    for name in &names {
        let blob = store
            .get_blob(name)
            .ok_or_else(|| HarnessError::NonExistingBlob { name: name.clone() })?;

        let path = match request.format {
            OutputFormat::Binary => {
                let path = request.path_for(name);
                write_file(&path, &serialize_blob(name, blob)?)?;
                path
            }
            OutputFormat::Text => {
                let tensor = blob.tensor().ok_or_else(|| HarnessError::EmptyBlob {
                    name: name.clone(),
                })?;
                let host = read_back_for_text(name, tensor, accelerator)?;
                let path = request.path_for(&format!("{}.txt", name));
                write_file(&path, render_text(name, &host).as_bytes())?;
                path
            }
        };
        debug!("Wrote output '{}' to {}", name, path.display());
        written.push(path);
    }

    info!("Wrote {} outputs", written.len());
    Ok(written)
}
