//! Benchmark configuration.

use crate::errors::{HarnessError, HarnessResult};
use crate::execution_loop::LoopSettings;
use crate::input_materializer::InputDescriptors;
use crate::output_writer::OutputRequest;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Every parameter of a benchmark invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Path of the benchmarked graph definition.
    pub net: String,
    /// Optional graph run once before the benchmark to initialise parameters.
    pub init_net: String,
    pub backend: String,
    pub input: String,
    pub input_file: String,
    pub input_dims: String,
    pub input_type: String,
    pub output: String,
    pub output_folder: String,
    pub text_output: bool,
    pub warmup: i64,
    pub iter: i64,
    pub run_individual: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            net: String::new(),
            init_net: String::new(),
            backend: "builtin".to_string(),
            input: String::new(),
            input_file: String::new(),
            input_dims: String::new(),
            input_type: String::new(),
            output: String::new(),
            output_folder: String::new(),
            text_output: false,
            warmup: 0,
            iter: 10,
            run_individual: false,
        }
    }
}

impl HarnessConfig {
    pub fn input_descriptors(&self) -> InputDescriptors {
        InputDescriptors {
            input: self.input.clone(),
            input_file: self.input_file.clone(),
            input_dims: self.input_dims.clone(),
            input_type: self.input_type.clone(),
        }
    }

    pub fn loop_settings(&self) -> LoopSettings {
        LoopSettings {
            warmup: self.warmup,
            iter: self.iter,
            run_individual: self.run_individual,
        }
    }

    pub fn output_request(&self) -> OutputRequest {
        OutputRequest::new(&self.output, &self.output_folder, self.text_output)
    }
}

/// Loads configuration files, falling back to defaults when absent.
pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load(path: &Path) -> HarnessResult<HarnessConfig> {
        match fs::read_to_string(path) {
            Ok(content) => {
                serde_json::from_str(&content).map_err(|source| HarnessError::Decode {
                    path: path.to_path_buf(),
                    source,
                })
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(
                    "Config file '{}' not found, using default configuration",
                    path.display()
                );
                Ok(HarnessConfig::default())
            }
            Err(source) => Err(HarnessError::FileRead {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}
