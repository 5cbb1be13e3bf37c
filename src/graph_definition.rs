//! Graph definitions consumed by the harness.
//!
//! A graph definition is an ordered list of operator records. The harness only
//! reads and stamps the engine and device-type fields of each record; operator
//! arguments are opaque here and interpreted by the execution engine.
//! Definitions are stored as JSON documents.

use crate::errors::{HarnessError, HarnessResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// Device an operator is placed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeviceType {
    #[default]
    Cpu,
    Cuda,
}

/// A single operator of a graph definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperatorRecord {
    /// Operator type name, e.g. `Relu`.
    #[serde(rename = "type")]
    pub op_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub inputs: Vec<String>,
    #[serde(default)]
    pub outputs: Vec<String>,
    /// Engine tag. `None` selects the operator's default implementation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
    #[serde(default)]
    pub device_type: DeviceType,
    /// Operator arguments, opaque to the harness.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub args: Map<String, Value>,
}

impl OperatorRecord {
    pub fn new(op_type: &str, inputs: &[&str], outputs: &[&str]) -> Self {
        Self {
            op_type: op_type.to_string(),
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            outputs: outputs.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn with_arg(mut self, key: &str, value: Value) -> Self {
        self.args.insert(key.to_string(), value);
        self
    }

    /// Name used in logs: the operator name if set, its type otherwise.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.op_type)
    }
}

/// A precompiled description of a sequence of operators to execute.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, rename = "op")]
    pub ops: Vec<OperatorRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub external_inputs: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub external_outputs: Vec<String>,
}

impl GraphDefinition {
    pub fn new(name: Option<&str>, ops: Vec<OperatorRecord>) -> Self {
        Self {
            name: name.map(str::to_string),
            ops,
            ..Default::default()
        }
    }

    /// Parses a definition from its JSON encoding.
    pub fn from_json_slice(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }

    /// Reads and parses the definition stored at `path`.
    pub fn load(path: &Path) -> HarnessResult<Self> {
        let bytes = fs::read(path).map_err(|source| HarnessError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_slice(&bytes).map_err(|source| HarnessError::Decode {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Writes the definition to `path` as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> HarnessResult<()> {
        let json = serde_json::to_vec_pretty(self).map_err(|source| HarnessError::Encode {
            name: self.name.clone().unwrap_or_default(),
            source,
        })?;
        fs::write(path, json).map_err(|source| HarnessError::FileWrite {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn has_name(&self) -> bool {
        self.name.as_deref().is_some_and(|name| !name.is_empty())
    }

    /// Assigns `default_name` when the definition has none.
    pub fn ensure_name(&mut self, default_name: &str) {
        if !self.has_name() {
            self.name = Some(default_name.to_string());
        }
    }

    pub fn name_or_default(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }
}
