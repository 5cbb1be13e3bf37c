//! Backend selection.
//!
//! A backend name resolves to the device type stamped on every operator and,
//! except for `builtin`, to the engine tag stamped on every operator.

use crate::accelerator::{Accelerator, require_accelerator};
use crate::errors::{HarnessError, HarnessResult};
use crate::graph_definition::{DeviceType, GraphDefinition};
use log::info;
use std::fmt;
use std::str::FromStr;

/// Backends the harness can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Builtin,
    Nnpack,
    Eigen,
    Mkl,
    Cuda,
    Default,
}

/// Operator implementation families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engine {
    Nnpack,
    Eigen,
    Mkldnn,
    Cuda,
    /// The explicit empty engine tag.
    Default,
}

impl Engine {
    pub fn tag(self) -> &'static str {
        match self {
            Engine::Nnpack => "NNPACK",
            Engine::Eigen => "EIGEN",
            Engine::Mkldnn => "MKLDNN",
            Engine::Cuda => "CUDA",
            Engine::Default => "",
        }
    }
}

impl Backend {
    pub const ALL: [Backend; 6] = [
        Backend::Builtin,
        Backend::Nnpack,
        Backend::Eigen,
        Backend::Mkl,
        Backend::Cuda,
        Backend::Default,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Backend::Builtin => "builtin",
            Backend::Nnpack => "nnpack",
            Backend::Eigen => "eigen",
            Backend::Mkl => "mkl",
            Backend::Cuda => "cuda",
            Backend::Default => "default",
        }
    }

    /// Engine stamped on every operator. `None` leaves engines untouched.
    pub fn engine(self) -> Option<Engine> {
        match self {
            Backend::Builtin => None,
            Backend::Nnpack => Some(Engine::Nnpack),
            Backend::Eigen => Some(Engine::Eigen),
            Backend::Mkl => Some(Engine::Mkldnn),
            Backend::Cuda => Some(Engine::Cuda),
            Backend::Default => Some(Engine::Default),
        }
    }

    pub fn requires_accelerator(self) -> bool {
        matches!(self, Backend::Cuda)
    }
}

impl FromStr for Backend {
    type Err = HarnessError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Backend::ALL
            .into_iter()
            .find(|backend| backend.name() == name)
            .ok_or_else(|| HarnessError::UnsupportedBackend {
                backend: name.to_string(),
            })
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Resolved effect of a backend on a graph definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendSelection {
    pub backend: Backend,
    pub device_type: DeviceType,
    pub engine: Option<Engine>,
}

impl BackendSelection {
    pub fn runs_on_accelerator(&self) -> bool {
        self.device_type == DeviceType::Cuda
    }

    /// Stamps the device type, and the engine when one is selected, on every operator.
    pub fn apply(&self, graph: &mut GraphDefinition) {
        for op in graph.ops.iter_mut() {
            op.device_type = self.device_type;
        }
        if let Some(engine) = self.engine {
            for op in graph.ops.iter_mut() {
                op.engine = Some(engine.tag().to_string());
            }
        }
    }
}

/// Resolves `backend_name` without touching any graph.
pub fn resolve_backend(
    backend_name: &str,
    accelerator: &dyn Accelerator,
) -> HarnessResult<BackendSelection> {
    let backend: Backend = backend_name.parse()?;
    let device_type = if backend.requires_accelerator() {
        require_accelerator(accelerator)?;
        DeviceType::Cuda
    } else {
        DeviceType::Cpu
    };

    Ok(BackendSelection {
        backend,
        device_type,
        engine: backend.engine(),
    })
}

/// Resolves `backend_name` and rewrites `graph` accordingly. On failure the
/// graph is left unmodified.
pub fn configure_backend(
    graph: &mut GraphDefinition,
    backend_name: &str,
    accelerator: &dyn Accelerator,
) -> HarnessResult<BackendSelection> {
    let selection = resolve_backend(backend_name, accelerator)?;
    selection.apply(graph);
    info!(
        "Configured backend '{}' on {} operators (device {:?}, engine {:?})",
        selection.backend,
        graph.ops.len(),
        selection.device_type,
        selection.engine.map(Engine::tag)
    );
    Ok(selection)
}
