//! Built-in reference execution engine.
//!
//! Executes a small set of operators (`Copy`, `Relu`, `Sigmoid`, `Tanh`,
//! `Softmax`, `Add`, `Mul`, `Scale`, `ReduceSum`) on host copies of their
//! inputs. Outputs of operators placed on `CUDA` are written back to
//! accelerator memory. Engine tags are accepted but every operator runs its
//! default implementation.

pub mod activation;
pub mod operators;

pub use activation::Activation;
pub use operators::{OperatorError, OperatorKind};

use crate::accelerator::{Accelerator, require_accelerator};
use crate::errors::{HarnessError, HarnessResult};
use crate::graph_definition::{DeviceType, GraphDefinition, OperatorRecord};
use crate::net::{Net, NetFactory};
use crate::observer::NetObserver;
use crate::tensor::{HostTensor, Residency};
use crate::tensor_store::TensorStore;
use log::{debug, warn};
use std::sync::Arc;

/// Engine tags this engine implements natively.
const NATIVE_ENGINES: [&str; 1] = [""];

struct CompiledOperator {
    record: OperatorRecord,
    kind: OperatorKind,
}

/// Factory for [`ReferenceNet`]s.
pub struct ReferenceNetFactory {
    accelerator: Arc<dyn Accelerator>,
}

impl ReferenceNetFactory {
    pub fn new(accelerator: Arc<dyn Accelerator>) -> Self {
        Self { accelerator }
    }
}

impl NetFactory for ReferenceNetFactory {
    fn create_net(
        &self,
        definition: &GraphDefinition,
        _store: &mut TensorStore,
    ) -> HarnessResult<Box<dyn Net>> {
        let net_name = definition.name_or_default().to_string();
        let creation_error = |message: String| HarnessError::NetCreationFailed {
            net: net_name.clone(),
            message,
        };

        let mut ops = Vec::with_capacity(definition.ops.len());
        for (index, record) in definition.ops.iter().enumerate() {
            let kind = OperatorKind::from_record(record)
                .map_err(|e| creation_error(format!("operator {}: {}", index, e)))?;

            if record.device_type == DeviceType::Cuda {
                require_accelerator(self.accelerator.as_ref())
                    .map_err(|e| creation_error(format!("operator {}: {}", index, e)))?;
            }
            if let Some(engine) = record.engine.as_deref() {
                if !NATIVE_ENGINES.contains(&engine) {
                    warn!(
                        "Engine '{}' is not available for operator {} ({}), using the default implementation",
                        engine, index, record.op_type
                    );
                }
            }

            ops.push(CompiledOperator {
                record: record.clone(),
                kind,
            });
        }

        debug!("Created net '{}' with {} operators", net_name, ops.len());
        Ok(Box::new(ReferenceNet {
            name: net_name,
            ops,
            accelerator: self.accelerator.clone(),
        }))
    }
}

/// A graph compiled for the reference engine.
pub struct ReferenceNet {
    name: String,
    ops: Vec<CompiledOperator>,
    accelerator: Arc<dyn Accelerator>,
}

impl ReferenceNet {
    fn run_operator(&self, op: &CompiledOperator, store: &mut TensorStore) -> Result<(), String> {
        let mut inputs = Vec::with_capacity(op.record.inputs.len());
        for name in &op.record.inputs {
            let tensor = store
                .get_blob(name)
                .and_then(|blob| blob.tensor())
                .ok_or_else(|| OperatorError::MissingInput { name: name.clone() }.to_string())?;
            inputs.push(tensor.ops().to_host().map_err(|e| e.to_string())?);
        }

        let output: HostTensor = op.kind.compute(&inputs).map_err(|e| e.to_string())?;

        let residency = match op.record.device_type {
            DeviceType::Cpu => Residency::Host,
            DeviceType::Cuda => Residency::Accelerator,
        };
        store
            .create_blob(&op.record.outputs[0])
            .tensor_for(residency, &self.accelerator)
            .assign(&output)
            .map_err(|e| e.to_string())
    }
}

impl Net for ReferenceNet {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(
        &mut self,
        store: &mut TensorStore,
        observer: &mut dyn NetObserver,
    ) -> HarnessResult<()> {
        for (index, op) in self.ops.iter().enumerate() {
            observer.on_operator_start(index, &op.record);
            let result = self.run_operator(op, store);
            observer.on_operator_stop(index, &op.record);
            result.map_err(|message| HarnessError::OperatorFailed {
                index,
                op_type: op.record.op_type.clone(),
                message,
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accelerator::NoAccelerator;
    use crate::observer::NoopObserver;
    use crate::tensor::TensorData;

    fn factory() -> ReferenceNetFactory {
        ReferenceNetFactory::new(Arc::new(NoAccelerator))
    }

    #[test]
    fn test_run_chain_of_operators() {
        let graph = GraphDefinition::new(
            Some("chain"),
            vec![
                OperatorRecord::new("Relu", &["x"], &["h"]),
                OperatorRecord::new("Add", &["h", "x"], &["s"]),
                OperatorRecord::new("ReduceSum", &["s"], &["total"]),
            ],
        );
        let mut store = TensorStore::new();
        store
            .create_blob("x")
            .host_tensor_mut()
            .assign(
                &HostTensor::from_data(vec![3], TensorData::F32(vec![-1.0, 2.0, 3.0])).unwrap(),
            )
            .unwrap();

        let mut net = factory().create_net(&graph, &mut store).unwrap();
        assert_eq!(net.name(), "chain");
        net.run(&mut store, &mut NoopObserver).unwrap();

        let total = store.get_blob("total").unwrap().tensor().unwrap();
        let total = total.ops().to_host().unwrap();
        assert_eq!(total.as_f32().unwrap(), &[9.0]);
    }

    #[test]
    fn test_unknown_operator_fails_creation() {
        let graph = GraphDefinition::new(
            Some("bad"),
            vec![OperatorRecord::new("Conv", &["x"], &["y"])],
        );
        let result = factory().create_net(&graph, &mut TensorStore::new());
        assert!(matches!(
            result,
            Err(HarnessError::NetCreationFailed { net, .. }) if net == "bad"
        ));
    }

    #[test]
    fn test_accelerator_operator_without_support_fails_creation() {
        let mut op = OperatorRecord::new("Relu", &["x"], &["y"]);
        op.device_type = DeviceType::Cuda;
        let graph = GraphDefinition::new(Some("gpu"), vec![op]);
        assert!(
            factory()
                .create_net(&graph, &mut TensorStore::new())
                .is_err()
        );
    }

    #[test]
    fn test_missing_input_fails_run() {
        let graph = GraphDefinition::new(
            Some("missing"),
            vec![OperatorRecord::new("Copy", &["absent"], &["y"])],
        );
        let mut store = TensorStore::new();
        let mut net = factory().create_net(&graph, &mut store).unwrap();
        let result = net.run(&mut store, &mut NoopObserver);
        assert!(matches!(
            result,
            Err(HarnessError::OperatorFailed { index: 0, message, .. }) if message.contains("absent")
        ));
    }
}
