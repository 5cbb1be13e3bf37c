//! Operator kernels of the reference engine.

use super::activation::Activation;
use crate::graph_definition::OperatorRecord;
use crate::tensor::{HostTensor, TensorData, TensorOps};
use thiserror::Error;

/// Errors raised while compiling or executing a reference operator.
#[derive(Error, Debug, PartialEq)]
pub enum OperatorError {
    #[error("Unknown operator type: {op_type}")]
    UnknownType { op_type: String },

    #[error("Expected {expected_inputs} inputs and {expected_outputs} outputs, got {inputs} and {outputs}")]
    Arity {
        expected_inputs: usize,
        expected_outputs: usize,
        inputs: usize,
        outputs: usize,
    },

    #[error("Missing or non-numeric argument '{arg}'")]
    MissingArgument { arg: &'static str },

    #[error("Input blob '{name}' does not exist")]
    MissingInput { name: String },

    #[error("Input {index} holds no allocated tensor")]
    UnallocatedInput { index: usize },

    #[error("Input {index} must hold float elements")]
    UnsupportedDataType { index: usize },

    #[error("Input shapes differ: {left:?} != {right:?}")]
    ShapeMismatch { left: Vec<usize>, right: Vec<usize> },
}

/// What a reference operator computes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OperatorKind {
    Copy,
    Activation(Activation),
    Add,
    Mul,
    Scale(f32),
    ReduceSum,
}

impl OperatorKind {
    /// Compiles an operator record, checking its type, arity and arguments.
    pub fn from_record(op: &OperatorRecord) -> Result<Self, OperatorError> {
        let kind = match op.op_type.as_str() {
            "Copy" => OperatorKind::Copy,
            "Add" => OperatorKind::Add,
            "Mul" => OperatorKind::Mul,
            "ReduceSum" => OperatorKind::ReduceSum,
            "Scale" => {
                let scale = op
                    .args
                    .get("scale")
                    .and_then(|value| value.as_f64())
                    .ok_or(OperatorError::MissingArgument { arg: "scale" })?;
                OperatorKind::Scale(scale as f32)
            }
            other => Activation::from_op_type(other)
                .map(OperatorKind::Activation)
                .ok_or_else(|| OperatorError::UnknownType {
                    op_type: other.to_string(),
                })?,
        };

        let (expected_inputs, expected_outputs) = kind.arity();
        if op.inputs.len() != expected_inputs || op.outputs.len() != expected_outputs {
            return Err(OperatorError::Arity {
                expected_inputs,
                expected_outputs,
                inputs: op.inputs.len(),
                outputs: op.outputs.len(),
            });
        }
        Ok(kind)
    }

    /// Number of (inputs, outputs).
    pub fn arity(&self) -> (usize, usize) {
        match self {
            OperatorKind::Add | OperatorKind::Mul => (2, 1),
            _ => (1, 1),
        }
    }

    /// Computes the single output of the operator from host copies of its inputs.
    pub fn compute(&self, inputs: &[HostTensor]) -> Result<HostTensor, OperatorError> {
        let (expected_inputs, expected_outputs) = self.arity();
        if inputs.len() != expected_inputs {
            return Err(OperatorError::Arity {
                expected_inputs,
                expected_outputs,
                inputs: inputs.len(),
                outputs: expected_outputs,
            });
        }

        match self {
            OperatorKind::Copy => {
                let input = &inputs[0];
                if !input.is_allocated() {
                    return Err(OperatorError::UnallocatedInput { index: 0 });
                }
                Ok(input.clone())
            }
            OperatorKind::Activation(activation) => {
                let mut output = inputs[0].clone();
                activation.apply_in_place(f32_values_mut(&mut output, 0)?);
                Ok(output)
            }
            OperatorKind::Scale(scale) => {
                let mut output = inputs[0].clone();
                for value in f32_values_mut(&mut output, 0)? {
                    *value *= scale;
                }
                Ok(output)
            }
            OperatorKind::Add => elementwise(inputs, |a, b| a + b),
            OperatorKind::Mul => elementwise(inputs, |a, b| a * b),
            OperatorKind::ReduceSum => {
                let sum: f32 = f32_values(&inputs[0], 0)?.iter().sum();
                Ok(HostTensor::scalar(sum))
            }
        }
    }
}

fn f32_values(tensor: &HostTensor, index: usize) -> Result<&[f32], OperatorError> {
    match tensor.data() {
        None => Err(OperatorError::UnallocatedInput { index }),
        Some(TensorData::F32(values)) => Ok(values),
        Some(_) => Err(OperatorError::UnsupportedDataType { index }),
    }
}

fn f32_values_mut(tensor: &mut HostTensor, index: usize) -> Result<&mut [f32], OperatorError> {
    match tensor.data_mut() {
        None => Err(OperatorError::UnallocatedInput { index }),
        Some(TensorData::F32(values)) => Ok(values),
        Some(_) => Err(OperatorError::UnsupportedDataType { index }),
    }
}

fn elementwise(
    inputs: &[HostTensor],
    combine: impl Fn(f32, f32) -> f32,
) -> Result<HostTensor, OperatorError> {
    let (left, right) = (&inputs[0], &inputs[1]);
    if left.dims() != right.dims() {
        return Err(OperatorError::ShapeMismatch {
            left: left.dims().to_vec(),
            right: right.dims().to_vec(),
        });
    }
    let right_values = f32_values(right, 1)?;
    let mut output = left.clone();
    for (value, &other) in f32_values_mut(&mut output, 0)?.iter_mut().zip(right_values) {
        *value = combine(*value, other);
    }
    Ok(output)
}
