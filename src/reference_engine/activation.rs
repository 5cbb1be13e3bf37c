//! Element-wise activation operators.

/// Activation applied by the `Relu`, `Sigmoid`, `Tanh` and `Softmax` operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// f(x) = max(0, x).
    Relu,
    /// f(x) = 1 / (1 + exp(-x)).
    Sigmoid,
    Tanh,
    /// Numerically stable softmax over the whole tensor:
    /// ```text
    /// Softmax(x_i) = exp(x_i - max(x)) / sum_j exp(x_j - max(x))
    /// ```
    Softmax,
}

impl Activation {
    /// Maps an operator type to its activation.
    pub fn from_op_type(op_type: &str) -> Option<Self> {
        match op_type {
            "Relu" => Some(Activation::Relu),
            "Sigmoid" => Some(Activation::Sigmoid),
            "Tanh" => Some(Activation::Tanh),
            "Softmax" => Some(Activation::Softmax),
            _ => None,
        }
    }

    fn apply_single(self, x: f32) -> f32 {
        match self {
            Activation::Relu => x.max(0.0),
            Activation::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            Activation::Tanh => x.tanh(),
            Activation::Softmax => x.exp(),
        }
    }

    pub fn apply_in_place(self, values: &mut [f32]) {
        match self {
            Activation::Softmax => {
                if values.is_empty() {
                    return;
                }
                let max_val = values.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
                let mut sum = 0.0f32;
                for val in values.iter_mut() {
                    *val = (*val - max_val).exp();
                    sum += *val;
                }
                for val in values.iter_mut() {
                    *val /= sum;
                }
            }
            _ => {
                for val in values.iter_mut() {
                    *val = self.apply_single(*val);
                }
            }
        }
    }
}
