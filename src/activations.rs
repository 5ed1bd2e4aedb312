//! # Activation Functions
//!
//! Hidden-layer non-linearities for the value network. The output head is
//! always [`Activation::Linear`]; the per-action softmax over atoms is applied
//! by the network itself.

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

/// An enumeration of the activation functions available to dense layers.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    #[default]
    Relu,
    Linear,
    Tanh,
    LeakyRelu { alpha: f32 },
}

impl Activation {
    /// Apply the activation function to a batch in-place.
    pub fn apply_batch(&self, inputs: &mut Array2<f32>) {
        match self {
            Activation::Relu => {
                inputs.mapv_inplace(|v| v.max(0.0));
            }
            Activation::Linear => {}
            Activation::Tanh => {
                inputs.mapv_inplace(|v| v.tanh());
            }
            Activation::LeakyRelu { alpha } => {
                let a = *alpha;
                inputs.mapv_inplace(|v| if v > 0.0 { v } else { a * v });
            }
        }
    }

    /// Derivative with respect to the pre-activation values.
    pub fn derivative_batch(&self, pre_activation: ArrayView2<f32>) -> Array2<f32> {
        match self {
            Activation::Relu => {
                pre_activation.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 })
            }
            Activation::Linear => {
                Array2::ones(pre_activation.dim())
            }
            Activation::Tanh => {
                pre_activation.mapv(|v| {
                    let tanh_v = v.tanh();
                    1.0 - tanh_v * tanh_v
                })
            }
            Activation::LeakyRelu { alpha } => {
                let a = *alpha;
                pre_activation.mapv(|v| if v > 0.0 { 1.0 } else { a })
            }
        }
    }
}
