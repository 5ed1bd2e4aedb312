use ndarray::{Array1, Array2, ArrayView2, Axis};
use ndarray_rand::RandomExt;
use rand::Rng;
use rand_distr::Uniform;
use serde::{Deserialize, Serialize};

use crate::activations::Activation;
use crate::error::{C51Error, Result};

/// A fully connected (dense) layer.
///
/// `forward_batch` keeps the inputs and pre-activation output of the last call so
/// that `backward_batch` can compute gradients; `infer` leaves them untouched.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct DenseLayer {
    pub weights: Array2<f32>,
    pub biases: Array1<f32>,
    pub activation: Activation,
    #[serde(skip)]
    pre_activation_output: Option<Array2<f32>>,
    #[serde(skip)]
    inputs: Option<Array2<f32>>,
}

impl DenseLayer {
    /// Create a layer with Xavier-uniform weights and zero biases.
    pub fn new<R: Rng + ?Sized>(input_size: usize, output_size: usize, activation: Activation, rng: &mut R) -> Self {
        let limit = (6.0 / (input_size + output_size) as f32).sqrt();
        let weights = Array2::random_using((input_size, output_size), Uniform::new(-limit, limit), rng);
        let biases = Array1::zeros(output_size);
        DenseLayer {
            weights,
            biases,
            activation,
            pre_activation_output: None,
            inputs: None,
        }
    }

    pub fn input_size(&self) -> usize {
        self.weights.shape()[0]
    }

    pub fn output_size(&self) -> usize {
        self.weights.shape()[1]
    }

    /// Forward pass without touching the backward caches.
    pub fn infer(&self, inputs: ArrayView2<f32>) -> Array2<f32> {
        let mut outputs = inputs.dot(&self.weights) + &self.biases.view().insert_axis(Axis(0));
        self.activation.apply_batch(&mut outputs);
        outputs
    }

    /// Forward pass that records what `backward_batch` needs.
    pub fn forward_batch(&mut self, inputs: ArrayView2<f32>) -> Array2<f32> {
        self.inputs = Some(inputs.to_owned());
        let mut outputs = inputs.dot(&self.weights) + &self.biases.view().insert_axis(Axis(0));
        self.pre_activation_output = Some(outputs.clone());
        self.activation.apply_batch(&mut outputs);
        outputs
    }

    /// Returns `(adjusted_error, weight_gradients, bias_gradients)` for the errors
    /// at this layer's output.
    pub fn backward_batch(&self, output_errors: ArrayView2<f32>) -> Result<(Array2<f32>, Array2<f32>, Array1<f32>)> {
        let pre_activation_output = self.pre_activation_output.as_ref().ok_or_else(|| {
            C51Error::Training("forward_batch() must be called before backward_batch()".to_string())
        })?;
        let inputs = self.inputs.as_ref().ok_or_else(|| {
            C51Error::Training("forward_batch() must be called before backward_batch()".to_string())
        })?;

        let activation_deriv = self.activation.derivative_batch(pre_activation_output.view());
        let adjusted_error = &output_errors * &activation_deriv;
        let weight_gradients = inputs.t().dot(&adjusted_error);
        let bias_gradients = adjusted_error.sum_axis(Axis(0));

        Ok((adjusted_error, weight_gradients, bias_gradients))
    }

    pub(crate) fn clear_cache(&mut self) {
        self.inputs = None;
        self.pre_activation_output = None;
    }
}
