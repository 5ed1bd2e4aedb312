//! # Optimizers
//!
//! Parameter update rules used by [`CategoricalNetwork`](crate::network::CategoricalNetwork).
//! State is kept per layer index, so a single optimizer instance serves a whole network.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::config::OptimizerConfig;

pub trait Optimizer {
    fn update_weights(&mut self, layer: usize, weights: &mut Array2<f32>, gradients: &Array2<f32>, learning_rate: f32);
    fn update_biases(&mut self, layer: usize, biases: &mut Array1<f32>, gradients: &Array1<f32>, learning_rate: f32);

    /// Called once after every layer of the network has been updated.
    fn finish_step(&mut self) {}
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum OptimizerWrapper {
    SGD(SGD),
    Adam(Adam),
}

impl OptimizerWrapper {
    pub fn from_config(config: &OptimizerConfig) -> Self {
        match *config {
            OptimizerConfig::Sgd => OptimizerWrapper::SGD(SGD::new()),
            OptimizerConfig::Adam { beta1, beta2, epsilon } => {
                OptimizerWrapper::Adam(Adam::new(beta1, beta2, epsilon))
            }
        }
    }
}

impl Optimizer for OptimizerWrapper {
    fn update_weights(&mut self, layer: usize, weights: &mut Array2<f32>, gradients: &Array2<f32>, learning_rate: f32) {
        match self {
            OptimizerWrapper::SGD(optimizer) => optimizer.update_weights(layer, weights, gradients, learning_rate),
            OptimizerWrapper::Adam(optimizer) => optimizer.update_weights(layer, weights, gradients, learning_rate),
        }
    }

    fn update_biases(&mut self, layer: usize, biases: &mut Array1<f32>, gradients: &Array1<f32>, learning_rate: f32) {
        match self {
            OptimizerWrapper::SGD(optimizer) => optimizer.update_biases(layer, biases, gradients, learning_rate),
            OptimizerWrapper::Adam(optimizer) => optimizer.update_biases(layer, biases, gradients, learning_rate),
        }
    }

    fn finish_step(&mut self) {
        match self {
            OptimizerWrapper::SGD(optimizer) => optimizer.finish_step(),
            OptimizerWrapper::Adam(optimizer) => optimizer.finish_step(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct SGD;

impl SGD {
    pub fn new() -> SGD {
        SGD
    }
}

impl Optimizer for SGD {
    fn update_weights(&mut self, _layer: usize, weights: &mut Array2<f32>, gradients: &Array2<f32>, learning_rate: f32) {
        weights.zip_mut_with(gradients, |w, &g| *w -= learning_rate * g);
    }

    fn update_biases(&mut self, _layer: usize, biases: &mut Array1<f32>, gradients: &Array1<f32>, learning_rate: f32) {
        biases.zip_mut_with(gradients, |b, &g| *b -= learning_rate * g);
    }
}

/// Adam with bias-corrected moment estimates.
///
/// Moment buffers are created on the first update of each layer.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Adam {
    pub beta1: f32,
    pub beta2: f32,
    pub epsilon: f32,
    m_weights: Vec<Array2<f32>>,
    v_weights: Vec<Array2<f32>>,
    m_biases: Vec<Array1<f32>>,
    v_biases: Vec<Array1<f32>>,
    pub t: usize,
}

impl Adam {
    pub fn new(beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Adam {
            beta1,
            beta2,
            epsilon,
            m_weights: Vec::new(),
            v_weights: Vec::new(),
            m_biases: Vec::new(),
            v_biases: Vec::new(),
            t: 1,
        }
    }

    fn ensure_weight_state(&mut self, layer: usize, dim: (usize, usize)) {
        while self.m_weights.len() <= layer {
            self.m_weights.push(Array2::zeros((0, 0)));
            self.v_weights.push(Array2::zeros((0, 0)));
        }
        if self.m_weights[layer].dim() != dim {
            self.m_weights[layer] = Array2::zeros(dim);
            self.v_weights[layer] = Array2::zeros(dim);
        }
    }

    fn ensure_bias_state(&mut self, layer: usize, len: usize) {
        while self.m_biases.len() <= layer {
            self.m_biases.push(Array1::zeros(0));
            self.v_biases.push(Array1::zeros(0));
        }
        if self.m_biases[layer].len() != len {
            self.m_biases[layer] = Array1::zeros(len);
            self.v_biases[layer] = Array1::zeros(len);
        }
    }

    fn bias_corrections(&self) -> (f32, f32) {
        (
            1.0 - self.beta1.powi(self.t as i32),
            1.0 - self.beta2.powi(self.t as i32),
        )
    }
}

impl Default for Adam {
    fn default() -> Self {
        Self::new(0.9, 0.999, 1e-8)
    }
}

impl Optimizer for Adam {
    fn update_weights(&mut self, layer: usize, weights: &mut Array2<f32>, gradients: &Array2<f32>, learning_rate: f32) {
        self.ensure_weight_state(layer, weights.dim());
        let (c1, c2) = self.bias_corrections();
        let (beta1, beta2, eps) = (self.beta1, self.beta2, self.epsilon);

        let m = &mut self.m_weights[layer];
        let v = &mut self.v_weights[layer];
        m.zip_mut_with(gradients, |m, &g| *m = beta1 * *m + (1.0 - beta1) * g);
        v.zip_mut_with(gradients, |v, &g| *v = beta2 * *v + (1.0 - beta2) * g * g);

        ndarray::Zip::from(weights)
            .and(&*m)
            .and(&*v)
            .for_each(|w, &m, &v| {
                *w -= learning_rate * (m / c1) / ((v / c2).sqrt() + eps);
            });
    }

    fn update_biases(&mut self, layer: usize, biases: &mut Array1<f32>, gradients: &Array1<f32>, learning_rate: f32) {
        self.ensure_bias_state(layer, biases.len());
        let (c1, c2) = self.bias_corrections();
        let (beta1, beta2, eps) = (self.beta1, self.beta2, self.epsilon);

        let m = &mut self.m_biases[layer];
        let v = &mut self.v_biases[layer];
        m.zip_mut_with(gradients, |m, &g| *m = beta1 * *m + (1.0 - beta1) * g);
        v.zip_mut_with(gradients, |v, &g| *v = beta2 * *v + (1.0 - beta2) * g * g);

        ndarray::Zip::from(biases)
            .and(&*m)
            .and(&*v)
            .for_each(|b, &m, &v| {
                *b -= learning_rate * (m / c1) / ((v / c2).sqrt() + eps);
            });
    }

    fn finish_step(&mut self) {
        self.t += 1;
    }
}

/// Rescale all gradients so their joint L2 norm does not exceed `max_norm`.
///
/// Returns the norm measured before clipping.
pub fn clip_by_global_norm(gradients: &mut [(Array2<f32>, Array1<f32>)], max_norm: f32) -> f32 {
    let norm_sq: f32 = gradients
        .iter()
        .map(|(w, b)| w.iter().map(|&x| x * x).sum::<f32>() + b.iter().map(|&x| x * x).sum::<f32>())
        .sum();
    let norm = norm_sq.sqrt();
    if norm > max_norm {
        let scale = max_norm / norm;
        for (w, b) in gradients.iter_mut() {
            w.mapv_inplace(|g| g * scale);
            b.mapv_inplace(|g| g * scale);
        }
    }
    norm
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_sgd_step() {
        let mut sgd = SGD::new();
        let mut w = array![[1.0, 2.0]];
        sgd.update_weights(0, &mut w, &array![[1.0, -1.0]], 0.5);
        assert_eq!(w, array![[0.5, 2.5]]);
    }

    #[test]
    fn test_adam_first_step_moves_by_learning_rate() {
        let mut adam = Adam::default();
        let mut w = array![[1.0, 1.0]];
        adam.update_weights(3, &mut w, &array![[2.0, -2.0]], 0.1);
        adam.finish_step();
        // bias-corrected first step has magnitude ~lr
        assert!((w[[0, 0]] - 0.9).abs() < 1e-4);
        assert!((w[[0, 1]] - 1.1).abs() < 1e-4);
        assert_eq!(adam.t, 2);
    }

    #[test]
    fn test_clip_by_global_norm() {
        let mut grads = vec![(array![[3.0]], array![4.0])];
        let norm = clip_by_global_norm(&mut grads, 1.0);
        assert!((norm - 5.0).abs() < 1e-6);
        assert!((grads[0].0[[0, 0]] - 0.6).abs() < 1e-6);
        assert!((grads[0].1[0] - 0.8).abs() < 1e-6);
    }
}
