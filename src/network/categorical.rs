use std::fs;
use std::path::Path;

use bincode::{deserialize, serialize};
use ndarray::{Array1, Array2, Array3, ArrayView1, ArrayView2, ArrayView3, Axis};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::dense::DenseLayer;
use super::{DistributionalModel, FitOutput};
use crate::activations::Activation;
use crate::config::AgentConfig;
use crate::distribution::ensure_finite;
use crate::error::{C51Error, Result};
use crate::loss::{cross_entropy_per_sample, softmax_cross_entropy_grad, weighted_mean};
use crate::optimizer::{clip_by_global_norm, Optimizer, OptimizerWrapper};

/// Weights and biases of every layer, input layer first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkWeights {
    pub layers: Vec<(Array2<f32>, Array1<f32>)>,
}

/// MLP with a categorical head: ReLU (or configured) hidden layers, a linear layer of
/// `num_actions * n_atoms` logits and a softmax over the atoms of each action.
///
/// # Example
///
/// ```
/// use c51::network::{CategoricalNetwork, DistributionalModel};
/// use c51::optimizer::{OptimizerWrapper, SGD};
/// use ndarray::Array2;
/// use rand::SeedableRng;
///
/// let mut rng = rand::rngs::StdRng::seed_from_u64(7);
/// let net = CategoricalNetwork::new(4, &[16], 2, 11, OptimizerWrapper::SGD(SGD::new()), 0.01, &mut rng)
///     .unwrap();
///
/// let dists = net.predict(Array2::zeros((3, 4)).view()).unwrap();
/// assert_eq!(dists.dim(), (3, 2, 11));
/// ```
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CategoricalNetwork {
    layers: Vec<DenseLayer>,
    optimizer: OptimizerWrapper,
    num_actions: usize,
    n_atoms: usize,
    learning_rate: f32,
    max_grad_norm: Option<f32>,
}

impl CategoricalNetwork {
    /// Network with ReLU hidden layers.
    pub fn new<R: Rng + ?Sized>(
        input_size: usize,
        hidden_layers: &[usize],
        num_actions: usize,
        n_atoms: usize,
        optimizer: OptimizerWrapper,
        learning_rate: f32,
        rng: &mut R,
    ) -> Result<Self> {
        Self::with_hidden_activation(
            input_size,
            hidden_layers,
            Activation::Relu,
            num_actions,
            n_atoms,
            optimizer,
            learning_rate,
            rng,
        )
    }

    pub fn with_hidden_activation<R: Rng + ?Sized>(
        input_size: usize,
        hidden_layers: &[usize],
        hidden_activation: Activation,
        num_actions: usize,
        n_atoms: usize,
        optimizer: OptimizerWrapper,
        learning_rate: f32,
        rng: &mut R,
    ) -> Result<Self> {
        if input_size == 0 || num_actions == 0 || n_atoms == 0 {
            return Err(C51Error::configuration(
                "network",
                "input size, action count and atom count must be greater than 0",
            ));
        }
        if hidden_layers.iter().any(|&size| size == 0) {
            return Err(C51Error::configuration("hidden_layers", "layer sizes must be greater than 0"));
        }

        let mut layer_sizes = Vec::with_capacity(hidden_layers.len() + 2);
        layer_sizes.push(input_size);
        layer_sizes.extend_from_slice(hidden_layers);
        layer_sizes.push(num_actions * n_atoms);

        let last = layer_sizes.len() - 2;
        let layers = layer_sizes
            .windows(2)
            .enumerate()
            .map(|(i, window)| {
                let activation = if i == last { Activation::Linear } else { hidden_activation };
                DenseLayer::new(window[0], window[1], activation, &mut *rng)
            })
            .collect();

        Ok(CategoricalNetwork {
            layers,
            optimizer,
            num_actions,
            n_atoms,
            learning_rate,
            max_grad_norm: None,
        })
    }

    /// Build the network described by an agent configuration.
    pub fn from_config<R: Rng + ?Sized>(config: &AgentConfig, rng: &mut R) -> Result<Self> {
        let network = Self::with_hidden_activation(
            config.input_size(),
            &config.hidden_layers,
            config.hidden_activation,
            config.action_dim,
            config.n_atoms,
            OptimizerWrapper::from_config(&config.optimizer),
            config.learning_rate,
            rng,
        )?;
        Ok(network.with_max_grad_norm(config.max_grad_norm))
    }

    pub fn with_max_grad_norm(mut self, max_grad_norm: Option<f32>) -> Self {
        self.max_grad_norm = max_grad_norm;
        self
    }

    pub fn layers(&self) -> &[DenseLayer] {
        &self.layers
    }

    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    /// Save the network (layers and optimizer state) to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let serialized = serialize(self)?;
        fs::write(path, serialized)?;
        Ok(())
    }

    /// Load a network from a file written by [`CategoricalNetwork::save`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let buffer = fs::read(path)?;
        let network: Self = deserialize(&buffer)?;
        Ok(network)
    }

    fn check_states(&self, states: &ArrayView2<f32>) -> Result<()> {
        if states.ncols() != self.input_size() {
            return Err(C51Error::shape_mismatch(
                format!("(batch, {})", self.input_size()),
                format!("{:?}", states.dim()),
            ));
        }
        ensure_finite(states.iter(), "state batch")
    }

    fn to_distributions(&self, logits: Array2<f32>) -> Result<Array3<f32>> {
        let batch_size = logits.nrows();
        let logits = logits
            .into_shape((batch_size, self.num_actions, self.n_atoms))
            .map_err(|e| C51Error::shape_mismatch(
                format!("({}, {})", batch_size, self.num_actions * self.n_atoms),
                e.to_string(),
            ))?;
        let probabilities = softmax_atoms(logits);
        ensure_finite(probabilities.iter(), "predicted distributions")?;
        Ok(probabilities)
    }

    fn forward_cached(&mut self, states: ArrayView2<f32>) -> Array2<f32> {
        let mut current = states.to_owned();
        for layer in &mut self.layers {
            current = layer.forward_batch(current.view());
        }
        current
    }

    fn backward(&self, output_errors: Array2<f32>) -> Result<Vec<(Array2<f32>, Array1<f32>)>> {
        let mut gradients = Vec::with_capacity(self.layers.len());
        let mut current_error = output_errors;

        for i in (0..self.layers.len()).rev() {
            let layer = &self.layers[i];
            let (adjusted_error, weight_gradients, bias_gradients) = layer.backward_batch(current_error.view())?;
            gradients.push((weight_gradients, bias_gradients));
            if i != 0 {
                current_error = adjusted_error.dot(&layer.weights.t());
            }
        }

        gradients.reverse();
        Ok(gradients)
    }
}

/// Numerically stable softmax over the last (atom) axis.
pub(crate) fn softmax_atoms(mut logits: Array3<f32>) -> Array3<f32> {
    for mut lane in logits.lanes_mut(Axis(2)) {
        let max = lane.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
        lane.mapv_inplace(|v| (v - max).exp());
        let sum = lane.sum();
        lane.mapv_inplace(|v| v / sum);
    }
    logits
}

impl DistributionalModel for CategoricalNetwork {
    type Weights = NetworkWeights;

    fn predict(&self, states: ArrayView2<f32>) -> Result<Array3<f32>> {
        self.check_states(&states)?;
        let mut current = states.to_owned();
        for layer in &self.layers {
            current = layer.infer(current.view());
        }
        self.to_distributions(current)
    }

    fn fit(
        &mut self,
        states: ArrayView2<f32>,
        targets: ArrayView3<f32>,
        weights: Option<ArrayView1<f32>>,
    ) -> Result<FitOutput> {
        self.check_states(&states)?;
        let batch_size = states.nrows();
        let expected = (batch_size, self.num_actions, self.n_atoms);
        if targets.dim() != expected {
            return Err(C51Error::shape_mismatch(format!("{:?}", expected), format!("{:?}", targets.dim())));
        }
        ensure_finite(targets.iter(), "target histograms")?;
        if let Some(w) = weights {
            if w.len() != batch_size {
                return Err(C51Error::shape_mismatch(
                    format!("{} sample weights", batch_size),
                    format!("{} sample weights", w.len()),
                ));
            }
            ensure_finite(w.iter(), "sample weights")?;
        }

        let logits = self.forward_cached(states);
        let predictions = self.to_distributions(logits)?;

        let sample_losses = cross_entropy_per_sample(predictions.view(), targets);
        let loss = weighted_mean(sample_losses.view(), weights);
        if !loss.is_finite() {
            return Err(C51Error::numeric(format!("cross-entropy loss is {}", loss)));
        }

        let grad = softmax_cross_entropy_grad(predictions.view(), targets, weights);
        let grad = grad
            .into_shape((batch_size, self.num_actions * self.n_atoms))
            .map_err(|e| C51Error::Training(e.to_string()))?;
        let mut gradients = self.backward(grad)?;
        if let Some(max_norm) = self.max_grad_norm {
            clip_by_global_norm(&mut gradients, max_norm);
        }

        let learning_rate = self.learning_rate;
        for (i, (layer, (weight_gradients, bias_gradients))) in self.layers.iter_mut().zip(gradients).enumerate() {
            self.optimizer.update_weights(i, &mut layer.weights, &weight_gradients, learning_rate);
            self.optimizer.update_biases(i, &mut layer.biases, &bias_gradients, learning_rate);
            layer.clear_cache();
        }
        self.optimizer.finish_step();

        Ok(FitOutput {
            loss,
            sample_losses: sample_losses.to_vec(),
        })
    }

    fn get_weights(&self) -> NetworkWeights {
        NetworkWeights {
            layers: self
                .layers
                .iter()
                .map(|layer| (layer.weights.clone(), layer.biases.clone()))
                .collect(),
        }
    }

    fn set_weights(&mut self, weights: &NetworkWeights) -> Result<()> {
        if weights.layers.len() != self.layers.len() {
            return Err(C51Error::shape_mismatch(
                format!("{} layers", self.layers.len()),
                format!("{} layers", weights.layers.len()),
            ));
        }
        for (layer, (w, b)) in self.layers.iter().zip(weights.layers.iter()) {
            if layer.weights.dim() != w.dim() || layer.biases.len() != b.len() {
                return Err(C51Error::shape_mismatch(
                    format!("{:?}", layer.weights.dim()),
                    format!("{:?}", w.dim()),
                ));
            }
        }
        for (layer, (w, b)) in self.layers.iter_mut().zip(weights.layers.iter()) {
            layer.weights.assign(w);
            layer.biases.assign(b);
        }
        Ok(())
    }

    fn input_size(&self) -> usize {
        self.layers.first().map_or(0, |layer| layer.input_size())
    }

    fn num_actions(&self) -> usize {
        self.num_actions
    }

    fn n_atoms(&self) -> usize {
        self.n_atoms
    }

    fn save_checkpoint(&self, path: &Path) -> Result<()> {
        self.save(path)
    }
}
