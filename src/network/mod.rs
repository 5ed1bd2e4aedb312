//! # Value-Distribution Networks
//!
//! The agent talks to its networks through [`DistributionalModel`]: a batch of
//! states goes in, a `(batch, num_actions, n_atoms)` batch of softmax
//! distributions comes out. Training takes target histograms of the same
//! shape and performs one optimization step against categorical
//! cross-entropy. Weights can be copied between two models of the same type,
//! which is how the target network is kept in sync with the actor.
//!
//! [`CategoricalNetwork`] is the provided implementation: a multilayer
//! perceptron whose linear head emits `num_actions * n_atoms` logits, followed
//! by a softmax over the atoms of each action.

mod categorical;
mod dense;

pub use categorical::{CategoricalNetwork, NetworkWeights};
pub use dense::DenseLayer;

use std::path::Path;

use ndarray::{Array3, ArrayView1, ArrayView2, ArrayView3};

use crate::error::Result;

/// Result of one optimization step.
#[derive(Debug, Clone, PartialEq)]
pub struct FitOutput {
    /// Weighted mean cross-entropy of the batch, measured before the update
    pub loss: f32,
    /// Unweighted cross-entropy of every batch item
    pub sample_losses: Vec<f32>,
}

/// A network producing one categorical return distribution per action.
pub trait DistributionalModel {
    /// Parameter snapshot used for target-network synchronization.
    type Weights: Clone;

    /// `(batch, input_size)` states to `(batch, num_actions, n_atoms)` distributions.
    fn predict(&self, states: ArrayView2<f32>) -> Result<Array3<f32>>;

    /// One gradient step towards `targets`. Optional per-sample `weights` scale
    /// each item's loss (importance sampling).
    fn fit(
        &mut self,
        states: ArrayView2<f32>,
        targets: ArrayView3<f32>,
        weights: Option<ArrayView1<f32>>,
    ) -> Result<FitOutput>;

    fn get_weights(&self) -> Self::Weights;

    fn set_weights(&mut self, weights: &Self::Weights) -> Result<()>;

    fn input_size(&self) -> usize;

    fn num_actions(&self) -> usize;

    fn n_atoms(&self) -> usize;

    /// Persist the model so it can be restored later.
    fn save_checkpoint(&self, path: &Path) -> Result<()>;
}
