//! # Experience Replay
//!
//! Transitions recorded by the agent loop are stored in a [`ReplayBuffer`] and
//! sampled into stacked [`TransitionBatch`]es for training.
//!
//! - [`UniformReplayBuffer`]: fixed-capacity ring buffer, uniform sampling
//!   without replacement
//! - [`PrioritizedReplayBuffer`]: proportional prioritization with importance
//!   sampling weights; priorities are refreshed from the per-sample loss

mod prioritized;
mod uniform;

pub use prioritized::PrioritizedReplayBuffer;
pub use uniform::UniformReplayBuffer;

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;

use crate::error::{C51Error, Result};

/// One recorded interaction `(state, action, reward, next_state, done)`.
#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    pub state: Array1<f32>,
    pub action: usize,
    pub reward: f32,
    pub next_state: Array1<f32>,
    pub done: bool,
}

/// A sampled batch with every field stacked along the first axis.
#[derive(Clone, Debug, PartialEq)]
pub struct TransitionBatch {
    pub states: Array2<f32>,
    pub actions: Vec<usize>,
    pub rewards: Array1<f32>,
    pub next_states: Array2<f32>,
    /// `1.0` where the transition ended the episode
    pub terminals: Array1<f32>,
    /// Positions of the sampled transitions inside the buffer
    pub indices: Vec<usize>,
    /// Importance sampling weights, present for prioritized samples
    pub weights: Option<Array1<f32>>,
}

impl TransitionBatch {
    /// Stack transitions into a batch. All states must share one length.
    pub fn from_transitions(transitions: &[&Transition], indices: Vec<usize>) -> Result<Self> {
        let first = transitions
            .first()
            .ok_or_else(|| C51Error::EmptyBuffer("cannot build a batch from zero transitions".to_string()))?;
        let state_size = first.state.len();
        let batch_size = transitions.len();

        let mut states = Array2::zeros((batch_size, state_size));
        let mut next_states = Array2::zeros((batch_size, state_size));
        let mut actions = Vec::with_capacity(batch_size);
        let mut rewards = Array1::zeros(batch_size);
        let mut terminals = Array1::zeros(batch_size);

        for (i, t) in transitions.iter().enumerate() {
            if t.state.len() != state_size || t.next_state.len() != state_size {
                return Err(C51Error::shape_mismatch(
                    format!("states of length {}", state_size),
                    format!("{} and {}", t.state.len(), t.next_state.len()),
                ));
            }
            states.row_mut(i).assign(&t.state);
            next_states.row_mut(i).assign(&t.next_state);
            actions.push(t.action);
            rewards[i] = t.reward;
            terminals[i] = if t.done { 1.0 } else { 0.0 };
        }

        Ok(TransitionBatch {
            states,
            actions,
            rewards,
            next_states,
            terminals,
            indices,
            weights: None,
        })
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Storage and sampling strategy for transitions.
pub trait ReplayBuffer {
    /// Store a transition, evicting the oldest one when full.
    fn push(&mut self, transition: Transition);

    /// Draw `batch_size` transitions.
    fn sample(&mut self, batch_size: usize, rng: &mut StdRng) -> Result<TransitionBatch>;

    /// Feed back new priorities for previously sampled positions.
    fn update_priorities(&mut self, _indices: &[usize], _priorities: &[f32]) {}

    fn clear(&mut self);

    fn len(&self) -> usize;

    fn capacity(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_full(&self) -> bool {
        self.len() >= self.capacity()
    }
}

pub(crate) fn check_sample_size(batch_size: usize, len: usize) -> Result<()> {
    if batch_size == 0 {
        return Err(C51Error::configuration("batch_size", "must be greater than 0"));
    }
    if batch_size > len {
        return Err(C51Error::EmptyBuffer(format!(
            "requested {} transitions but only {} are stored",
            batch_size, len
        )));
    }
    Ok(())
}
