//! Epsilon-greedy exploration on an episode schedule.
//!
//! Epsilon starts at 1.0 in the first episode and decays linearly, reaching
//! zero at episode `stop_explore`; from then on the behaviour policy is purely
//! greedy. `min_epsilon` keeps a floor under epsilon while exploration is
//! still active.

use ndarray::ArrayView1;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::distribution::select_action;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpsilonGreedy {
    pub stop_explore: usize,
    pub min_epsilon: f32,
}

impl EpsilonGreedy {
    pub fn new(stop_explore: usize, min_epsilon: f32) -> Self {
        EpsilonGreedy {
            stop_explore,
            min_epsilon: min_epsilon.clamp(0.0, 1.0),
        }
    }

    /// Exploration rate used during `episode` (0-based).
    pub fn epsilon(&self, episode: usize) -> f32 {
        if episode >= self.stop_explore {
            return 0.0;
        }
        let decayed = 1.0 - episode as f32 / self.stop_explore as f32;
        decayed.max(self.min_epsilon)
    }

    /// Random action with probability `epsilon(episode)`, otherwise the greedy one.
    pub fn select<R: Rng + ?Sized>(&self, q_row: ArrayView1<f32>, episode: usize, rng: &mut R) -> Result<usize> {
        let greedy = select_action(q_row)?;
        if rng.gen::<f32>() < self.epsilon(episode) {
            Ok(rng.gen_range(0..q_row.len()))
        } else {
            Ok(greedy)
        }
    }
}
