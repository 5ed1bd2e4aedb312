use std::collections::VecDeque;

use ndarray::Array1;
use rand::distributions::WeightedIndex;
use rand::rngs::StdRng;
use rand::Rng;

use super::{check_sample_size, ReplayBuffer, Transition, TransitionBatch};
use crate::error::{C51Error, Result};

/// Proportional prioritized replay.
///
/// Transition `i` is drawn with probability `(p_i + eps)^alpha / sum_k (p_k + eps)^alpha`
/// (with replacement) and carries the importance weight `(N * P(i))^-beta`,
/// normalized by the largest weight in the batch. New transitions enter with
/// the highest priority seen so far.
#[derive(Clone, Debug)]
pub struct PrioritizedReplayBuffer {
    buffer: VecDeque<Transition>,
    priorities: VecDeque<f32>,
    capacity: usize,
    alpha: f32,
    beta: f32,
    epsilon: f32,
    max_priority: f32,
}

impl PrioritizedReplayBuffer {
    pub fn new(capacity: usize, alpha: f32, beta: f32) -> Self {
        PrioritizedReplayBuffer {
            buffer: VecDeque::with_capacity(capacity),
            priorities: VecDeque::with_capacity(capacity),
            capacity,
            alpha,
            beta,
            epsilon: 0.01,
            max_priority: 1.0,
        }
    }

    /// Store a transition with an explicit priority.
    pub fn push_with_priority(&mut self, transition: Transition, priority: f32) {
        if self.capacity == 0 {
            return;
        }
        if self.buffer.len() >= self.capacity {
            self.buffer.pop_front();
            self.priorities.pop_front();
        }
        let priority = priority.max(0.0);
        self.buffer.push_back(transition);
        self.priorities.push_back(priority);
        if priority > self.max_priority {
            self.max_priority = priority;
        }
    }

    pub fn priorities(&self) -> impl Iterator<Item = &f32> {
        self.priorities.iter()
    }

    pub fn max_priority(&self) -> f32 {
        self.max_priority
    }
}

impl ReplayBuffer for PrioritizedReplayBuffer {
    fn push(&mut self, transition: Transition) {
        let priority = self.max_priority;
        self.push_with_priority(transition, priority);
    }

    fn sample(&mut self, batch_size: usize, rng: &mut StdRng) -> Result<TransitionBatch> {
        check_sample_size(batch_size, self.buffer.len())?;

        let scaled: Vec<f32> = self
            .priorities
            .iter()
            .map(|&p| (p + self.epsilon).powf(self.alpha))
            .collect();
        let total: f32 = scaled.iter().sum();
        let dist = WeightedIndex::new(&scaled)
            .map_err(|e| C51Error::numeric(format!("invalid replay priorities: {}", e)))?;

        let n = self.buffer.len() as f32;
        let mut indices = Vec::with_capacity(batch_size);
        let mut weights = Vec::with_capacity(batch_size);
        for _ in 0..batch_size {
            let i = rng.sample(&dist);
            let probability = scaled[i] / total;
            indices.push(i);
            weights.push((n * probability).powf(-self.beta));
        }

        let max_weight = weights.iter().fold(0.0_f32, |max, &w| max.max(w));
        if max_weight > 0.0 {
            for w in weights.iter_mut() {
                *w /= max_weight;
            }
        }

        let transitions: Vec<&Transition> = indices.iter().map(|&i| &self.buffer[i]).collect();
        let mut batch = TransitionBatch::from_transitions(&transitions, indices)?;
        batch.weights = Some(Array1::from(weights));
        Ok(batch)
    }

    fn update_priorities(&mut self, indices: &[usize], priorities: &[f32]) {
        for (&idx, &priority) in indices.iter().zip(priorities.iter()) {
            if idx < self.priorities.len() && priority.is_finite() {
                let priority = priority.max(0.0);
                self.priorities[idx] = priority;
                if priority > self.max_priority {
                    self.max_priority = priority;
                }
            }
        }
    }

    fn clear(&mut self) {
        self.buffer.clear();
        self.priorities.clear();
        self.max_priority = 1.0;
    }

    fn len(&self) -> usize {
        self.buffer.len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}
