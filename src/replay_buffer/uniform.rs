use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::seq::index;

use super::{check_sample_size, ReplayBuffer, Transition, TransitionBatch};
use crate::error::Result;

/// Fixed-capacity ring buffer sampled uniformly without replacement.
#[derive(Clone, Debug)]
pub struct UniformReplayBuffer {
    buffer: VecDeque<Transition>,
    capacity: usize,
}

impl UniformReplayBuffer {
    pub fn new(capacity: usize) -> Self {
        UniformReplayBuffer {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transition> {
        self.buffer.iter()
    }
}

impl ReplayBuffer for UniformReplayBuffer {
    fn push(&mut self, transition: Transition) {
        if self.capacity == 0 {
            return;
        }
        if self.buffer.len() == self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(transition);
    }

    fn sample(&mut self, batch_size: usize, rng: &mut StdRng) -> Result<TransitionBatch> {
        check_sample_size(batch_size, self.buffer.len())?;
        let indices = index::sample(rng, self.buffer.len(), batch_size).into_vec();
        let transitions: Vec<&Transition> = indices.iter().map(|&i| &self.buffer[i]).collect();
        TransitionBatch::from_transitions(&transitions, indices)
    }

    fn clear(&mut self) {
        self.buffer.clear();
    }

    fn len(&self) -> usize {
        self.buffer.len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}
