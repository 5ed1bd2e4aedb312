//! Environment interface and built-in environments.
//!
//! The agent drives any [`Environment`] whose observations are flat `f32`
//! vectors and whose actions are indices in `0..num_actions()`.

use ndarray::Array1;

use crate::error::Result;

/// Core trait for RL environments
pub trait Environment {
    /// Reset the environment and return the initial observation
    fn reset(&mut self) -> Result<Array1<f32>>;

    /// Apply an action and advance one step
    fn step(&mut self, action: usize) -> Result<StepResult>;

    /// Present the current state. Environments without a display ignore this.
    fn render(&self, _mode: RenderMode) -> Result<()> {
        Ok(())
    }

    /// Length of the observation vector
    fn observation_size(&self) -> usize;

    /// Number of discrete actions
    fn num_actions(&self) -> usize;
}

/// Result of an environment step
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    pub next_state: Array1<f32>,
    pub reward: f32,
    /// Whether the episode ended (termination or truncation)
    pub done: bool,
    pub info: StepInfo,
}

/// Additional step information
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepInfo {
    /// The episode was cut by a time limit rather than reaching a terminal state
    pub truncated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Human-readable output through the log
    Human,
    /// No output
    None,
}

pub mod cartpole;

pub use cartpole::CartPole;
