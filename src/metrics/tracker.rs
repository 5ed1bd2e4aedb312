use serde::{Deserialize, Serialize};

/// Training history collected by the agent loop
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    /// Summed reward per episode
    pub episode_rewards: Vec<f32>,

    /// Steps taken per episode
    pub episode_lengths: Vec<usize>,

    /// Exploration rate used per episode
    pub epsilons: Vec<f32>,

    /// Loss of every training step
    pub losses: Vec<f32>,

    /// Number of target network synchronizations
    pub target_syncs: usize,

    /// Environment steps across all episodes
    pub total_steps: usize,
}

impl TrainingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn episodes(&self) -> usize {
        self.episode_rewards.len()
    }

    pub fn train_steps(&self) -> usize {
        self.losses.len()
    }

    /// Mean reward over the last `window` episodes
    pub fn mean_reward(&self, window: usize) -> Option<f32> {
        mean_tail(&self.episode_rewards, window)
    }

    /// Mean loss over the last `window` training steps
    pub fn mean_loss(&self, window: usize) -> Option<f32> {
        mean_tail(&self.losses, window)
    }

    pub fn best_episode_reward(&self) -> Option<f32> {
        self.episode_rewards.iter().copied().reduce(f32::max)
    }
}

fn mean_tail(values: &[f32], window: usize) -> Option<f32> {
    let n = window.min(values.len());
    if n == 0 {
        return None;
    }
    let sum: f32 = values.iter().rev().take(n).sum();
    Some(sum / n as f32)
}

/// Tracks metrics during training
#[derive(Debug, Clone, Default)]
pub struct MetricsTracker {
    metrics: TrainingMetrics,
    current_episode_reward: f32,
    current_episode_length: usize,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new episode played with exploration rate `epsilon`
    pub fn start_episode(&mut self, epsilon: f32) {
        self.current_episode_reward = 0.0;
        self.current_episode_length = 0;
        self.metrics.epsilons.push(epsilon);
    }

    /// Record a step within an episode
    pub fn step(&mut self, reward: f32) {
        self.current_episode_reward += reward;
        self.current_episode_length += 1;
        self.metrics.total_steps += 1;
    }

    /// End the current episode
    pub fn end_episode(&mut self) {
        self.metrics.episode_rewards.push(self.current_episode_reward);
        self.metrics.episode_lengths.push(self.current_episode_length);
    }

    pub fn record_loss(&mut self, loss: f32) {
        self.metrics.losses.push(loss);
    }

    pub fn record_target_sync(&mut self) {
        self.metrics.target_syncs += 1;
    }

    pub fn current_episode_reward(&self) -> f32 {
        self.current_episode_reward
    }

    pub fn current_episode_length(&self) -> usize {
        self.current_episode_length
    }

    pub fn metrics(&self) -> &TrainingMetrics {
        &self.metrics
    }

    pub fn into_metrics(self) -> TrainingMetrics {
        self.metrics
    }
}
