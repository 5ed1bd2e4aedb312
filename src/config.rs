//! # Agent Configuration
//!
//! [`AgentConfig`] is an immutable value built once and handed to every
//! component at construction. Its serialized field names follow the option
//! names used by existing C51 configuration files (`Categorical_Vmin`,
//! `Categorical_n_atoms`, `batch_size`, ...), so such files load unchanged.
//! Every option introduced on top of those carries a default and may be
//! omitted.
//!
//! ```rust,no_run
//! use c51::config::AgentConfig;
//!
//! let config = AgentConfig::from_json_file("configs/cartpole.json").unwrap();
//! assert!(config.n_atoms >= 2);
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::activations::Activation;
use crate::distribution::make_support;
use crate::error::{C51Error, Result};

/// How the agent consumes its replay buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReplayMode {
    /// Train once when the buffer is full, then clear it.
    Drain,
    /// Fixed-capacity ring buffer; train every `train_frequency` steps once
    /// `batch_size` transitions are stored.
    #[default]
    SlidingWindow,
}

/// Which action row of the target histogram receives the projected distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TargetRow {
    /// Row of the greedy next action chosen during projection.
    #[default]
    NextAction,
    /// Row of the action stored in the transition.
    TakenAction,
}

/// Optimizer selection for the default network.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum OptimizerConfig {
    Sgd,
    Adam { beta1: f32, beta2: f32, epsilon: f32 },
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        OptimizerConfig::Adam {
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
        }
    }
}

/// Proportional prioritization parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrioritizedReplayConfig {
    pub alpha: f32,
    pub beta: f32,
}

impl Default for PrioritizedReplayConfig {
    fn default() -> Self {
        PrioritizedReplayConfig { alpha: 0.6, beta: 0.4 }
    }
}

/// Complete agent configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(rename = "Categorical_Vmin")]
    pub v_min: f32,

    #[serde(rename = "Categorical_Vmax")]
    pub v_max: f32,

    #[serde(rename = "Categorical_n_atoms")]
    pub n_atoms: usize,

    pub batch_size: usize,
    pub discount_rate: f32,
    pub replay_buffer_size: usize,

    /// Target network is overwritten by the actor every this many steps
    pub weights_update_frequency: usize,

    pub episodes: usize,

    /// Step cap per episode
    pub steps: usize,

    /// Episode after which exploration stops
    pub stop_explore: usize,

    pub action_dim: usize,

    /// Observation shape; flattened before it reaches the network
    pub input_dim: Vec<usize>,

    #[serde(default = "default_learning_rate")]
    pub learning_rate: f32,

    #[serde(default = "default_hidden_layers")]
    pub hidden_layers: Vec<usize>,

    #[serde(default)]
    pub hidden_activation: Activation,

    #[serde(default)]
    pub optimizer: OptimizerConfig,

    #[serde(default)]
    pub max_grad_norm: Option<f32>,

    #[serde(default)]
    pub replay_mode: ReplayMode,

    #[serde(default = "default_train_frequency")]
    pub train_frequency: usize,

    /// Uses a prioritized buffer instead of the uniform one when set
    #[serde(default)]
    pub prioritized_replay: Option<PrioritizedReplayConfig>,

    #[serde(default)]
    pub target_row: TargetRow,

    #[serde(default)]
    pub min_epsilon: f32,

    #[serde(default = "default_eval_episodes")]
    pub eval_episodes: usize,

    #[serde(default = "default_eval_steps")]
    pub eval_steps: usize,

    /// Actor network is saved here whenever the training loss improves
    #[serde(default)]
    pub checkpoint_path: Option<PathBuf>,

    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_learning_rate() -> f32 {
    1e-3
}

fn default_hidden_layers() -> Vec<usize> {
    vec![64, 64]
}

fn default_train_frequency() -> usize {
    1
}

fn default_eval_episodes() -> usize {
    100
}

fn default_eval_steps() -> usize {
    200
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            v_min: -10.0,
            v_max: 10.0,
            n_atoms: 51,
            batch_size: 32,
            discount_rate: 0.99,
            replay_buffer_size: 1000,
            weights_update_frequency: 100,
            episodes: 500,
            steps: 200,
            stop_explore: 200,
            action_dim: 2,
            input_dim: vec![1, 4],
            learning_rate: default_learning_rate(),
            hidden_layers: default_hidden_layers(),
            hidden_activation: Activation::default(),
            optimizer: OptimizerConfig::default(),
            max_grad_norm: None,
            replay_mode: ReplayMode::default(),
            train_frequency: default_train_frequency(),
            prioritized_replay: None,
            target_row: TargetRow::default(),
            min_epsilon: 0.0,
            eval_episodes: default_eval_episodes(),
            eval_steps: default_eval_steps(),
            checkpoint_path: None,
            seed: None,
        }
    }
}

impl AgentConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: AgentConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Write the configuration as pretty-printed JSON.
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let serialized = serde_json::to_string_pretty(self)?;
        fs::write(path, serialized)?;
        Ok(())
    }

    /// Flattened observation length expected by the network.
    pub fn input_size(&self) -> usize {
        self.input_dim.iter().product()
    }

    /// Spacing between neighbouring atoms.
    pub fn delta_z(&self) -> f32 {
        (self.v_max - self.v_min) / (self.n_atoms as f32 - 1.0)
    }

    /// Check every invariant the components rely on.
    pub fn validate(&self) -> Result<()> {
        if !self.v_min.is_finite() || !self.v_max.is_finite() {
            return Err(C51Error::configuration(
                "Categorical_Vmin/Categorical_Vmax",
                "support bounds must be finite",
            ));
        }
        if self.v_max <= self.v_min {
            return Err(C51Error::configuration(
                "Categorical_Vmax",
                format!("must be greater than Categorical_Vmin ({} <= {})", self.v_max, self.v_min),
            ));
        }
        if self.n_atoms < 2 {
            return Err(C51Error::configuration(
                "Categorical_n_atoms",
                format!("at least 2 atoms are required, got {}", self.n_atoms),
            ));
        }
        // Same grid the agent will build; rejects overflowing or unresolvable spacing.
        make_support(self.v_min, self.v_max, self.n_atoms)?;
        if self.batch_size == 0 {
            return Err(C51Error::configuration("batch_size", "must be greater than 0"));
        }
        if self.replay_buffer_size < self.batch_size {
            return Err(C51Error::configuration(
                "replay_buffer_size",
                format!(
                    "must hold at least one batch ({} < {})",
                    self.replay_buffer_size, self.batch_size
                ),
            ));
        }
        if !(0.0..=1.0).contains(&self.discount_rate) {
            return Err(C51Error::configuration(
                "discount_rate",
                format!("must lie in [0, 1], got {}", self.discount_rate),
            ));
        }
        if self.weights_update_frequency == 0 {
            return Err(C51Error::configuration("weights_update_frequency", "must be greater than 0"));
        }
        if self.action_dim == 0 {
            return Err(C51Error::configuration("action_dim", "must be greater than 0"));
        }
        if self.input_dim.is_empty() || self.input_size() == 0 {
            return Err(C51Error::configuration("input_dim", "observation shape must be non-empty"));
        }
        if self.hidden_layers.iter().any(|&size| size == 0) {
            return Err(C51Error::configuration("hidden_layers", "layer sizes must be greater than 0"));
        }
        if let Activation::LeakyRelu { alpha } = self.hidden_activation {
            if !alpha.is_finite() {
                return Err(C51Error::configuration("hidden_activation", "leaky_relu alpha must be finite"));
            }
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(C51Error::configuration("learning_rate", "must be a positive number"));
        }
        if self.train_frequency == 0 {
            return Err(C51Error::configuration("train_frequency", "must be greater than 0"));
        }
        if !(0.0..=1.0).contains(&self.min_epsilon) {
            return Err(C51Error::configuration("min_epsilon", "must lie in [0, 1]"));
        }
        if let Some(norm) = self.max_grad_norm {
            if !(norm.is_finite() && norm > 0.0) {
                return Err(C51Error::configuration("max_grad_norm", "must be a positive number"));
            }
        }
        if let Some(per) = self.prioritized_replay {
            if !(per.alpha.is_finite() && per.alpha >= 0.0) || !(0.0..=1.0).contains(&per.beta) {
                return Err(C51Error::configuration(
                    "prioritized_replay",
                    "alpha must be non-negative and beta must lie in [0, 1]",
                ));
            }
        }
        Ok(())
    }
}
