//! # c51 - Categorical Distributional Deep Q-Learning
//!
//! A reinforcement learning agent that learns, for every discrete action, a
//! full distribution over returns instead of a single expected value. Returns
//! are represented on a fixed grid of atoms; the distributional Bellman target
//! `r + γ z` is projected back onto that grid and the network is trained with
//! cross-entropy against the projected histogram.
//!
//! ## Key Features
//!
//! - **Distributional core**: support construction, Q-values as distribution
//!   means, mass-conserving categorical projection
//! - **Networks**: ndarray MLP with a per-action softmax head, SGD and Adam
//! - **Replay**: uniform ring buffer and proportional prioritized replay
//! - **Agent loop**: epsilon-greedy exploration, periodic target network
//!   synchronization, drain or sliding-window replay, greedy evaluation
//! - **Configuration**: JSON files using the familiar `Categorical_Vmin` /
//!   `Categorical_Vmax` / `Categorical_n_atoms` option names
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use c51::agent::CategoricalDqnAgent;
//! use c51::config::AgentConfig;
//! use c51::env::CartPole;
//!
//! let config = AgentConfig::from_json_file("configs/cartpole.json").unwrap();
//! let mut agent = CategoricalDqnAgent::from_config(config, CartPole::new(500)).unwrap();
//!
//! let metrics = agent.run().unwrap();
//! println!("episodes: {}, mean reward: {:?}", metrics.episodes(), metrics.mean_reward(20));
//!
//! let scores = agent.evaluate_default(false).unwrap();
//! ```
//!
//! ## Module Organization
//!
//! - [`distribution`] - Support, Q-values, action selection, target projection
//! - [`agent`] - The C51 agent loop and training step
//! - [`network`] - Distributional model trait and the default MLP
//! - [`replay_buffer`] - Uniform and prioritized experience replay
//! - [`exploration`] - Episode-scheduled epsilon-greedy
//! - [`env`] - Environment trait and CartPole
//! - [`config`] - Agent configuration
//! - [`activations`], [`loss`], [`optimizer`] - Network building blocks
//! - [`metrics`] - Training history
//! - [`error`] - Error types and result handling
//!
//! Logging goes through the `log` facade; install any logger (for example
//! `env_logger`) in the binary to see training progress.

pub mod activations;
pub mod agent;
pub mod config;
pub mod distribution;
pub mod env;
pub mod error;
pub mod exploration;
pub mod loss;
pub mod metrics;
pub mod network;
pub mod optimizer;
pub mod replay_buffer;

#[cfg(test)]
mod tests;
