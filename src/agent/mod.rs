//! # Agent
//!
//! [`CategoricalDqnAgent`] ties the pieces together:
//!
//! 1. act epsilon-greedily on the mean of each action's return distribution
//! 2. store every transition in the replay buffer
//! 3. periodically sample a batch, let the target network predict next-state
//!    distributions, project the distributional Bellman target onto the
//!    support and take one cross-entropy step on the actor
//! 4. copy the actor into the target network every
//!    `weights_update_frequency` environment steps
//!
//! Two replay cadences are available through [`ReplayMode`](crate::config::ReplayMode):
//! `drain` trains once whenever the buffer fills and then empties it, while
//! `sliding_window` keeps a ring buffer and trains every `train_frequency`
//! steps once a full batch is available.

mod c51;

pub use c51::CategoricalDqnAgent;
