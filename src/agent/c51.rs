use std::mem;

use log::{debug, info, warn};
use ndarray::{Array1, ArrayView1, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::{AgentConfig, ReplayMode, TargetRow};
use crate::distribution::{check_distribution_batch, q_values, select_action, Projector, Support};
use crate::env::{Environment, RenderMode};
use crate::error::{C51Error, Result};
use crate::exploration::EpsilonGreedy;
use crate::metrics::{MetricsTracker, TrainingMetrics};
use crate::network::{CategoricalNetwork, DistributionalModel, FitOutput};
use crate::replay_buffer::{PrioritizedReplayBuffer, ReplayBuffer, Transition, TransitionBatch, UniformReplayBuffer};

/// Categorical distributional DQN agent.
///
/// Owns its environment, an actor network trained every step, a target
/// network providing next-state distributions, and the replay buffer.
///
/// # Example
///
/// ```rust,no_run
/// use c51::agent::CategoricalDqnAgent;
/// use c51::config::AgentConfig;
/// use c51::env::CartPole;
///
/// let config = AgentConfig {
///     input_dim: vec![4],
///     episodes: 50,
///     seed: Some(42),
///     ..AgentConfig::default()
/// };
/// let mut agent = CategoricalDqnAgent::from_config(config, CartPole::new(200)).unwrap();
/// let metrics = agent.run().unwrap();
/// println!("mean reward (last 10): {:?}", metrics.mean_reward(10));
/// ```
pub struct CategoricalDqnAgent<E: Environment, M: DistributionalModel = CategoricalNetwork> {
    config: AgentConfig,
    env: E,
    actor: M,
    target: M,
    replay: Box<dyn ReplayBuffer>,
    projector: Projector,
    explorer: EpsilonGreedy,
    rng: StdRng,
    tracker: MetricsTracker,
    total_steps: usize,
    best_loss: Option<f32>,
}

impl<E: Environment> CategoricalDqnAgent<E, CategoricalNetwork> {
    /// Build the agent with the default network and the replay buffer the
    /// configuration asks for. The target network starts as a copy of the actor.
    pub fn from_config(config: AgentConfig, env: E) -> Result<Self> {
        config.validate()?;
        let mut rng = seeded_rng(config.seed);

        let actor = CategoricalNetwork::from_config(&config, &mut rng)?;
        let target = actor.clone();

        let replay: Box<dyn ReplayBuffer> = match config.prioritized_replay {
            Some(per) => Box::new(PrioritizedReplayBuffer::new(config.replay_buffer_size, per.alpha, per.beta)),
            None => Box::new(UniformReplayBuffer::new(config.replay_buffer_size)),
        };

        Self::assemble(config, env, actor, target, replay, rng)
    }
}

impl<E: Environment, M: DistributionalModel> CategoricalDqnAgent<E, M> {
    /// Build the agent from explicit collaborators.
    ///
    /// Fails with a configuration or shape error when the environment or either
    /// network disagrees with `config`.
    pub fn new(config: AgentConfig, env: E, actor: M, target: M, replay: Box<dyn ReplayBuffer>) -> Result<Self> {
        let rng = seeded_rng(config.seed);
        Self::assemble(config, env, actor, target, replay, rng)
    }

    fn assemble(
        config: AgentConfig,
        env: E,
        actor: M,
        target: M,
        replay: Box<dyn ReplayBuffer>,
        rng: StdRng,
    ) -> Result<Self> {
        config.validate()?;

        if env.observation_size() != config.input_size() {
            return Err(C51Error::shape_mismatch(
                format!("observations of length {} (input_dim {:?})", config.input_size(), config.input_dim),
                format!("environment observation length {}", env.observation_size()),
            ));
        }
        if env.num_actions() != config.action_dim {
            return Err(C51Error::shape_mismatch(
                format!("{} actions", config.action_dim),
                format!("environment with {} actions", env.num_actions()),
            ));
        }
        check_model(&actor, &config, "actor")?;
        check_model(&target, &config, "target")?;

        if replay.capacity() < config.batch_size {
            return Err(C51Error::configuration(
                "replay_buffer_size",
                format!("buffer capacity {} cannot hold a batch of {}", replay.capacity(), config.batch_size),
            ));
        }
        if config.replay_mode == ReplayMode::Drain && replay.capacity() < config.replay_buffer_size {
            return Err(C51Error::configuration(
                "replay_buffer_size",
                format!(
                    "drain mode needs a buffer of at least {} transitions, got {}",
                    config.replay_buffer_size,
                    replay.capacity()
                ),
            ));
        }

        let support = Support::new(config.v_min, config.v_max, config.n_atoms)?;
        let projector = Projector::new(support, config.discount_rate)?;
        let explorer = EpsilonGreedy::new(config.stop_explore, config.min_epsilon);

        Ok(CategoricalDqnAgent {
            config,
            env,
            actor,
            target,
            replay,
            projector,
            explorer,
            rng,
            tracker: MetricsTracker::new(),
            total_steps: 0,
            best_loss: None,
        })
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn support(&self) -> &Support {
        self.projector.support()
    }

    pub fn env(&self) -> &E {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut E {
        &mut self.env
    }

    pub fn actor(&self) -> &M {
        &self.actor
    }

    pub fn target(&self) -> &M {
        &self.target
    }

    pub fn replay(&self) -> &dyn ReplayBuffer {
        self.replay.as_ref()
    }

    pub fn replay_mut(&mut self) -> &mut dyn ReplayBuffer {
        self.replay.as_mut()
    }

    /// Environment steps taken by [`run`](Self::run) so far.
    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    /// Lowest training loss observed so far.
    pub fn best_loss(&self) -> Option<f32> {
        self.best_loss
    }

    pub fn metrics(&self) -> &TrainingMetrics {
        self.tracker.metrics()
    }

    /// Expected return of every action in `state` under the actor network.
    pub fn q_values(&self, state: ArrayView1<f32>) -> Result<Array1<f32>> {
        self.check_state(state.len())?;
        let dists = self.actor.predict(state.insert_axis(Axis(0)))?;
        let q = q_values(dists.view(), self.projector.support())?;
        Ok(q.index_axis_move(Axis(0), 0))
    }

    /// Epsilon-greedy action for `state` during `episode`.
    pub fn act(&mut self, state: ArrayView1<f32>, episode: usize) -> Result<usize> {
        let q = self.q_values(state)?;
        self.explorer.select(q.view(), episode, &mut self.rng)
    }

    /// Greedy action for `state`.
    pub fn act_greedy(&self, state: ArrayView1<f32>) -> Result<usize> {
        let q = self.q_values(state)?;
        select_action(q.view())
    }

    /// Sample a batch from the replay buffer and take one training step.
    /// Returns the batch loss.
    pub fn train_step(&mut self) -> Result<f32> {
        let batch = self.replay.sample(self.config.batch_size, &mut self.rng)?;
        let fit = self.learn(&batch)?;
        self.replay.update_priorities(&batch.indices, &fit.sample_losses);
        Ok(fit.loss)
    }

    /// Take one training step on a caller-provided batch.
    pub fn train_on_batch(&mut self, batch: &TransitionBatch) -> Result<f32> {
        self.learn(batch).map(|fit| fit.loss)
    }

    fn learn(&mut self, batch: &TransitionBatch) -> Result<FitOutput> {
        let result = self.fit_projected(batch);
        match &result {
            Ok(fit) => {
                debug!("train step: loss {:.5} on {} transitions", fit.loss, batch.len());
                self.tracker.record_loss(fit.loss);
                self.checkpoint_if_best(fit.loss)?;
            }
            Err(C51Error::NumericAnomaly(msg)) => warn!("training step aborted: {}", msg),
            Err(_) => {}
        }
        result
    }

    fn fit_projected(&mut self, batch: &TransitionBatch) -> Result<FitOutput> {
        if batch.is_empty() {
            return Err(C51Error::EmptyBuffer("cannot train on an empty batch".to_string()));
        }
        if let Some(&action) = batch.actions.iter().find(|&&a| a >= self.config.action_dim) {
            return Err(C51Error::InvalidAction {
                action,
                num_actions: self.config.action_dim,
            });
        }
        let expected = (batch.len(), self.config.action_dim, self.config.n_atoms);

        let next_dists = self.target.predict(batch.next_states.view())?;
        check_distribution_batch(next_dists.view(), expected)?;

        let projection = self
            .projector
            .project(next_dists.view(), batch.rewards.view(), batch.terminals.view())?;
        let targets = match self.config.target_row {
            TargetRow::NextAction => projection.target_histogram(),
            TargetRow::TakenAction => projection.histogram_at(&batch.actions)?,
        };
        check_distribution_batch(targets.view(), expected)?;

        let weights = batch.weights.as_ref().map(|w| w.view());
        self.actor.fit(batch.states.view(), targets.view(), weights)
    }

    fn checkpoint_if_best(&mut self, loss: f32) -> Result<()> {
        if self.best_loss.map_or(false, |best| loss >= best) {
            return Ok(());
        }
        if let Some(path) = &self.config.checkpoint_path {
            self.actor.save_checkpoint(path)?;
            info!("loss improved to {:.5}, saved actor to {}", loss, path.display());
        }
        self.best_loss = Some(loss);
        Ok(())
    }

    /// Overwrite the target network with the actor's weights.
    pub fn sync_target_network(&mut self) -> Result<()> {
        self.target.set_weights(&self.actor.get_weights())?;
        self.tracker.record_target_sync();
        debug!("target network synchronized at step {}", self.total_steps);
        Ok(())
    }

    /// Run the configured number of training episodes.
    pub fn run(&mut self) -> Result<TrainingMetrics> {
        info!(
            "training for {} episodes of at most {} steps ({:?} replay, {} atoms over [{}, {}])",
            self.config.episodes,
            self.config.steps,
            self.config.replay_mode,
            self.config.n_atoms,
            self.config.v_min,
            self.config.v_max
        );

        for episode in 0..self.config.episodes {
            self.run_episode(episode)?;
            let metrics = self.tracker.metrics();
            info!(
                "episode {}/{}: reward {:.2}, steps {}, epsilon {:.3}, recent loss {}",
                episode + 1,
                self.config.episodes,
                self.tracker.current_episode_reward(),
                self.tracker.current_episode_length(),
                self.explorer.epsilon(episode),
                metrics
                    .mean_loss(100)
                    .map_or_else(|| "n/a".to_string(), |l| format!("{:.5}", l))
            );
        }

        Ok(self.tracker.metrics().clone())
    }

    fn run_episode(&mut self, episode: usize) -> Result<()> {
        self.tracker.start_episode(self.explorer.epsilon(episode));
        let mut state = self.env.reset()?;
        self.check_state(state.len())?;

        for _ in 0..self.config.steps {
            let action = self.act(state.view(), episode)?;
            let step = self.env.step(action)?;
            self.check_state(step.next_state.len())?;

            let done = step.done;
            self.tracker.step(step.reward);
            let previous = mem::replace(&mut state, step.next_state);
            self.replay.push(Transition {
                state: previous,
                action,
                reward: step.reward,
                next_state: state.clone(),
                done,
            });
            self.total_steps += 1;

            self.maybe_train()?;
            if self.total_steps % self.config.weights_update_frequency == 0 {
                self.sync_target_network()?;
            }
            if done {
                break;
            }
        }

        self.tracker.end_episode();
        Ok(())
    }

    fn maybe_train(&mut self) -> Result<()> {
        match self.config.replay_mode {
            ReplayMode::Drain => {
                if self.replay.len() >= self.config.replay_buffer_size {
                    self.train_step()?;
                    self.replay.clear();
                }
            }
            ReplayMode::SlidingWindow => {
                if self.replay.len() >= self.config.batch_size
                    && self.total_steps % self.config.train_frequency == 0
                {
                    self.train_step()?;
                }
            }
        }
        Ok(())
    }

    /// Play `episodes` greedy episodes of at most `steps` steps without
    /// learning. Returns the total reward of each episode.
    pub fn evaluate(&mut self, episodes: usize, steps: usize, render: bool) -> Result<Vec<f32>> {
        let mode = if render { RenderMode::Human } else { RenderMode::None };
        let mut rewards = Vec::with_capacity(episodes);

        for _ in 0..episodes {
            let mut state = self.env.reset()?;
            self.env.render(mode)?;
            let mut total = 0.0;
            for _ in 0..steps {
                let action = self.act_greedy(state.view())?;
                let step = self.env.step(action)?;
                self.env.render(mode)?;
                total += step.reward;
                state = step.next_state;
                if step.done {
                    break;
                }
            }
            rewards.push(total);
        }

        if !rewards.is_empty() {
            let mean = rewards.iter().sum::<f32>() / rewards.len() as f32;
            info!("evaluation over {} episodes: mean reward {:.2}", rewards.len(), mean);
        }
        Ok(rewards)
    }

    /// Evaluate with the configured `eval_episodes` and `eval_steps`.
    pub fn evaluate_default(&mut self, render: bool) -> Result<Vec<f32>> {
        self.evaluate(self.config.eval_episodes, self.config.eval_steps, render)
    }

    fn check_state(&self, len: usize) -> Result<()> {
        if len != self.config.input_size() {
            return Err(C51Error::shape_mismatch(
                format!("state of length {}", self.config.input_size()),
                format!("state of length {}", len),
            ));
        }
        Ok(())
    }
}

fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn check_model<M: DistributionalModel>(model: &M, config: &AgentConfig, role: &str) -> Result<()> {
    let expected = (config.input_size(), config.action_dim, config.n_atoms);
    let actual = (model.input_size(), model.num_actions(), model.n_atoms());
    if expected != actual {
        return Err(C51Error::shape_mismatch(
            format!("{} network with (input, actions, atoms) = {:?}", role, expected),
            format!("{:?}", actual),
        ));
    }
    Ok(())
}
