//! Train a C51 agent on CartPole
//!
//! ```text
//! cargo run --release --example cartpole_c51 -- configs/cartpole.json
//! ```
//!
//! The configuration path is optional; without it the bundled defaults are used.
//! Set `RUST_LOG=debug` to see every training step and target sync.

use std::env;
use std::error::Error;

use c51::agent::CategoricalDqnAgent;
use c51::config::AgentConfig;
use c51::env::CartPole;
use log::info;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match env::args().nth(1) {
        Some(path) => AgentConfig::from_json_file(path)?,
        None => AgentConfig {
            input_dim: vec![4],
            episodes: 300,
            stop_explore: 150,
            seed: Some(42),
            ..AgentConfig::default()
        },
    };
    let max_steps = config.steps;

    let mut agent = CategoricalDqnAgent::from_config(config, CartPole::new(max_steps))?;
    let metrics = agent.run()?;

    info!(
        "training finished: {} episodes, {} steps, {} updates, best episode {:?}",
        metrics.episodes(),
        metrics.total_steps,
        metrics.train_steps(),
        metrics.best_episode_reward()
    );
    if let Some(mean) = metrics.mean_reward(100) {
        info!("mean reward over the last 100 episodes: {:.1}", mean);
    }

    // a couple of rendered greedy episodes, then the configured evaluation
    agent.evaluate(2, max_steps, true)?;
    let scores = agent.evaluate_default(false)?;
    let mean = scores.iter().sum::<f32>() / scores.len().max(1) as f32;
    println!("Greedy evaluation: {:.1} average reward over {} episodes", mean, scores.len());

    Ok(())
}
