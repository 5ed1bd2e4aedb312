//! CartPole sample-efficiency benchmark
//!
//! Trains C51 with both replay cadences and compares them against a random policy.

use std::time::Instant;

use c51::agent::CategoricalDqnAgent;
use c51::config::{AgentConfig, ReplayMode};
use c51::env::{CartPole, Environment};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const EPISODES: usize = 300;
const MAX_STEPS: usize = 200;
const SOLVED_REWARD: f32 = 195.0;

struct BenchmarkResult {
    algorithm: String,
    episodes_to_solve: Option<usize>,
    final_avg_reward: f32,
    greedy_eval_reward: f32,
    training_time_ms: u128,
    inference_time_us: u128,
}

fn moving_average_solved(rewards: &[f32]) -> Option<usize> {
    (100..=rewards.len()).find_map(|end| {
        let avg = rewards[end - 100..end].iter().sum::<f32>() / 100.0;
        (avg >= SOLVED_REWARD).then_some(end - 1)
    })
}

fn benchmark_c51(name: &str, config: AgentConfig) -> BenchmarkResult {
    let start = Instant::now();
    let mut agent = CategoricalDqnAgent::from_config(config, CartPole::seeded(MAX_STEPS, 1)).unwrap();
    let metrics = agent.run().unwrap();
    let training_time = start.elapsed();

    let state = agent.env_mut().reset().unwrap();
    let inference_start = Instant::now();
    for _ in 0..1000 {
        let _ = agent.act_greedy(state.view());
    }
    let inference_time = inference_start.elapsed() / 1000;

    let eval = agent.evaluate(20, MAX_STEPS, false).unwrap();

    BenchmarkResult {
        algorithm: name.to_string(),
        episodes_to_solve: moving_average_solved(&metrics.episode_rewards),
        final_avg_reward: metrics.mean_reward(100).unwrap_or(0.0),
        greedy_eval_reward: eval.iter().sum::<f32>() / eval.len() as f32,
        training_time_ms: training_time.as_millis(),
        inference_time_us: inference_time.as_micros(),
    }
}

fn benchmark_random() -> BenchmarkResult {
    let start = Instant::now();
    let mut env = CartPole::seeded(MAX_STEPS, 1);
    let mut rng = StdRng::seed_from_u64(0);
    let mut episode_rewards = Vec::new();

    for _ in 0..100 {
        env.reset().unwrap();
        let mut episode_reward = 0.0;
        for _ in 0..MAX_STEPS {
            let step = env.step(rng.gen_range(0..2)).unwrap();
            episode_reward += step.reward;
            if step.done {
                break;
            }
        }
        episode_rewards.push(episode_reward);
    }

    let avg = episode_rewards.iter().sum::<f32>() / episode_rewards.len() as f32;
    BenchmarkResult {
        algorithm: "Random".to_string(),
        episodes_to_solve: None,
        final_avg_reward: avg,
        greedy_eval_reward: avg,
        training_time_ms: start.elapsed().as_millis(),
        inference_time_us: 0,
    }
}

fn base_config() -> AgentConfig {
    AgentConfig {
        episodes: EPISODES,
        steps: MAX_STEPS,
        stop_explore: EPISODES / 2,
        input_dim: vec![4],
        seed: Some(42),
        ..AgentConfig::default()
    }
}

fn main() {
    println!("CartPole C51 Benchmark");
    println!("======================\n");

    let results = vec![
        benchmark_random(),
        benchmark_c51("C51 (sliding window)", base_config()),
        benchmark_c51(
            "C51 (drain)",
            AgentConfig {
                replay_mode: ReplayMode::Drain,
                replay_buffer_size: 64,
                ..base_config()
            },
        ),
    ];

    for result in &results {
        println!("{}:", result.algorithm);
        match result.episodes_to_solve {
            Some(ep) => println!("  Solved in {} episodes", ep),
            None => println!("  Not solved within {} episodes", EPISODES),
        }
        println!("  Final average reward: {:.2}", result.final_avg_reward);
        println!("  Greedy evaluation reward: {:.2}", result.greedy_eval_reward);
        println!("  Training time: {:.2}s", result.training_time_ms as f64 / 1000.0);
        println!("  Inference time: {}μs\n", result.inference_time_us);
    }
}
