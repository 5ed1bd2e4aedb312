//! CartPole balancing task
//!
//! A pole is hinged to a cart on a frictionless track; the agent pushes the cart
//! left (action 0) or right (action 1). The observation is
//! `[x, x_dot, theta, theta_dot]`, every step yields a reward of 1.0, and the
//! episode ends when the pole tilts past 12° or the cart leaves `[-2.4, 2.4]`,
//! or after `max_steps` steps.

use log::info;
use ndarray::{array, Array1};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{Environment, RenderMode, StepInfo, StepResult};
use crate::error::{C51Error, Result};

const GRAVITY: f32 = 9.8;
const MASS_CART: f32 = 1.0;
const MASS_POLE: f32 = 0.1;
const TOTAL_MASS: f32 = MASS_CART + MASS_POLE;
const HALF_LENGTH: f32 = 0.5;
const POLE_MASS_LENGTH: f32 = MASS_POLE * HALF_LENGTH;
const FORCE_MAG: f32 = 10.0;
const TAU: f32 = 0.02;
const X_THRESHOLD: f32 = 2.4;
const THETA_THRESHOLD: f32 = 12.0 * 2.0 * std::f32::consts::PI / 360.0;

#[derive(Debug, Clone)]
pub struct CartPole {
    x: f32,
    x_dot: f32,
    theta: f32,
    theta_dot: f32,
    steps: usize,
    max_steps: usize,
    done: bool,
    rng: StdRng,
}

impl CartPole {
    pub fn new(max_steps: usize) -> Self {
        Self::with_rng(max_steps, StdRng::from_entropy())
    }

    /// Deterministic initial states for a given seed.
    pub fn seeded(max_steps: usize, seed: u64) -> Self {
        Self::with_rng(max_steps, StdRng::seed_from_u64(seed))
    }

    fn with_rng(max_steps: usize, rng: StdRng) -> Self {
        CartPole {
            x: 0.0,
            x_dot: 0.0,
            theta: 0.0,
            theta_dot: 0.0,
            steps: 0,
            max_steps,
            done: true,
            rng,
        }
    }

    fn observation(&self) -> Array1<f32> {
        array![self.x, self.x_dot, self.theta, self.theta_dot]
    }

    // Euler integration of the cart-pole dynamics
    fn physics_step(&mut self, action: usize) {
        let force = if action == 1 { FORCE_MAG } else { -FORCE_MAG };
        let cos_theta = self.theta.cos();
        let sin_theta = self.theta.sin();

        let temp = (force + POLE_MASS_LENGTH * self.theta_dot * self.theta_dot * sin_theta) / TOTAL_MASS;
        let theta_acc = (GRAVITY * sin_theta - cos_theta * temp)
            / (HALF_LENGTH * (4.0 / 3.0 - MASS_POLE * cos_theta * cos_theta / TOTAL_MASS));
        let x_acc = temp - POLE_MASS_LENGTH * theta_acc * cos_theta / TOTAL_MASS;

        self.x += TAU * self.x_dot;
        self.x_dot += TAU * x_acc;
        self.theta += TAU * self.theta_dot;
        self.theta_dot += TAU * theta_acc;
    }

    fn is_terminated(&self) -> bool {
        self.x.abs() > X_THRESHOLD || self.theta.abs() > THETA_THRESHOLD
    }
}

impl Default for CartPole {
    fn default() -> Self {
        Self::new(500)
    }
}

impl Environment for CartPole {
    fn reset(&mut self) -> Result<Array1<f32>> {
        self.x = self.rng.gen_range(-0.05..0.05);
        self.x_dot = self.rng.gen_range(-0.05..0.05);
        self.theta = self.rng.gen_range(-0.05..0.05);
        self.theta_dot = self.rng.gen_range(-0.05..0.05);
        self.steps = 0;
        self.done = false;
        Ok(self.observation())
    }

    fn step(&mut self, action: usize) -> Result<StepResult> {
        if action >= 2 {
            return Err(C51Error::InvalidAction { action, num_actions: 2 });
        }
        if self.done {
            return Err(C51Error::Environment("step() called on a finished episode; call reset()".to_string()));
        }

        self.physics_step(action);
        self.steps += 1;

        let terminated = self.is_terminated();
        let truncated = !terminated && self.steps >= self.max_steps;
        self.done = terminated || truncated;

        Ok(StepResult {
            next_state: self.observation(),
            reward: 1.0,
            done: self.done,
            info: StepInfo { truncated },
        })
    }

    fn render(&self, mode: RenderMode) -> Result<()> {
        if mode == RenderMode::Human {
            const WIDTH: usize = 41;
            let pos = ((self.x + X_THRESHOLD) / (2.0 * X_THRESHOLD) * (WIDTH - 1) as f32)
                .round()
                .clamp(0.0, (WIDTH - 1) as f32) as usize;
            let mut track = vec!['-'; WIDTH];
            track[pos] = if self.theta > 0.05 {
                '/'
            } else if self.theta < -0.05 {
                '\\'
            } else {
                '|'
            };
            info!(
                "[{}] step {:>3} x={:+.3} theta={:+.3}",
                track.into_iter().collect::<String>(),
                self.steps,
                self.x,
                self.theta
            );
        }
        Ok(())
    }

    fn observation_size(&self) -> usize {
        4
    }

    fn num_actions(&self) -> usize {
        2
    }
}
