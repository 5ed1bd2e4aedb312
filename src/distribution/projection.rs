use ndarray::{s, Array1, Array2, Array3, ArrayView1, ArrayView2, ArrayView3};

use super::{ensure_finite, greedy_actions, q_values, Support};
use crate::error::{C51Error, Result};

/// Interpolation weights for one shifted atom landing at fractional bin `b`.
///
/// `lower_weight + upper_weight == 1` always holds. When `b` sits exactly on a
/// grid point (`lower == upper`) the whole weight goes to that point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinWeights {
    pub lower: usize,
    pub upper: usize,
    pub lower_weight: f64,
    pub upper_weight: f64,
}

/// Split fractional bin coordinate `b_coord` between `floor(b)` and `ceil(b)`.
///
/// `b_coord` must be non-negative and finite.
pub fn bin_weights(b_coord: f64) -> BinWeights {
    let l = b_coord.floor();
    let u = b_coord.ceil();
    let aligned = if l == u { 1.0 } else { 0.0 };
    BinWeights {
        lower: l as usize,
        upper: u as usize,
        lower_weight: u + aligned - b_coord,
        upper_weight: b_coord - l,
    }
}

/// The Bellman-shifted support `r + discount * (1 - terminal) * z_j`, saturated to
/// `[v_min, v_max]`.
pub fn shifted_support(support: &Support, reward: f32, discount_rate: f32, terminal: f32) -> Array1<f32> {
    let scale = discount_rate as f64 * (1.0 - terminal as f64);
    support
        .atoms()
        .mapv(|z| shift_atom(support, z, reward, scale) as f32)
}

fn shift_atom(support: &Support, z: f32, reward: f32, scale: f64) -> f64 {
    (reward as f64 + scale * z as f64).clamp(support.v_min() as f64, support.v_max() as f64)
}

/// Project a single next-state distribution through the Bellman update.
///
/// Returns a distribution over `support` carrying the same total mass as `p_next`.
pub fn project_distribution(
    support: &Support,
    p_next: ArrayView1<f32>,
    reward: f32,
    discount_rate: f32,
    terminal: f32,
) -> Result<Array1<f32>> {
    if p_next.len() != support.len() {
        return Err(C51Error::shape_mismatch(
            format!("{} atoms", support.len()),
            format!("{} atoms", p_next.len()),
        ));
    }
    ensure_finite(p_next.iter(), "next-state distribution")?;
    check_reward_terminal(reward, terminal, 0)?;

    let mut row = vec![0.0f64; support.len()];
    accumulate_projection(support, p_next, reward, discount_rate, terminal, &mut row);
    Ok(row.into_iter().map(|m| m as f32).collect())
}

fn check_reward_terminal(reward: f32, terminal: f32, index: usize) -> Result<()> {
    if !reward.is_finite() {
        return Err(C51Error::numeric(format!("reward of batch item {} is {}", index, reward)));
    }
    if !(0.0..=1.0).contains(&terminal) {
        return Err(C51Error::configuration(
            "terminals",
            format!("terminal flag of batch item {} must be 0 or 1, got {}", index, terminal),
        ));
    }
    Ok(())
}

// Scatter-adds the lower share at l and the upper share at u. Mass is
// accumulated in f64 and only rounded to f32 by the caller.
fn accumulate_projection(
    support: &Support,
    p_next: ArrayView1<f32>,
    reward: f32,
    discount_rate: f32,
    terminal: f32,
    row: &mut [f64],
) {
    let v_min = support.v_min() as f64;
    let delta_z = support.delta_z() as f64;
    let last = (support.len() - 1) as f64;
    let scale = discount_rate as f64 * (1.0 - terminal as f64);

    for (&z, &p) in support.atoms().iter().zip(p_next.iter()) {
        let tz = shift_atom(support, z, reward, scale);
        let b_coord = ((tz - v_min) / delta_z).clamp(0.0, last);
        let w = bin_weights(b_coord);
        let p = p as f64;
        row[w.lower] += w.lower_weight * p;
        row[w.upper] += w.upper_weight * p;
    }
}

/// Categorical projection of the distributional Bellman target (C51, Algorithm 1).
///
/// For each batch item the greedy next action is chosen by expected value, its
/// distribution is shifted by `r + discount * (1 - done) * z`, clipped to the
/// support bounds and linearly redistributed onto the neighbouring atoms.
///
/// # Example
///
/// ```
/// use c51::distribution::{make_support, Projector};
/// use ndarray::{array, Array3};
///
/// let support = make_support(-10.0, 10.0, 21).unwrap();
/// let projector = Projector::new(support, 0.9).unwrap();
///
/// // one transition, two actions, all mass of action 0 on the atom at 0.0
/// let mut next = Array3::<f32>::zeros((1, 2, 21));
/// next[[0, 0, 10]] = 1.0;
/// next[[0, 1, 0]] = 1.0;
///
/// let projection = projector
///     .project(next.view(), array![1.0].view(), array![0.0].view())
///     .unwrap();
/// let target = projection.target_histogram();
/// assert_eq!(projection.next_actions(), &[0]);
/// assert_eq!(target[[0, 0, 11]], 1.0);
/// ```
#[derive(Debug, Clone)]
pub struct Projector {
    support: Support,
    discount_rate: f32,
}

impl Projector {
    pub fn new(support: Support, discount_rate: f32) -> Result<Self> {
        if !(0.0..=1.0).contains(&discount_rate) {
            return Err(C51Error::configuration(
                "discount_rate",
                format!("must lie in [0, 1], got {}", discount_rate),
            ));
        }
        Ok(Projector {
            support,
            discount_rate,
        })
    }

    pub fn support(&self) -> &Support {
        &self.support
    }

    pub fn discount_rate(&self) -> f32 {
        self.discount_rate
    }

    /// Build the projected targets for a batch of next-state distributions.
    ///
    /// * `next_distributions` - `(batch, num_actions, n_atoms)` from the target network
    /// * `rewards` - one reward per batch item
    /// * `terminals` - `1.0` for transitions that ended the episode, `0.0` otherwise
    pub fn project(
        &self,
        next_distributions: ArrayView3<f32>,
        rewards: ArrayView1<f32>,
        terminals: ArrayView1<f32>,
    ) -> Result<Projection> {
        let (batch_size, num_actions, n_atoms) = next_distributions.dim();
        if batch_size == 0 || num_actions == 0 {
            return Err(C51Error::shape_mismatch(
                "non-empty (batch, num_actions, n_atoms)",
                format!("{:?}", next_distributions.dim()),
            ));
        }
        if n_atoms != self.support.len() {
            return Err(C51Error::shape_mismatch(
                format!("{} atoms", self.support.len()),
                format!("{} atoms", n_atoms),
            ));
        }
        if rewards.len() != batch_size || terminals.len() != batch_size {
            return Err(C51Error::shape_mismatch(
                format!("{} rewards and terminals", batch_size),
                format!("{} rewards, {} terminals", rewards.len(), terminals.len()),
            ));
        }

        let q_next = q_values(next_distributions, &self.support)?;
        let next_actions = greedy_actions(q_next.view())?;

        let mut distributions = Array2::<f32>::zeros((batch_size, n_atoms));
        let mut row = vec![0.0f64; n_atoms];
        for (b, &action) in next_actions.iter().enumerate() {
            check_reward_terminal(rewards[b], terminals[b], b)?;
            row.iter_mut().for_each(|m| *m = 0.0);
            let p_next = next_distributions.slice(s![b, action, ..]);
            accumulate_projection(
                &self.support,
                p_next,
                rewards[b],
                self.discount_rate,
                terminals[b],
                &mut row,
            );
            for (dst, &mass) in distributions.row_mut(b).iter_mut().zip(row.iter()) {
                *dst = mass as f32;
            }
        }

        Ok(Projection {
            next_actions,
            distributions,
            num_actions,
        })
    }
}

/// Output of [`Projector::project`].
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    next_actions: Vec<usize>,
    distributions: Array2<f32>,
    num_actions: usize,
}

impl Projection {
    /// Greedy next action of every batch item.
    pub fn next_actions(&self) -> &[usize] {
        &self.next_actions
    }

    /// Projected distribution of every batch item, `(batch, n_atoms)`.
    pub fn distributions(&self) -> ArrayView2<'_, f32> {
        self.distributions.view()
    }

    pub fn len(&self) -> usize {
        self.next_actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.next_actions.is_empty()
    }

    /// Target histogram with the projection stored at each item's next-action row;
    /// every other action row is zero.
    pub fn target_histogram(&self) -> Array3<f32> {
        self.scatter_rows(&self.next_actions)
    }

    /// Target histogram with the projection stored at caller-chosen action rows.
    pub fn histogram_at(&self, rows: &[usize]) -> Result<Array3<f32>> {
        if rows.len() != self.len() {
            return Err(C51Error::shape_mismatch(
                format!("{} rows", self.len()),
                format!("{} rows", rows.len()),
            ));
        }
        if let Some(&action) = rows.iter().find(|&&a| a >= self.num_actions) {
            return Err(C51Error::InvalidAction {
                action,
                num_actions: self.num_actions,
            });
        }
        Ok(self.scatter_rows(rows))
    }

    fn scatter_rows(&self, rows: &[usize]) -> Array3<f32> {
        let (batch_size, n_atoms) = self.distributions.dim();
        let mut histogram = Array3::<f32>::zeros((batch_size, self.num_actions, n_atoms));
        for (b, &action) in rows.iter().enumerate() {
            histogram
                .slice_mut(s![b, action, ..])
                .assign(&self.distributions.row(b));
        }
        histogram
    }
}
