//! # Categorical Value Distributions
//!
//! This module holds the distributional core of the agent:
//!
//! - [`Support`]: the fixed atom grid over `[v_min, v_max]`
//! - [`q_values`] / [`select_action`]: reduce each action's distribution to its
//!   mean and pick the greedy action (first maximum wins)
//! - [`Projector`]: the distributional Bellman target and its projection back
//!   onto the support
//!
//! Distribution batches are `Array3<f32>` shaped `(batch, num_actions, n_atoms)`.
//!
//! ## Example
//!
//! ```rust
//! use c51::distribution::{make_support, q_values, select_action};
//! use ndarray::Array3;
//!
//! let support = make_support(-1.0, 1.0, 3).unwrap();
//! let mut dists = Array3::<f32>::zeros((1, 2, 3));
//! dists[[0, 0, 0]] = 1.0; // action 0 always returns -1
//! dists[[0, 1, 2]] = 1.0; // action 1 always returns +1
//!
//! let q = q_values(dists.view(), &support).unwrap();
//! assert_eq!(select_action(q.row(0)).unwrap(), 1);
//! ```

mod projection;
mod support;

pub use projection::{bin_weights, project_distribution, shifted_support, BinWeights, Projection, Projector};
pub use support::{make_support, Support};

use ndarray::{Array2, ArrayView1, ArrayView2, ArrayView3, Axis};

use crate::error::{C51Error, Result};

/// Expected return of every action: `Q[b, a] = sum_j dist[b, a, j] * atoms[j]`.
pub fn q_values(dist_batch: ArrayView3<f32>, support: &Support) -> Result<Array2<f32>> {
    let (_, _, n_atoms) = dist_batch.dim();
    if n_atoms != support.len() {
        return Err(C51Error::shape_mismatch(
            format!("{} atoms", support.len()),
            format!("{} atoms", n_atoms),
        ));
    }
    ensure_finite(dist_batch.iter(), "distribution batch")?;

    let atoms = support.atoms();
    let q = Array2::from_shape_fn((dist_batch.dim().0, dist_batch.dim().1), |(b, a)| {
        dist_batch.slice(ndarray::s![b, a, ..]).dot(&atoms)
    });
    Ok(q)
}

/// Index of the largest Q-value. Ties resolve to the lowest index.
pub fn select_action(q_row: ArrayView1<f32>) -> Result<usize> {
    if q_row.is_empty() {
        return Err(C51Error::shape_mismatch("at least one action", "0 actions"));
    }
    let mut best = 0;
    let mut best_value = f32::NEG_INFINITY;
    for (idx, &value) in q_row.iter().enumerate() {
        if !value.is_finite() {
            return Err(C51Error::numeric(format!("Q-value for action {} is {}", idx, value)));
        }
        // strict comparison keeps the first maximum
        if idx == 0 || value > best_value {
            best = idx;
            best_value = value;
        }
    }
    Ok(best)
}

/// Greedy action for every row of a Q-value matrix.
pub fn greedy_actions(q: ArrayView2<f32>) -> Result<Vec<usize>> {
    q.axis_iter(Axis(0)).map(select_action).collect()
}

/// Verify that a distribution batch has the configured `(batch, actions, atoms)`
/// shape and holds only finite values.
pub fn check_distribution_batch(
    dist_batch: ArrayView3<f32>,
    expected: (usize, usize, usize),
) -> Result<()> {
    if dist_batch.dim() != expected {
        return Err(C51Error::shape_mismatch(
            format!("{:?}", expected),
            format!("{:?}", dist_batch.dim()),
        ));
    }
    ensure_finite(dist_batch.iter(), "distribution batch")
}

pub(crate) fn ensure_finite<'a, I>(values: I, what: &str) -> Result<()>
where
    I: IntoIterator<Item = &'a f32>,
{
    let mut nan_count = 0;
    let mut inf_count = 0;
    for &value in values {
        if value.is_nan() {
            nan_count += 1;
        } else if value.is_infinite() {
            inf_count += 1;
        }
    }
    if nan_count > 0 || inf_count > 0 {
        return Err(C51Error::numeric(format!(
            "{} contains {} NaN and {} infinite values",
            what, nan_count, inf_count
        )));
    }
    Ok(())
}
