//! Categorical cross-entropy between predicted and target histograms.
//!
//! Both tensors are `(batch, num_actions, n_atoms)`. Target rows that are all
//! zero contribute neither loss nor gradient, so only the row holding the
//! projected distribution is trained.

use ndarray::{Array1, Array3, ArrayView1, ArrayView3, Axis, Zip};

const LOG_EPSILON: f32 = 1e-7;

/// Per-sample loss `-sum_{a,j} target * ln(pred + 1e-7)`.
pub fn cross_entropy_per_sample(predictions: ArrayView3<f32>, targets: ArrayView3<f32>) -> Array1<f32> {
    predictions
        .axis_iter(Axis(0))
        .zip(targets.axis_iter(Axis(0)))
        .map(|(pred, target)| {
            -pred
                .iter()
                .zip(target.iter())
                .map(|(&p, &t)| t * (p + LOG_EPSILON).ln())
                .sum::<f32>()
        })
        .collect()
}

/// Weighted mean of the per-sample losses. `weights` defaults to all ones.
pub fn weighted_mean(sample_losses: ArrayView1<f32>, weights: Option<ArrayView1<f32>>) -> f32 {
    if sample_losses.is_empty() {
        return 0.0;
    }
    let total: f32 = match weights {
        Some(w) => sample_losses.iter().zip(w.iter()).map(|(&l, &w)| l * w).sum(),
        None => sample_losses.sum(),
    };
    total / sample_losses.len() as f32
}

/// Gradient of the weighted mean loss with respect to the pre-softmax logits.
///
/// For each `(b, a)` row: `w_b * (pred * sum_j target - target) / batch`.
pub fn softmax_cross_entropy_grad(
    predictions: ArrayView3<f32>,
    targets: ArrayView3<f32>,
    weights: Option<ArrayView1<f32>>,
) -> Array3<f32> {
    let batch_size = predictions.dim().0.max(1) as f32;
    let mut grad = Array3::<f32>::zeros(predictions.dim());

    for (b, mut grad_b) in grad.axis_iter_mut(Axis(0)).enumerate() {
        let w = weights.as_ref().map_or(1.0, |w| w[b]);
        for (a, mut grad_row) in grad_b.axis_iter_mut(Axis(0)).enumerate() {
            let pred_row = predictions.slice(ndarray::s![b, a, ..]);
            let target_row = targets.slice(ndarray::s![b, a, ..]);
            let mass = target_row.sum();
            Zip::from(&mut grad_row)
                .and(&pred_row)
                .and(&target_row)
                .for_each(|g, &p, &t| *g = w * (p * mass - t) / batch_size);
        }
    }
    grad
}
