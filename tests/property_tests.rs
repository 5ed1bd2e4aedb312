#[cfg(test)]
mod property_tests {
    use c51::distribution::{bin_weights, make_support, project_distribution, select_action, shifted_support, Projector};
    use ndarray::{Array1, Array3};
    use proptest::prelude::*;

    // Logits turned into a distribution; normalized in f64 so the f32 result sums to 1
    // up to one rounding per cell.
    fn distribution_strategy(n: usize) -> impl Strategy<Value = Array1<f32>> {
        prop::collection::vec(-6.0f64..6.0, n).prop_map(|logits| {
            let exps: Vec<f64> = logits.iter().map(|l| l.exp()).collect();
            let sum: f64 = exps.iter().sum();
            exps.iter().map(|e| (e / sum) as f32).collect()
        })
    }

    fn support_params() -> impl Strategy<Value = (f32, f32, usize)> {
        (-100.0f32..50.0, 0.5f32..150.0, 2usize..=101).prop_map(|(v_min, width, n)| (v_min, v_min + width, n))
    }

    fn f64_sum(values: &Array1<f32>) -> f64 {
        values.iter().map(|&v| v as f64).sum()
    }

    proptest! {
        #[test]
        fn test_support_is_an_even_grid((v_min, v_max, n) in support_params()) {
            let support = make_support(v_min, v_max, n).unwrap();
            let atoms = support.atoms();

            prop_assert_eq!(atoms.len(), n);
            prop_assert_eq!(atoms[0], v_min);
            prop_assert_eq!(atoms[n - 1], v_max);

            let tolerance = 1e-4 * (v_min.abs() + v_max.abs() + 1.0);
            for i in 1..n {
                prop_assert!(atoms[i] > atoms[i - 1]);
                prop_assert!((atoms[i] - atoms[i - 1] - support.delta_z()).abs() < tolerance);
            }
        }

        #[test]
        fn test_projection_conserves_mass(
            p in distribution_strategy(51),
            reward in -30.0f32..30.0,
            discount in 0.0f32..=1.0,
            terminal in any::<bool>(),
        ) {
            let support = make_support(-10.0, 10.0, 51).unwrap();
            let terminal = if terminal { 1.0 } else { 0.0 };
            let projected = project_distribution(&support, p.view(), reward, discount, terminal).unwrap();

            prop_assert!(projected.iter().all(|&m| m >= 0.0));
            prop_assert!((f64_sum(&projected) - 1.0).abs() < 1e-6);
        }

        #[test]
        fn test_shifted_support_stays_in_bounds(
            (v_min, v_max, n) in support_params(),
            reward in -1000.0f32..1000.0,
            discount in 0.0f32..=1.0,
            terminal in any::<bool>(),
        ) {
            let support = make_support(v_min, v_max, n).unwrap();
            let terminal = if terminal { 1.0 } else { 0.0 };
            let shifted = shifted_support(&support, reward, discount, terminal);
            prop_assert!(shifted.iter().all(|&z| z >= v_min && z <= v_max));
        }

        #[test]
        fn test_bin_weights_partition_unity(b in 0.0f64..200.0) {
            let w = bin_weights(b);
            prop_assert!((w.lower_weight + w.upper_weight - 1.0).abs() < 1e-12);
            prop_assert!(w.lower_weight >= 0.0 && w.upper_weight >= 0.0);
            prop_assert!(w.upper - w.lower <= 1);
        }

        #[test]
        fn test_aligned_bins_keep_all_mass(k in 0usize..200) {
            let w = bin_weights(k as f64);
            prop_assert_eq!(w.lower, k);
            prop_assert_eq!(w.upper, k);
            prop_assert_eq!(w.lower_weight, 1.0);
            prop_assert_eq!(w.upper_weight, 0.0);
        }

        #[test]
        fn test_batch_projection_rows(
            dists in prop::collection::vec(distribution_strategy(21), 12),
            rewards in prop::collection::vec(-15.0f32..15.0, 4),
            discount in 0.0f32..=1.0,
        ) {
            let support = make_support(-10.0, 10.0, 21).unwrap();
            let projector = Projector::new(support, discount).unwrap();

            let mut next = Array3::<f32>::zeros((4, 3, 21));
            for (i, d) in dists.iter().enumerate() {
                next.slice_mut(ndarray::s![i / 3, i % 3, ..]).assign(d);
            }
            let terminals = Array1::from(vec![0.0, 1.0, 0.0, 1.0]);
            let projection = projector
                .project(next.view(), Array1::from(rewards).view(), terminals.view())
                .unwrap();
            let target = projection.target_histogram();

            for b in 0..4 {
                let row = target.slice(ndarray::s![b, projection.next_actions()[b], ..]).to_owned();
                prop_assert!((f64_sum(&row) - 1.0).abs() < 1e-6);
                let total: f64 = target.slice(ndarray::s![b, .., ..]).iter().map(|&m| m as f64).sum();
                prop_assert!((total - f64_sum(&row)).abs() < 1e-12);
            }
        }

        #[test]
        fn test_select_action_picks_first_maximum(values in prop::collection::vec(-5i32..5, 1..10)) {
            let q: Array1<f32> = values.iter().map(|&v| v as f32).collect();
            let chosen = select_action(q.view()).unwrap();
            let max = values.iter().copied().max().unwrap();
            prop_assert_eq!(values[chosen], max);
            prop_assert!(values[..chosen].iter().all(|&v| v < max));
        }
    }
}
