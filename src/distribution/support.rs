use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::error::{C51Error, Result};

/// The fixed grid of return atoms `z_0 < z_1 < ... < z_{N-1}` over `[v_min, v_max]`.
///
/// Built once per agent and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Support {
    atoms: Array1<f32>,
    v_min: f32,
    v_max: f32,
    delta_z: f32,
}

/// Build `n_atoms` evenly spaced atoms covering `[v_min, v_max]`, endpoints included.
///
/// # Example
///
/// ```
/// use c51::distribution::make_support;
///
/// let support = make_support(-10.0, 10.0, 21).unwrap();
/// assert_eq!(support.len(), 21);
/// assert_eq!(support.delta_z(), 1.0);
/// assert_eq!(support.atoms()[10], 0.0);
/// ```
pub fn make_support(v_min: f32, v_max: f32, n_atoms: usize) -> Result<Support> {
    if !v_min.is_finite() || !v_max.is_finite() {
        return Err(C51Error::configuration("support", "bounds must be finite"));
    }
    if n_atoms < 2 {
        return Err(C51Error::configuration(
            "n_atoms",
            format!("at least 2 atoms are required, got {}", n_atoms),
        ));
    }
    if v_max <= v_min {
        return Err(C51Error::configuration(
            "v_max",
            format!("must be greater than v_min ({} <= {})", v_max, v_min),
        ));
    }

    let delta_z = (v_max - v_min) / (n_atoms - 1) as f32;
    if !(delta_z.is_finite() && delta_z > 0.0) {
        return Err(C51Error::configuration(
            "delta_z",
            format!("atom spacing must be finite and positive, got {}", delta_z),
        ));
    }

    let mut atoms = Array1::from_shape_fn(n_atoms, |i| v_min + i as f32 * delta_z);
    // Pin the upper endpoint; i * delta_z can round away from v_max.
    atoms[n_atoms - 1] = v_max;
    if atoms.iter().zip(atoms.iter().skip(1)).any(|(lower, upper)| upper <= lower) {
        return Err(C51Error::configuration(
            "delta_z",
            format!("spacing {} is too fine to separate atoms near {} in f32", delta_z, v_min),
        ));
    }

    Ok(Support {
        atoms,
        v_min,
        v_max,
        delta_z,
    })
}

impl Support {
    pub fn new(v_min: f32, v_max: f32, n_atoms: usize) -> Result<Self> {
        make_support(v_min, v_max, n_atoms)
    }

    pub fn atoms(&self) -> ArrayView1<'_, f32> {
        self.atoms.view()
    }

    pub fn v_min(&self) -> f32 {
        self.v_min
    }

    pub fn v_max(&self) -> f32 {
        self.v_max
    }

    pub fn delta_z(&self) -> f32 {
        self.delta_z
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    /// Always false; a support has at least two atoms.
    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// Mean of a categorical distribution over this support.
    pub fn expectation(&self, probabilities: ArrayView1<f32>) -> Result<f32> {
        if probabilities.len() != self.len() {
            return Err(C51Error::shape_mismatch(
                format!("{} atoms", self.len()),
                format!("{} atoms", probabilities.len()),
            ));
        }
        Ok(probabilities.dot(&self.atoms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_are_exact() {
        let support = make_support(-3.3, 7.1, 37).unwrap();
        assert_eq!(support.atoms()[0], -3.3);
        assert_eq!(support.atoms()[36], 7.1);
    }

    #[test]
    fn test_two_atoms() {
        let support = make_support(0.0, 1.0, 2).unwrap();
        assert_eq!(support.atoms().to_vec(), vec![0.0, 1.0]);
        assert_eq!(support.delta_z(), 1.0);
    }

    #[test]
    fn test_rejects_bad_parameters() {
        assert!(matches!(make_support(0.0, 1.0, 1), Err(C51Error::Configuration { .. })));
        assert!(matches!(make_support(1.0, 1.0, 5), Err(C51Error::Configuration { .. })));
        assert!(matches!(make_support(2.0, 1.0, 5), Err(C51Error::Configuration { .. })));
        assert!(matches!(make_support(f32::NAN, 1.0, 5), Err(C51Error::Configuration { .. })));
    }

    #[test]
    fn test_rejects_overflowing_spacing() {
        // v_max - v_min overflows f32 even though both bounds are finite.
        assert!(matches!(
            make_support(-3e38, 3e38, 2),
            Err(C51Error::Configuration { ref name, .. }) if name == "delta_z"
        ));
    }

    #[test]
    fn test_rejects_spacing_below_f32_resolution() {
        // Near 1e6 neighbouring f32 values are 0.0625 apart, far wider than 1/999.
        assert!(matches!(
            make_support(1e6, 1e6 + 1.0, 1000),
            Err(C51Error::Configuration { ref name, .. }) if name == "delta_z"
        ));
        let coarse = make_support(1e6, 1e6 + 64.0, 5).unwrap();
        assert!(coarse.atoms().iter().zip(coarse.atoms().iter().skip(1)).all(|(a, b)| b > a));
    }

    #[test]
    fn test_expectation() {
        let support = make_support(-1.0, 1.0, 3).unwrap();
        let p = ndarray::array![0.25, 0.25, 0.5];
        assert!((support.expectation(p.view()).unwrap() - 0.25).abs() < 1e-6);
        let wrong = ndarray::array![0.5, 0.5];
        assert!(support.expectation(wrong.view()).is_err());
    }
}
