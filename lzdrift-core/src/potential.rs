//! Resonance potential.
//!
//! The potential at radius `r` is a sum of Lorentzian bumps, one per
//! attractor:
//!
//! ```text
//! V(r) = Σ 1 / (1 + k * (r - r_a)^2)
//! ```
//!
//! Each bump peaks at exactly 1 on its attractor radius and the denominator
//! never drops below 1.

use crate::config::FieldConfig;
use crate::radius::{AttractorSet, HarmonicIndex, RadiusModel};

/// Contribution of a single attractor at distance `distance`
#[inline]
pub fn bump(distance: f64, sharpness: f64) -> f64 {
    1.0 / (1.0 + sharpness * distance * distance)
}

/// Potential generated by a fixed attractor set
#[derive(Clone, Debug, PartialEq)]
pub struct PotentialField {
    attractors: AttractorSet,
    sharpness: f64,
}

impl PotentialField {
    /// Resolve `indices` through `model` and build the field
    pub fn new(model: &RadiusModel, indices: &[HarmonicIndex], config: FieldConfig) -> Self {
        Self::from_attractors(model.attractors(indices), config)
    }

    /// Build the field from an existing attractor set
    pub fn from_attractors(attractors: AttractorSet, config: FieldConfig) -> Self {
        Self {
            attractors,
            sharpness: config.sharpness,
        }
    }

    pub fn attractors(&self) -> &AttractorSet {
        &self.attractors
    }

    pub fn sharpness(&self) -> f64 {
        self.sharpness
    }

    /// Potential at radius `r`
    pub fn potential(&self, r: f64) -> f64 {
        self.attractors
            .iter()
            .map(|a| bump((r - a.radius_km).abs(), self.sharpness))
            .sum()
    }

    /// Central-difference derivative `(V(r+h) - V(r-h)) / 2h`
    pub fn gradient(&self, r: f64, step: f64) -> f64 {
        (self.potential(r + step) - self.potential(r - step)) / (2.0 * step)
    }

    /// Sample the potential at each radius
    pub fn profile(&self, radii: &[f64]) -> Vec<f64> {
        radii.iter().map(|&r| self.potential(r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn field(indices: &[HarmonicIndex]) -> (RadiusModel, PotentialField) {
        let model = RadiusModel::default();
        let field = PotentialField::new(&model, indices, FieldConfig::default());
        (model, field)
    }

    #[test]
    fn test_peak_is_exactly_one() {
        let (model, field) = field(&[5]);
        let r_a = model.radius(5);
        assert_eq!(field.potential(r_a), 1.0);
        for d in [0.5, 1.0, 10.0, 250.0] {
            assert!(field.potential(r_a + d) < 1.0);
            assert!(field.potential(r_a - d) < 1.0);
        }
    }

    #[test]
    fn test_symmetry_about_attractor() {
        let (model, field) = field(&[4]);
        let r_a = model.radius(4);
        for d in [0.25, 3.0, 17.5, 400.0] {
            assert_relative_eq!(
                field.potential(r_a + d),
                field.potential(r_a - d),
                max_relative = 1e-9
            );
        }
    }

    #[test]
    fn test_monotonic_decay() {
        let (model, field) = field(&[3]);
        let r_a = model.radius(3);
        let values: Vec<f64> = (0..50).map(|i| field.potential(r_a + i as f64)).collect();
        assert!(values.windows(2).all(|w| w[1] < w[0]));
    }

    #[test]
    fn test_known_value() {
        let (model, field) = field(&[2]);
        // 1 / (1 + 0.01 * 10^2) = 0.5
        assert_relative_eq!(field.potential(model.radius(2) + 10.0), 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_sum_over_attractors() {
        let (model, field) = field(&[3, 5, 7]);
        let r = model.radius(5);
        let expected: f64 = [3, 5, 7]
            .iter()
            .map(|&n| bump((r - model.radius(n)).abs(), 0.01))
            .sum();
        assert_eq!(field.potential(r), expected);
        assert!(field.potential(r) > 1.0);
    }

    #[test]
    fn test_empty_field() {
        let (_, field) = field(&[]);
        assert_eq!(field.potential(12_000.0), 0.0);
        assert_eq!(field.gradient(12_000.0, 1.0), 0.0);
    }

    #[test]
    fn test_gradient_sign() {
        let (model, field) = field(&[6]);
        let r_a = model.radius(6);
        assert!(field.gradient(r_a - 5.0, 1.0) > 0.0);
        assert!(field.gradient(r_a + 5.0, 1.0) < 0.0);
        assert_relative_eq!(field.gradient(r_a, 1.0), 0.0, epsilon = 1e-9);
    }
}
