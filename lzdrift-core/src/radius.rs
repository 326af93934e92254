//! Harmonic attractor radii.
//!
//! A harmonic index `n` selects the radius
//!
//! ```text
//! base   = R0 * LZ^n
//! octave = ((n - 1) mod P + 1) / P          in (0, 1]
//! radius = base * (1 + A * sin(2π * octave))
//! ```
//!
//! where `P` is the octave period (9) and `A` the modulation amplitude (0.1).

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::config::ModelConstants;

/// Integer step selecting one candidate radius
pub type HarmonicIndex = i32;

/// Maps harmonic indices to radii
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RadiusModel {
    constants: ModelConstants,
}

impl RadiusModel {
    /// Create a model from explicit constants
    pub fn new(constants: ModelConstants) -> Self {
        Self { constants }
    }

    /// Constants this model was built with
    pub fn constants(&self) -> &ModelConstants {
        &self.constants
    }

    /// Position of `n` inside its octave, in (0, 1]
    ///
    /// Uses a Euclidean modulus so non-positive indices stay in range.
    pub fn octave_factor(&self, n: HarmonicIndex) -> f64 {
        let period = i64::from(self.constants.octave_period.max(1));
        let slot = (i64::from(n) - 1).rem_euclid(period) + 1;
        slot as f64 / period as f64
    }

    /// Unmodulated exponential radius `R0 * LZ^n`
    pub fn base_radius(&self, n: HarmonicIndex) -> f64 {
        self.constants.central_radius_km * self.constants.lz.powf(f64::from(n))
    }

    /// Radius (km) for harmonic index `n`
    ///
    /// Defined for every integer; very large `n` overflows to infinity.
    pub fn radius(&self, n: HarmonicIndex) -> f64 {
        let modulation = (self.octave_factor(n) * 2.0 * PI).sin();
        self.base_radius(n) * (1.0 + self.constants.modulation_amplitude * modulation)
    }

    /// Build the attractor set for a list of indices, preserving order
    pub fn attractors(&self, indices: &[HarmonicIndex]) -> AttractorSet {
        AttractorSet {
            attractors: indices
                .iter()
                .map(|&index| Attractor {
                    index,
                    radius_km: self.radius(index),
                })
                .collect(),
        }
    }
}

/// One (index, radius) pair
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Attractor {
    pub index: HarmonicIndex,
    pub radius_km: f64,
}

/// Ordered, immutable list of attractors
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AttractorSet {
    attractors: Vec<Attractor>,
}

impl AttractorSet {
    pub fn len(&self) -> usize {
        self.attractors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attractors.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Attractor> {
        self.attractors.iter()
    }

    pub fn as_slice(&self) -> &[Attractor] {
        &self.attractors
    }

    /// Harmonic indices in input order
    pub fn indices(&self) -> Vec<HarmonicIndex> {
        self.attractors.iter().map(|a| a.index).collect()
    }

    /// Radii in input order
    pub fn radii(&self) -> Vec<f64> {
        self.attractors.iter().map(|a| a.radius_km).collect()
    }

    /// Attractor closest to `r`, with the absolute distance to it
    ///
    /// Ties resolve to the earlier attractor.
    pub fn nearest(&self, r: f64) -> Option<(&Attractor, f64)> {
        self.attractors
            .iter()
            .map(|a| (a, (r - a.radius_km).abs()))
            .fold(None, |best, (a, d)| match best {
                Some((_, best_d)) if best_d <= d => best,
                _ => Some((a, d)),
            })
    }
}

impl<'a> IntoIterator for &'a AttractorSet {
    type Item = &'a Attractor;
    type IntoIter = std::slice::Iter<'a, Attractor>;

    fn into_iter(self) -> Self::IntoIter {
        self.attractors.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_reference_radius() {
        let model = RadiusModel::default();
        // base = 6371 * 1.23498288 = 7868.08, modulation sin(2π/9) = 0.6428
        assert_relative_eq!(model.base_radius(1), 7868.075928, epsilon = 1e-3);
        assert_relative_eq!(model.radius(1), 8373.826, epsilon = 1e-2);
    }

    #[test]
    fn test_radii_non_negative() {
        let model = RadiusModel::default();
        for n in 1..=50 {
            assert!(model.radius(n) >= 0.0, "radius({n}) negative");
        }
    }

    #[test]
    fn test_octave_periodicity() {
        let model = RadiusModel::default();
        let lz9 = model.constants().lz.powi(9);
        for n in 1..=20 {
            assert_eq!(model.octave_factor(n), model.octave_factor(n + 9));
            assert_relative_eq!(
                model.radius(n + 9) / model.radius(n),
                lz9,
                max_relative = 1e-12
            );
        }
    }

    #[test]
    fn test_non_positive_indices() {
        let model = RadiusModel::default();
        // (0 - 1) mod 9 = 8, so the octave factor is 9/9
        assert_eq!(model.octave_factor(0), 1.0);
        assert_eq!(model.octave_factor(-8), 1.0 / 9.0);
        assert_relative_eq!(model.radius(0), 6371.0, epsilon = 1e-9);
        assert!(model.radius(-1) > 0.0);
        assert!(model.octave_factor(i32::MIN) > 0.0);
    }

    #[test]
    fn test_radius_is_deterministic() {
        let model = RadiusModel::default();
        assert_eq!(model.radius(7).to_bits(), model.radius(7).to_bits());
    }

    #[test]
    fn test_alternate_constants() {
        let model = RadiusModel::new(ModelConstants {
            central_radius_km: 1.0,
            lz: 2.0,
            octave_period: 4,
            modulation_amplitude: 0.0,
        });
        assert_eq!(model.radius(3), 8.0);
        assert_eq!(model.octave_factor(5), 0.25);
    }

    #[test]
    fn test_attractor_set_nearest() {
        let model = RadiusModel::default();
        let set = model.attractors(&[3, 5, 7]);
        assert_eq!(set.len(), 3);
        assert_eq!(set.indices(), vec![3, 5, 7]);

        let (nearest, distance) = set.nearest(model.radius(5) + 10.0).unwrap();
        assert_eq!(nearest.index, 5);
        assert_relative_eq!(distance, 10.0, epsilon = 1e-6);

        assert!(AttractorSet::default().nearest(1000.0).is_none());
    }
}
