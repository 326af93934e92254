//! Planar sampling of a single-attractor potential.
//!
//! The "collector field" around attractor `n` is the potential of `[n]`
//! evaluated at `sqrt(x² + y²)` on a square grid centred on the central body.
//! Quiver vectors are the negated array gradient of the sampled values, with
//! unit index spacing: central differences inside the grid, one-sided
//! differences on its edges.

use serde::{Deserialize, Serialize};

use crate::config::FieldConfig;
use crate::error::{DriftError, Result};
use crate::potential::PotentialField;
use crate::radius::{HarmonicIndex, RadiusModel};

/// Default grid resolution per axis
pub const DEFAULT_RESOLUTION: usize = 100;

/// Default half-width of the grid in units of the target radius
pub const DEFAULT_EXTENT_FACTOR: f64 = 1.5;

/// Default quiver subsampling stride
pub const DEFAULT_QUIVER_STRIDE: usize = 5;

/// One arrow of the quiver overlay
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuiverArrow {
    pub x: f64,
    pub y: f64,
    pub u: f64,
    pub v: f64,
}

/// Potential sampled on a square Cartesian grid
///
/// Values are stored row-major: row `i` has `y = axis[i]`, column `j` has
/// `x = axis[j]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldGrid {
    pub target_index: HarmonicIndex,
    pub target_radius_km: f64,
    pub central_radius_km: f64,
    pub resolution: usize,
    axis: Vec<f64>,
    values: Vec<f64>,
    u: Vec<f64>,
    v: Vec<f64>,
}

impl FieldGrid {
    /// Sample the field of attractor `target` on a `resolution²` grid
    /// spanning `±extent_factor * radius(target)` on both axes
    pub fn sample(
        model: &RadiusModel,
        config: FieldConfig,
        target: HarmonicIndex,
        resolution: usize,
        extent_factor: f64,
    ) -> Result<Self> {
        if resolution < 2 {
            return Err(DriftError::invalid_input(
                "resolution",
                format!("{resolution} is below the minimum of 2"),
            ));
        }
        if !extent_factor.is_finite() || extent_factor <= 0.0 {
            return Err(DriftError::invalid_input(
                "extent_factor",
                format!("{extent_factor} must be positive and finite"),
            ));
        }

        let field = PotentialField::new(model, &[target], config);
        let target_radius_km = model.radius(target);
        let half_width = extent_factor * target_radius_km;
        if !half_width.is_finite() {
            return Err(DriftError::invalid_input(
                "target",
                format!("radius of harmonic {target} is not finite"),
            ));
        }

        let step = 2.0 * half_width / (resolution - 1) as f64;
        let mut axis: Vec<f64> = (0..resolution).map(|i| -half_width + step * i as f64).collect();
        axis[resolution - 1] = half_width;

        let mut values = Vec::with_capacity(resolution * resolution);
        for &y in &axis {
            for &x in &axis {
                values.push(field.potential(x.hypot(y)));
            }
        }

        let (d_rows, d_cols) = array_gradient(&values, resolution);
        let u = d_cols.into_iter().map(|g| -g).collect();
        let v = d_rows.into_iter().map(|g| -g).collect();

        tracing::debug!(harmonic = target, resolution, half_width, "sampled collector field");

        Ok(Self {
            target_index: target,
            target_radius_km,
            central_radius_km: model.constants().central_radius_km,
            resolution,
            axis,
            values,
            u,
            v,
        })
    }

    /// Sample with the default resolution and extent
    pub fn sample_default(model: &RadiusModel, config: FieldConfig, target: HarmonicIndex) -> Result<Self> {
        Self::sample(model, config, target, DEFAULT_RESOLUTION, DEFAULT_EXTENT_FACTOR)
    }

    /// Shared x / y coordinates
    pub fn axis(&self) -> &[f64] {
        &self.axis
    }

    /// Row-major potential values
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Potential at grid row `row` (y) and column `col` (x)
    pub fn value(&self, row: usize, col: usize) -> Option<f64> {
        if row < self.resolution && col < self.resolution {
            Some(self.values[row * self.resolution + col])
        } else {
            None
        }
    }

    /// Largest sampled value
    pub fn max_value(&self) -> f64 {
        self.values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Every `stride`-th row and column of the quiver field
    pub fn quiver(&self, stride: usize) -> Vec<QuiverArrow> {
        let stride = stride.max(1);
        let n = self.resolution;
        let mut arrows = Vec::new();
        for row in (0..n).step_by(stride) {
            for col in (0..n).step_by(stride) {
                let idx = row * n + col;
                arrows.push(QuiverArrow {
                    x: self.axis[col],
                    y: self.axis[row],
                    u: self.u[idx],
                    v: self.v[idx],
                });
            }
        }
        arrows
    }
}

/// Gradient of a square row-major array along rows and along columns
fn array_gradient(values: &[f64], n: usize) -> (Vec<f64>, Vec<f64>) {
    let at = |r: usize, c: usize| values[r * n + c];
    let diff = |lo: f64, hi: f64, span: usize| (hi - lo) / span as f64;

    let mut d_rows = vec![0.0; n * n];
    let mut d_cols = vec![0.0; n * n];
    for r in 0..n {
        for c in 0..n {
            let (r_lo, r_hi) = (r.saturating_sub(1), (r + 1).min(n - 1));
            let (c_lo, c_hi) = (c.saturating_sub(1), (c + 1).min(n - 1));
            d_rows[r * n + c] = diff(at(r_lo, c), at(r_hi, c), r_hi - r_lo);
            d_cols[r * n + c] = diff(at(r, c_lo), at(r, c_hi), c_hi - c_lo);
        }
    }
    (d_rows, d_cols)
}
