//! # LZ Drift Core
//!
//! Numerical model of harmonic orbital attractors around a central body.
//!
//! - **Radius model**: predicted attractor radii `R0 * LZ^n` modulated by a
//!   periodic octave term
//! - **Resonance potential**: a sum of Lorentzian-style bumps centred on
//!   chosen attractors
//! - **Drift dynamics**: a damped second-order ODE driven by the potential
//!   gradient
//! - **Trajectory simulation**: batch integration of many particles on a
//!   shared time grid, optionally in parallel
//!
//! ## Example
//!
//! ```rust
//! use lzdrift_core::{DriftConfig, TrajectorySimulator};
//!
//! let simulator = TrajectorySimulator::new(DriftConfig::default()).unwrap();
//! let model = simulator.model();
//!
//! // Two particles near the 3rd and 7th attractors
//! let radii = [model.radius(3) + 10.0, model.radius(7) - 10.0];
//! let trajectories = simulator.simulate(&radii, &[3, 5, 7], 10.0, 11).unwrap();
//!
//! assert_eq!(trajectories.len(), 2);
//! let last = trajectories.get(0).unwrap().last().unwrap();
//! assert_eq!(last.time, 10.0);
//! ```

pub mod config;
pub mod dynamics;
pub mod error;
pub mod field;
pub mod integrator;
pub mod potential;
pub mod radius;
pub mod report;
pub mod simulator;

// Re-export main types
pub use config::{
    DriftConfig, DriftConfigBuilder, DriftSign, DynamicsConfig, FieldConfig,
    IntegrationMethod, IntegratorConfig, ModelConstants, SimulationConfig,
};
pub use dynamics::DriftDynamics;
pub use error::{DriftError, ErrorCategory, Result};
pub use field::{FieldGrid, QuiverArrow};
pub use integrator::{DormandPrince, Integrator, OdeSystem, Rk4, State, StepFailure};
pub use potential::PotentialField;
pub use radius::{Attractor, AttractorSet, HarmonicIndex, RadiusModel};
pub use report::{
    AttractorEntry, AttractorMap, DriftRecord, DriftSummary, RunReport, Scenario,
    ScenarioOutput,
};
pub use simulator::{time_grid, Trajectory, TrajectorySample, TrajectorySet, TrajectorySimulator};

/// Crate version, stamped into exported reports
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Physical reference values
pub mod constants {
    /// Harmonic scaling ratio
    pub const LZ: f64 = 1.23498288;

    /// Mean Earth radius (km)
    pub const R_EARTH_KM: f64 = 6371.0;

    /// Mean Moon radius (km)
    pub const R_MOON_KM: f64 = 1737.4;

    /// Mean Earth–Moon distance (km)
    pub const MOON_ORBIT_KM: f64 = 384_400.0;

    /// Harmonic steps per octave
    pub const OCTAVE_PERIOD: u32 = 9;
}

/// Attractor radius for index `n` under the default constants
pub fn radius(n: HarmonicIndex) -> f64 {
    RadiusModel::default().radius(n)
}

/// Resonance potential at `r` for `attractor_indices` under the default
/// constants and sharpness
pub fn potential(r: f64, attractor_indices: &[HarmonicIndex]) -> f64 {
    PotentialField::new(&RadiusModel::default(), attractor_indices, FieldConfig::default()).potential(r)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_free_functions_use_defaults() {
        assert_relative_eq!(radius(1), 8373.826100369984, max_relative = 1e-12);
        assert_eq!(potential(radius(5), &[5]), 1.0);
        assert_eq!(potential(1.0e4, &[]), 0.0);
    }

    #[test]
    fn test_constants() {
        assert_eq!(ModelConstants::default().lz, constants::LZ);
        assert!(constants::R_MOON_KM < constants::R_EARTH_KM);
        assert!(!VERSION.is_empty());
    }
}
