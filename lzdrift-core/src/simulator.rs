//! Particle drift simulation.
//!
//! Each particle starts at rest at its initial radius and is integrated
//! independently across a uniform time grid. A failure for any particle
//! fails the whole run.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::DriftConfig;
use crate::dynamics::DriftDynamics;
use crate::error::{DriftError, Result};
use crate::integrator::{self, Integrator, State};
use crate::potential::PotentialField;
use crate::radius::{HarmonicIndex, RadiusModel};

/// One sample of a trajectory
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrajectorySample {
    pub time: f64,
    pub position: f64,
    pub velocity: f64,
}

/// Sampled motion of a single particle
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub particle: usize,
    samples: Vec<TrajectorySample>,
}

impl Trajectory {
    fn from_states(particle: usize, times: &[f64], states: Vec<State>) -> Self {
        let samples = times
            .iter()
            .zip(states)
            .map(|(&time, [position, velocity])| TrajectorySample {
                time,
                position,
                velocity,
            })
            .collect();
        Self { particle, samples }
    }

    pub fn samples(&self) -> &[TrajectorySample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn first(&self) -> Option<&TrajectorySample> {
        self.samples.first()
    }

    pub fn last(&self) -> Option<&TrajectorySample> {
        self.samples.last()
    }

    pub fn times(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.time).collect()
    }

    pub fn positions(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.position).collect()
    }

    pub fn velocities(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.velocity).collect()
    }
}

/// Trajectories keyed by particle id (position in the input list)
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrajectorySet {
    trajectories: BTreeMap<usize, Trajectory>,
}

impl TrajectorySet {
    pub fn len(&self) -> usize {
        self.trajectories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trajectories.is_empty()
    }

    pub fn get(&self, particle: usize) -> Option<&Trajectory> {
        self.trajectories.get(&particle)
    }

    /// Trajectories in ascending particle id
    pub fn iter(&self) -> impl Iterator<Item = &Trajectory> {
        self.trajectories.values()
    }
}

impl FromIterator<Trajectory> for TrajectorySet {
    fn from_iter<I: IntoIterator<Item = Trajectory>>(iter: I) -> Self {
        Self {
            trajectories: iter.into_iter().map(|t| (t.particle, t)).collect(),
        }
    }
}

/// `num_points` evenly spaced samples over `[0, time_span]`
///
/// The last sample is exactly `time_span`; a single point yields `[0]`.
pub fn time_grid(time_span: f64, num_points: usize) -> Result<Vec<f64>> {
    if !time_span.is_finite() {
        return Err(DriftError::invalid_input(
            "time_span",
            format!("{time_span} is not finite"),
        ));
    }
    if time_span < 0.0 {
        return Err(DriftError::invalid_input(
            "time_span",
            format!("{time_span} must not be negative"),
        ));
    }
    match num_points {
        0 => Err(DriftError::invalid_input("num_points", "must be at least 1")),
        1 => Ok(vec![0.0]),
        n => {
            let last = (n - 1) as f64;
            let mut grid: Vec<f64> = (0..n).map(|i| time_span * (i as f64 / last)).collect();
            grid[n - 1] = time_span;
            Ok(grid)
        }
    }
}

/// Drives [`DriftDynamics`] for a batch of particles
pub struct TrajectorySimulator {
    config: DriftConfig,
    model: RadiusModel,
    integrator: Box<dyn Integrator>,
}

impl TrajectorySimulator {
    /// Create a simulator; fails if `config` does not validate
    pub fn new(config: DriftConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            model: RadiusModel::new(config.model),
            integrator: integrator::from_config(&config.integrator),
            config,
        })
    }

    pub fn config(&self) -> &DriftConfig {
        &self.config
    }

    pub fn model(&self) -> &RadiusModel {
        &self.model
    }

    pub fn integrator_name(&self) -> &'static str {
        self.integrator.name()
    }

    /// Dynamics for a given attractor list
    pub fn dynamics(&self, attractor_indices: &[HarmonicIndex]) -> DriftDynamics {
        let field = PotentialField::new(&self.model, attractor_indices, self.config.field);
        DriftDynamics::new(field, self.config.dynamics)
    }

    /// Simulate on the configured time grid
    pub fn run(
        &self,
        initial_radii: &[f64],
        attractor_indices: &[HarmonicIndex],
    ) -> Result<TrajectorySet> {
        let sim = &self.config.simulation;
        self.simulate(initial_radii, attractor_indices, sim.time_span, sim.num_points)
    }

    /// Simulate every particle over `num_points` samples of `[0, time_span]`
    pub fn simulate(
        &self,
        initial_radii: &[f64],
        attractor_indices: &[HarmonicIndex],
        time_span: f64,
        num_points: usize,
    ) -> Result<TrajectorySet> {
        let grid = time_grid(time_span, num_points)?;
        if let Some((particle, r0)) = initial_radii
            .iter()
            .enumerate()
            .find(|(_, r)| !r.is_finite())
        {
            return Err(DriftError::invalid_input(
                format!("initial_radii[{particle}]"),
                format!("{r0} is not finite"),
            ));
        }

        let dynamics = self.dynamics(attractor_indices);
        tracing::info!(
            particles = initial_radii.len(),
            attractors = attractor_indices.len(),
            samples = grid.len(),
            integrator = self.integrator.name(),
            parallel = self.config.simulation.parallel,
            "simulating drift"
        );

        let trajectories = if self.config.simulation.parallel && initial_radii.len() > 1 {
            self.simulate_parallel(&dynamics, initial_radii, &grid)?
        } else {
            initial_radii
                .iter()
                .enumerate()
                .map(|(particle, &r0)| self.integrate_particle(&dynamics, particle, r0, &grid))
                .collect::<Result<Vec<_>>>()?
        };

        Ok(trajectories.into_iter().collect())
    }

    fn simulate_parallel(
        &self,
        dynamics: &DriftDynamics,
        initial_radii: &[f64],
        grid: &[f64],
    ) -> Result<Vec<Trajectory>> {
        let joined = crossbeam::thread::scope(|scope| {
            let handles: Vec<_> = initial_radii
                .iter()
                .enumerate()
                .map(|(particle, &r0)| {
                    let handle =
                        scope.spawn(move |_| self.integrate_particle(dynamics, particle, r0, grid));
                    (particle, handle)
                })
                .collect();

            handles
                .into_iter()
                .map(|(particle, handle)| {
                    handle.join().unwrap_or_else(|_| {
                        Err(DriftError::IntegrationFailure {
                            particle,
                            time: 0.0,
                            reason: "worker thread panicked".to_string(),
                        })
                    })
                })
                .collect::<Result<Vec<_>>>()
        });

        joined.unwrap_or_else(|_| {
            Err(DriftError::IntegrationFailure {
                particle: 0,
                time: 0.0,
                reason: "worker scope panicked".to_string(),
            })
        })
    }

    fn integrate_particle(
        &self,
        dynamics: &DriftDynamics,
        particle: usize,
        r0: f64,
        grid: &[f64],
    ) -> Result<Trajectory> {
        let states = self
            .integrator
            .integrate(dynamics, [r0, 0.0], grid)
            .map_err(|failure| {
                tracing::warn!(particle, time = failure.time, "integration failed: {}", failure.reason);
                DriftError::IntegrationFailure {
                    particle,
                    time: failure.time,
                    reason: failure.reason,
                }
            })?;

        let trajectory = Trajectory::from_states(particle, grid, states);
        if let Some(end) = trajectory.last() {
            tracing::debug!(
                particle,
                initial = r0,
                final_position = end.position,
                final_velocity = end.velocity,
                "particle integrated"
            );
        }
        Ok(trajectory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DriftSign, IntegratorConfig};
    use approx::assert_relative_eq;

    fn simulator() -> TrajectorySimulator {
        TrajectorySimulator::new(DriftConfig::default()).unwrap()
    }

    #[test]
    fn test_time_grid() {
        let grid = time_grid(100.0, 1000).unwrap();
        assert_eq!(grid.len(), 1000);
        assert_eq!(grid[0], 0.0);
        assert_eq!(grid[999], 100.0);
        assert!(grid.windows(2).all(|w| w[1] > w[0]));
        assert_relative_eq!(grid[1], 100.0 / 999.0);

        assert_eq!(time_grid(5.0, 1).unwrap(), vec![0.0]);
        assert_eq!(time_grid(0.0, 3).unwrap(), vec![0.0; 3]);
    }

    #[test]
    fn test_time_grid_rejects_bad_input() {
        assert_eq!(time_grid(f64::NAN, 10).unwrap_err().error_code(), "INVALID_INPUT");
        assert!(time_grid(f64::INFINITY, 10).is_err());
        assert!(time_grid(-1.0, 10).is_err());
        assert!(time_grid(1.0, 0).is_err());
    }

    #[test]
    fn test_reference_run_shape() {
        let sim = simulator();
        let r0 = sim.model().radius(2) * 1.2;
        let set = sim.simulate(&[r0], &[3, 5, 7], 100.0, 1000).unwrap();

        assert_eq!(set.len(), 1);
        let trajectory = set.get(0).unwrap();
        assert_eq!(trajectory.len(), 1000);
        let first = trajectory.first().unwrap();
        assert_eq!(first.time, 0.0);
        assert_eq!(first.position, r0);
        assert_eq!(first.velocity, 0.0);
        assert_eq!(trajectory.last().unwrap().time, 100.0);
    }

    #[test]
    fn test_non_finite_radius_rejected() {
        let sim = simulator();
        let err = sim
            .simulate(&[12_000.0, f64::NAN], &[3], 10.0, 10)
            .unwrap_err();
        assert!(matches!(err, DriftError::InvalidInput { ref field, .. } if field == "initial_radii[1]"));
    }

    #[test]
    fn test_empty_inputs() {
        let sim = simulator();
        assert!(sim.simulate(&[], &[3], 10.0, 10).unwrap().is_empty());

        // With no attractors only damping acts on a particle at rest.
        let set = sim.simulate(&[9_000.0], &[], 10.0, 11).unwrap();
        assert!(set.get(0).unwrap().positions().iter().all(|&p| p == 9_000.0));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let sequential = simulator();
        let parallel =
            TrajectorySimulator::new(DriftConfig::builder().parallel(true).build().unwrap())
                .unwrap();
        let model = sequential.model();
        let radii = [
            model.radius(3) + 4.0,
            model.radius(5) - 6.0,
            model.radius(7) + 1.5,
        ];

        let a = sequential.simulate(&radii, &[3, 5, 7], 20.0, 101).unwrap();
        let b = parallel.simulate(&radii, &[3, 5, 7], 20.0, 101).unwrap();
        assert_eq!(a, b);
        assert_eq!(b.iter().map(|t| t.particle).collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn test_integration_failure_names_particle() {
        let config = DriftConfig::builder()
            .integrator(IntegratorConfig {
                max_steps: 1,
                initial_step: Some(1e-6),
                ..Default::default()
            })
            .drift_sign(DriftSign::Ascend)
            .build()
            .unwrap();
        let sim = TrajectorySimulator::new(config).unwrap();
        let r = sim.model().radius(5) + 3.0;
        let err = sim.simulate(&[r], &[5], 10.0, 3).unwrap_err();
        match err {
            DriftError::IntegrationFailure { particle, .. } => assert_eq!(particle, 0),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_run_uses_configured_grid() {
        let mut config = DriftConfig::default();
        config.simulation.time_span = 4.0;
        config.simulation.num_points = 5;
        let sim = TrajectorySimulator::new(config).unwrap();
        let set = sim.run(&[10_000.0], &[2]).unwrap();
        assert_eq!(set.get(0).unwrap().times(), vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_span_below_min_step() {
        let sim = simulator();
        let r = sim.model().radius(5) + 3.0;
        for span in [1e-13, 5e-13, 1e-12] {
            let set = sim.simulate(&[r], &[5], span, 3).unwrap();
            let last = set.get(0).unwrap().last().unwrap();
            assert_eq!(last.time, span);
            assert_relative_eq!(last.position, r, epsilon = 1e-9);
        }
    }
}
