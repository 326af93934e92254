//! Data products consumed by plotting front ends.
//!
//! Nothing here renders anything; these are the tables and envelopes a
//! renderer reads.

use std::ops::RangeInclusive;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::DriftConfig;
use crate::constants;
use crate::error::Result;
use crate::field::{FieldGrid, QuiverArrow, DEFAULT_EXTENT_FACTOR, DEFAULT_QUIVER_STRIDE, DEFAULT_RESOLUTION};
use crate::radius::{AttractorSet, HarmonicIndex, RadiusModel};
use crate::simulator::{TrajectorySet, TrajectorySimulator};

/// One row of the attractor map
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttractorEntry {
    pub index: HarmonicIndex,
    pub radius_km: f64,
    /// Radius in thousands of km, as drawn on the bar chart
    pub radius_thousand_km: f64,
}

/// Predicted radii for a range of harmonic indices plus plot reference data
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttractorMap {
    pub entries: Vec<AttractorEntry>,
    pub central_radius_km: f64,
    pub reference_orbit_km: f64,
    /// Radius of the body drawn on the reference orbit
    pub reference_body_radius_km: f64,
    /// Half-width of a plot that fits every ring with a 10% margin
    pub extent_km: f64,
}

impl AttractorMap {
    pub fn build(model: &RadiusModel, indices: RangeInclusive<HarmonicIndex>) -> Self {
        let entries: Vec<AttractorEntry> = indices
            .map(|index| {
                let radius_km = model.radius(index);
                AttractorEntry {
                    index,
                    radius_km,
                    radius_thousand_km: radius_km / 1000.0,
                }
            })
            .collect();
        let max_radius = entries
            .iter()
            .map(|e| e.radius_km)
            .fold(0.0_f64, f64::max);

        Self {
            entries,
            central_radius_km: model.constants().central_radius_km,
            reference_orbit_km: constants::MOON_ORBIT_KM,
            reference_body_radius_km: constants::R_MOON_KM,
            extent_km: max_radius * 1.1,
        }
    }

    pub fn get(&self, index: HarmonicIndex) -> Option<&AttractorEntry> {
        self.entries.iter().find(|e| e.index == index)
    }

    /// Human-readable table, one line per index
    pub fn render_table(&self) -> String {
        let mut out = String::from("Predicted stable orbital radii:\n");
        for entry in &self.entries {
            out.push_str(&format!(
                "Step {:2} → Radius = {} km\n",
                entry.index,
                format_thousands(entry.radius_km, 2)
            ));
        }
        out
    }
}

/// Format `value` with `decimals` fractional digits and comma separators
pub fn format_thousands(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let formatted = format!("{:.*}", decimals, value.abs());
    let (integer, fraction) = match formatted.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (i, digit) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 && formatted.chars().any(|c| c != '0' && c != '.') {
        "-"
    } else {
        ""
    };
    match fraction {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}

/// Flat (particle, time, radius, velocity) row
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DriftRecord {
    pub particle: usize,
    pub time: f64,
    pub radius: f64,
    pub velocity: f64,
}

/// Particle-major, time-ascending rows for every trajectory
pub fn drift_records(set: &TrajectorySet) -> Vec<DriftRecord> {
    set.iter()
        .flat_map(|trajectory| {
            trajectory.samples().iter().map(move |s| DriftRecord {
                particle: trajectory.particle,
                time: s.time,
                radius: s.position,
                velocity: s.velocity,
            })
        })
        .collect()
}

/// End state of one particle relative to the attractors
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DriftSummary {
    pub particle: usize,
    pub initial_radius_km: f64,
    pub final_radius_km: f64,
    pub final_velocity: f64,
    pub net_drift_km: f64,
    pub nearest_attractor: Option<HarmonicIndex>,
    pub distance_to_nearest_km: Option<f64>,
}

/// Summaries in ascending particle id
pub fn drift_summaries(set: &TrajectorySet, attractors: &AttractorSet) -> Vec<DriftSummary> {
    set.iter()
        .filter_map(|trajectory| {
            let first = trajectory.first()?;
            let last = trajectory.last()?;
            let nearest = attractors.nearest(last.position);
            Some(DriftSummary {
                particle: trajectory.particle,
                initial_radius_km: first.position,
                final_radius_km: last.position,
                final_velocity: last.velocity,
                net_drift_km: last.position - first.position,
                nearest_attractor: nearest.map(|(a, _)| a.index),
                distance_to_nearest_km: nearest.map(|(_, d)| d),
            })
        })
        .collect()
}

/// Provenance envelope around any exported payload
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunReport<T> {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub version: String,
    pub config_digest: String,
    pub config: DriftConfig,
    pub payload: T,
}

impl<T: Serialize> RunReport<T> {
    pub fn new(config: &DriftConfig, payload: T) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            version: crate::VERSION.to_string(),
            config_digest: config.digest(),
            config: *config,
            payload,
        }
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// The demonstration scenario: attractor map, four drifting particles and
/// the collector field around one attractor
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub map_indices: (HarmonicIndex, HarmonicIndex),
    pub attractor_indices: Vec<HarmonicIndex>,
    /// `(harmonic index, scale)`: particle starts at `scale * radius(index)`
    pub particle_seeds: Vec<(HarmonicIndex, f64)>,
    pub collector_target: HarmonicIndex,
    pub field_resolution: usize,
    pub field_extent: f64,
    pub quiver_stride: usize,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            map_indices: (1, 10),
            attractor_indices: vec![3, 5, 7],
            particle_seeds: vec![(2, 1.2), (4, 0.9), (6, 1.1), (8, 0.95)],
            collector_target: 5,
            field_resolution: DEFAULT_RESOLUTION,
            field_extent: DEFAULT_EXTENT_FACTOR,
            quiver_stride: DEFAULT_QUIVER_STRIDE,
        }
    }
}

/// Everything the scenario produces
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScenarioOutput {
    pub attractor_map: AttractorMap,
    pub attractors: AttractorSet,
    pub summaries: Vec<DriftSummary>,
    pub records: Vec<DriftRecord>,
    pub field: FieldGrid,
    pub quiver: Vec<QuiverArrow>,
}

impl Scenario {
    /// Initial radii derived from the particle seeds
    pub fn initial_radii(&self, model: &RadiusModel) -> Vec<f64> {
        self.particle_seeds
            .iter()
            .map(|&(index, scale)| model.radius(index) * scale)
            .collect()
    }

    /// Run every stage with `config`
    pub fn run(&self, config: &DriftConfig) -> Result<ScenarioOutput> {
        let simulator = TrajectorySimulator::new(*config)?;
        let model = simulator.model();

        let attractor_map = AttractorMap::build(model, self.map_indices.0..=self.map_indices.1);
        let attractors = model.attractors(&self.attractor_indices);
        let trajectories = simulator.run(&self.initial_radii(model), &self.attractor_indices)?;
        let field = FieldGrid::sample(
            model,
            config.field,
            self.collector_target,
            self.field_resolution,
            self.field_extent,
        )?;

        tracing::info!(
            particles = trajectories.len(),
            map_entries = attractor_map.entries.len(),
            "scenario complete"
        );

        Ok(ScenarioOutput {
            summaries: drift_summaries(&trajectories, &attractors),
            records: drift_records(&trajectories),
            quiver: field.quiver(self.quiver_stride),
            attractor_map,
            attractors,
            field,
        })
    }
}
