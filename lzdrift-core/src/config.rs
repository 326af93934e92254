//! Configuration for the drift pipeline
//!
//! All constants that shape the model live here instead of in module-level
//! globals. `DriftConfig::default()` reproduces the reference constants, and
//! every section deserializes with per-field defaults so a partial JSON file
//! only overrides what it names.

use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::constants;
use crate::error::{DriftError, Result};

/// Default relative/absolute tolerance of the adaptive integrator
pub const DEFAULT_TOLERANCE: f64 = 1.49012e-8;

/// Geometric constants of the radius model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConstants {
    /// Radius of the central body (km)
    pub central_radius_km: f64,
    /// Exponential scaling constant
    pub lz: f64,
    /// Number of harmonic steps in one modulation octave
    pub octave_period: u32,
    /// Amplitude of the sinusoidal modulation
    pub modulation_amplitude: f64,
}

impl Default for ModelConstants {
    fn default() -> Self {
        Self {
            central_radius_km: constants::R_EARTH_KM,
            lz: constants::LZ,
            octave_period: constants::OCTAVE_PERIOD,
            modulation_amplitude: 0.1,
        }
    }
}

/// Shape of the resonance potential bumps
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    /// Coefficient of the squared distance in `1 / (1 + k * d^2)`
    pub sharpness: f64,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self { sharpness: 0.01 }
    }
}

/// Direction in which the potential gradient pushes a particle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftSign {
    /// Acceleration is `-gradient`: particles roll toward lower potential
    #[default]
    Descend,
    /// Acceleration is `+gradient`: particles climb toward attractor radii
    Ascend,
}

impl DriftSign {
    /// Multiplier applied to the gradient
    pub fn factor(self) -> f64 {
        match self {
            DriftSign::Descend => -1.0,
            DriftSign::Ascend => 1.0,
        }
    }
}

/// Parameters of the drift ODE
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DynamicsConfig {
    /// Linear velocity damping coefficient
    pub damping: f64,
    /// Step used by the central-difference gradient (km)
    pub gradient_step: f64,
    /// Sign convention for the gradient force
    pub drift_sign: DriftSign,
}

impl Default for DynamicsConfig {
    fn default() -> Self {
        Self {
            damping: 0.1,
            gradient_step: 1.0,
            drift_sign: DriftSign::Descend,
        }
    }
}

/// Integration scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationMethod {
    /// Dormand–Prince 5(4) with error control
    #[default]
    Adaptive,
    /// Classical RK4 with a fixed number of substeps per output interval
    FixedStep,
}

/// Integrator selection and tolerances
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegratorConfig {
    /// Integration scheme
    pub method: IntegrationMethod,
    /// Relative tolerance (adaptive only)
    pub rtol: f64,
    /// Absolute tolerance (adaptive only)
    pub atol: f64,
    /// First trial step; chosen automatically when `None`
    pub initial_step: Option<f64>,
    /// Smallest step before the adaptive integrator gives up
    pub min_step: f64,
    /// Largest step the adaptive integrator may take
    pub max_step: Option<f64>,
    /// Step budget per output interval (adaptive only)
    pub max_steps: usize,
    /// Equal substeps per output interval (fixed-step only)
    pub fixed_substeps: usize,
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        Self {
            method: IntegrationMethod::Adaptive,
            rtol: DEFAULT_TOLERANCE,
            atol: DEFAULT_TOLERANCE,
            initial_step: None,
            min_step: 1e-12,
            max_step: None,
            max_steps: 500,
            fixed_substeps: 10,
        }
    }
}

impl IntegratorConfig {
    /// Fixed-step RK4 with `substeps` steps between output samples
    pub fn fixed_step(substeps: usize) -> Self {
        Self {
            method: IntegrationMethod::FixedStep,
            fixed_substeps: substeps,
            ..Default::default()
        }
    }
}

/// Time grid and execution options for a simulation run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// End of the time grid (arbitrary units)
    pub time_span: f64,
    /// Number of samples on the grid, both ends included
    pub num_points: usize,
    /// Integrate particles on worker threads
    pub parallel: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            time_span: 100.0,
            num_points: 1000,
            parallel: false,
        }
    }
}

/// Complete pipeline configuration
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftConfig {
    pub model: ModelConstants,
    pub field: FieldConfig,
    pub dynamics: DynamicsConfig,
    pub integrator: IntegratorConfig,
    pub simulation: SimulationConfig,
}

impl DriftConfig {
    /// Create a new configuration builder
    pub fn builder() -> DriftConfigBuilder {
        DriftConfigBuilder::default()
    }

    /// Parse a (possibly partial) JSON configuration and validate it
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: DriftConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| DriftError::Io {
            message: format!("failed to read '{}': {}", path.display(), e),
        })?;
        Self::from_json_str(&content)
    }

    /// Check every value the numeric core relies on
    pub fn validate(&self) -> Result<()> {
        positive_finite("model.central_radius_km", self.model.central_radius_km)?;
        positive_finite("model.lz", self.model.lz)?;
        if self.model.octave_period == 0 {
            return Err(DriftError::invalid_config(
                "model.octave_period",
                "must be at least 1",
            ));
        }
        finite("model.modulation_amplitude", self.model.modulation_amplitude)?;
        positive_finite("field.sharpness", self.field.sharpness)?;
        non_negative_finite("dynamics.damping", self.dynamics.damping)?;
        positive_finite("dynamics.gradient_step", self.dynamics.gradient_step)?;

        let integrator = &self.integrator;
        positive_finite("integrator.rtol", integrator.rtol)?;
        positive_finite("integrator.atol", integrator.atol)?;
        positive_finite("integrator.min_step", integrator.min_step)?;
        if let Some(h) = integrator.initial_step {
            positive_finite("integrator.initial_step", h)?;
            at_least_min_step("integrator.initial_step", h, integrator.min_step)?;
        }
        if let Some(h) = integrator.max_step {
            positive_finite("integrator.max_step", h)?;
            at_least_min_step("integrator.max_step", h, integrator.min_step)?;
        }
        if integrator.max_steps == 0 {
            return Err(DriftError::invalid_config(
                "integrator.max_steps",
                "must be at least 1",
            ));
        }
        if integrator.fixed_substeps == 0 {
            return Err(DriftError::invalid_config(
                "integrator.fixed_substeps",
                "must be at least 1",
            ));
        }

        non_negative_finite("simulation.time_span", self.simulation.time_span)?;
        if self.simulation.num_points == 0 {
            return Err(DriftError::invalid_config(
                "simulation.num_points",
                "must be at least 1",
            ));
        }
        Ok(())
    }

    /// SHA-256 of the canonical JSON form, hex encoded
    pub fn digest(&self) -> String {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        hex::encode(Sha256::digest(&bytes))
    }
}

fn finite(field: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(DriftError::invalid_config(field, format!("{value} is not finite")))
    }
}

fn positive_finite(field: &str, value: f64) -> Result<()> {
    finite(field, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(DriftError::invalid_config(field, format!("{value} must be positive")))
    }
}

fn at_least_min_step(field: &str, value: f64, min_step: f64) -> Result<()> {
    if value >= min_step {
        Ok(())
    } else {
        Err(DriftError::invalid_config(
            field,
            format!("{value} is below integrator.min_step {min_step}"),
        ))
    }
}

fn non_negative_finite(field: &str, value: f64) -> Result<()> {
    finite(field, value)?;
    if value >= 0.0 {
        Ok(())
    } else {
        Err(DriftError::invalid_config(field, format!("{value} must not be negative")))
    }
}

/// Builder for DriftConfig
#[derive(Debug, Default)]
pub struct DriftConfigBuilder {
    model: Option<ModelConstants>,
    field: Option<FieldConfig>,
    dynamics: Option<DynamicsConfig>,
    integrator: Option<IntegratorConfig>,
    simulation: Option<SimulationConfig>,
}

impl DriftConfigBuilder {
    /// Set the radius model constants
    pub fn model(mut self, model: ModelConstants) -> Self {
        self.model = Some(model);
        self
    }

    /// Set the potential shape
    pub fn field(mut self, field: FieldConfig) -> Self {
        self.field = Some(field);
        self
    }

    /// Set the drift dynamics
    pub fn dynamics(mut self, dynamics: DynamicsConfig) -> Self {
        self.dynamics = Some(dynamics);
        self
    }

    /// Set the integrator
    pub fn integrator(mut self, integrator: IntegratorConfig) -> Self {
        self.integrator = Some(integrator);
        self
    }

    /// Set the time grid
    pub fn simulation(mut self, simulation: SimulationConfig) -> Self {
        self.simulation = Some(simulation);
        self
    }

    /// Set only the gradient sign convention
    pub fn drift_sign(mut self, sign: DriftSign) -> Self {
        let mut dynamics = self.dynamics.unwrap_or_default();
        dynamics.drift_sign = sign;
        self.dynamics = Some(dynamics);
        self
    }

    /// Toggle parallel particle integration
    pub fn parallel(mut self, enabled: bool) -> Self {
        let mut simulation = self.simulation.unwrap_or_default();
        simulation.parallel = enabled;
        self.simulation = Some(simulation);
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<DriftConfig> {
        let config = DriftConfig {
            model: self.model.unwrap_or_default(),
            field: self.field.unwrap_or_default(),
            dynamics: self.dynamics.unwrap_or_default(),
            integrator: self.integrator.unwrap_or_default(),
            simulation: self.simulation.unwrap_or_default(),
        };
        config.validate()?;
        Ok(config)
    }
}
