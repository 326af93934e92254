//! Drift equations of motion.
//!
//! A particle at radius `x` with radial velocity `v` obeys
//!
//! ```text
//! x' = v
//! v' = s * dV/dx - c * v
//! ```
//!
//! where `V` is the resonance potential, `dV/dx` its central difference,
//! `c` the damping coefficient and `s = -1` for the reference convention
//! (`s = +1` with [`DriftSign::Ascend`]). The system is autonomous; the time
//! argument exists only for the solver interface.

use crate::config::{DriftSign, DynamicsConfig};
use crate::integrator::{OdeSystem, State};
use crate::potential::PotentialField;

/// Right-hand side of the drift ODE
#[derive(Clone, Debug)]
pub struct DriftDynamics {
    field: PotentialField,
    config: DynamicsConfig,
}

impl DriftDynamics {
    pub fn new(field: PotentialField, config: DynamicsConfig) -> Self {
        Self { field, config }
    }

    pub fn field(&self) -> &PotentialField {
        &self.field
    }

    pub fn config(&self) -> &DynamicsConfig {
        &self.config
    }

    /// Potential gradient at `position`
    pub fn gradient(&self, position: f64) -> f64 {
        self.field.gradient(position, self.config.gradient_step)
    }

    /// `[velocity, acceleration]` for `state = [position, velocity]`
    pub fn acceleration(&self, state: &State, _time: f64) -> State {
        let [position, velocity] = *state;
        let damping = -self.config.damping * velocity;
        let force = self.config.drift_sign.factor() * self.gradient(position);
        [velocity, force + damping]
    }

    /// Kinetic energy plus the effective potential energy
    ///
    /// Without damping this is conserved up to the finite-difference error
    /// of the gradient; with damping it never increases.
    pub fn energy(&self, state: &State) -> f64 {
        let [position, velocity] = *state;
        let potential_energy = match self.config.drift_sign {
            DriftSign::Descend => self.field.potential(position),
            DriftSign::Ascend => -self.field.potential(position),
        };
        0.5 * velocity * velocity + potential_energy
    }
}

impl OdeSystem for DriftDynamics {
    fn derivatives(&self, t: f64, state: &State) -> State {
        self.acceleration(state, t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FieldConfig;
    use crate::radius::RadiusModel;
    use approx::assert_relative_eq;

    fn dynamics(sign: DriftSign, indices: &[i32]) -> (RadiusModel, DriftDynamics) {
        let model = RadiusModel::default();
        let field = PotentialField::new(&model, indices, FieldConfig::default());
        let config = DynamicsConfig {
            drift_sign: sign,
            ..Default::default()
        };
        (model, DriftDynamics::new(field, config))
    }

    #[test]
    fn test_velocity_passthrough_and_damping() {
        let (_, dynamics) = dynamics(DriftSign::Descend, &[]);
        let derivative = dynamics.acceleration(&[12_000.0, 3.0], 0.0);
        assert_eq!(derivative[0], 3.0);
        assert_relative_eq!(derivative[1], -0.3, epsilon = 1e-15);
    }

    #[test]
    fn test_reference_sign_pushes_downhill() {
        let (model, dynamics) = dynamics(DriftSign::Descend, &[5]);
        let r_a = model.radius(5);
        // Below the peak the slope is positive, so the force points inward.
        let below = dynamics.acceleration(&[r_a - 5.0, 0.0], 0.0);
        let above = dynamics.acceleration(&[r_a + 5.0, 0.0], 0.0);
        assert!(below[1] < 0.0);
        assert!(above[1] > 0.0);
    }

    #[test]
    fn test_ascend_sign_pushes_uphill() {
        let (model, dynamics) = dynamics(DriftSign::Ascend, &[5]);
        let r_a = model.radius(5);
        assert!(dynamics.acceleration(&[r_a - 5.0, 0.0], 0.0)[1] > 0.0);
        assert!(dynamics.acceleration(&[r_a + 5.0, 0.0], 0.0)[1] < 0.0);
    }

    #[test]
    fn test_autonomous() {
        let (model, dynamics) = dynamics(DriftSign::Descend, &[3, 5, 7]);
        let state = [model.radius(3) + 2.5, -0.4];
        assert_eq!(
            dynamics.derivatives(0.0, &state),
            dynamics.derivatives(1e6, &state)
        );
    }

    #[test]
    fn test_gradient_matches_central_difference() {
        let (model, dynamics) = dynamics(DriftSign::Descend, &[4]);
        let x = model.radius(4) + 3.0;
        let field = dynamics.field();
        let expected = (field.potential(x + 1.0) - field.potential(x - 1.0)) / 2.0;
        assert_eq!(dynamics.gradient(x), expected);
        assert_eq!(dynamics.acceleration(&[x, 0.0], 0.0)[1], -expected);
    }

    #[test]
    fn test_energy_sign_convention() {
        let (model, descend) = dynamics(DriftSign::Descend, &[2]);
        let (_, ascend) = dynamics(DriftSign::Ascend, &[2]);
        let state = [model.radius(2), 1.0];
        assert_relative_eq!(descend.energy(&state), 1.5);
        assert_relative_eq!(ascend.energy(&state), -0.5);
    }
}
