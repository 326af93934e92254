//! ODE integration for two-component states.
//!
//! Provides:
//! - [`OdeSystem`]: right-hand side `dy/dt = f(t, y)`
//! - [`Integrator`]: sampling a solution on a caller-supplied time grid
//! - [`Rk4`]: classical Runge–Kutta with fixed substeps
//! - [`DormandPrince`]: adaptive 5(4) embedded pair with error control

pub mod dopri;
pub mod rk4;

pub use dopri::DormandPrince;
pub use rk4::Rk4;

use crate::config::{IntegrationMethod, IntegratorConfig};

/// `[position, velocity]`
pub type State = [f64; 2];

/// A first-order system `dy/dt = f(t, y)`
pub trait OdeSystem: Send + Sync {
    /// Evaluate `f(t, y)`
    fn derivatives(&self, t: f64, state: &State) -> State;
}

/// Why an integration stopped early
#[derive(Clone, Debug, PartialEq)]
pub struct StepFailure {
    /// Last time the solution was known to be valid
    pub time: f64,
    pub reason: String,
}

impl StepFailure {
    pub fn new(time: f64, reason: impl Into<String>) -> Self {
        Self {
            time,
            reason: reason.into(),
        }
    }
}

/// Integrates an [`OdeSystem`] across a time grid
pub trait Integrator: Send + Sync {
    /// Short name for logs and reports
    fn name(&self) -> &'static str;

    /// Solve from `initial` at `times[0]`, returning one state per entry of
    /// `times`. The first returned state is `initial` unchanged. `times` must
    /// be non-decreasing.
    fn integrate(
        &self,
        system: &dyn OdeSystem,
        initial: State,
        times: &[f64],
    ) -> Result<Vec<State>, StepFailure>;
}

/// Build the integrator selected by `config`
pub fn from_config(config: &IntegratorConfig) -> Box<dyn Integrator> {
    match config.method {
        IntegrationMethod::Adaptive => Box::new(DormandPrince::from_config(config)),
        IntegrationMethod::FixedStep => Box::new(Rk4::new(config.fixed_substeps)),
    }
}

#[inline]
pub(crate) fn is_finite(state: &State) -> bool {
    state.iter().all(|v| v.is_finite())
}

#[inline]
pub(crate) fn axpy(y: &State, h: f64, k: &State) -> State {
    [y[0] + h * k[0], y[1] + h * k[1]]
}

#[cfg(test)]
pub(crate) mod test_systems {
    use super::*;

    /// Undamped harmonic oscillator `x'' = -ω² x`
    pub struct Oscillator {
        pub omega: f64,
    }

    impl OdeSystem for Oscillator {
        fn derivatives(&self, _t: f64, y: &State) -> State {
            [y[1], -self.omega * self.omega * y[0]]
        }
    }

    /// Exponential decay in both components
    pub struct Decay {
        pub rate: f64,
    }

    impl OdeSystem for Decay {
        fn derivatives(&self, _t: f64, y: &State) -> State {
            [-self.rate * y[0], -self.rate * y[1]]
        }
    }

    /// `x' = x²`, blows up at t = 1/x0
    pub struct BlowUp;

    impl OdeSystem for BlowUp {
        fn derivatives(&self, _t: f64, y: &State) -> State {
            [y[0] * y[0], 0.0]
        }
    }

    pub fn grid(end: f64, n: usize) -> Vec<f64> {
        (0..n).map(|i| end * i as f64 / (n - 1) as f64).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::test_systems::*;
    use super::*;

    #[test]
    fn test_from_config_selects_method() {
        let adaptive = from_config(&IntegratorConfig::default());
        assert_eq!(adaptive.name(), "dormand-prince");

        let fixed = from_config(&IntegratorConfig::fixed_step(8));
        assert_eq!(fixed.name(), "rk4");
    }

    #[test]
    fn test_methods_agree_on_oscillator() {
        let system = Oscillator { omega: 1.0 };
        let times = grid(10.0, 101);
        let adaptive = from_config(&IntegratorConfig::default())
            .integrate(&system, [1.0, 0.0], &times)
            .unwrap();
        let fixed = from_config(&IntegratorConfig::fixed_step(20))
            .integrate(&system, [1.0, 0.0], &times)
            .unwrap();
        for (a, b) in adaptive.iter().zip(&fixed) {
            assert!((a[0] - b[0]).abs() < 1e-6);
            assert!((a[1] - b[1]).abs() < 1e-6);
        }
    }
}
