//! Adaptive Dormand–Prince 5(4) integrator.
//!
//! The step size carries over between output intervals; the final step of
//! each interval is shortened so the solution lands exactly on the grid.

use super::{is_finite, Integrator, OdeSystem, State, StepFailure};
use crate::config::IntegratorConfig;

// Butcher tableau
const C2: f64 = 1.0 / 5.0;
const C3: f64 = 3.0 / 10.0;
const C4: f64 = 4.0 / 5.0;
const C5: f64 = 8.0 / 9.0;

const A21: f64 = 1.0 / 5.0;
const A31: f64 = 3.0 / 40.0;
const A32: f64 = 9.0 / 40.0;
const A41: f64 = 44.0 / 45.0;
const A42: f64 = -56.0 / 15.0;
const A43: f64 = 32.0 / 9.0;
const A51: f64 = 19372.0 / 6561.0;
const A52: f64 = -25360.0 / 2187.0;
const A53: f64 = 64448.0 / 6561.0;
const A54: f64 = -212.0 / 729.0;
const A61: f64 = 9017.0 / 3168.0;
const A62: f64 = -355.0 / 33.0;
const A63: f64 = 46732.0 / 5247.0;
const A64: f64 = 49.0 / 176.0;
const A65: f64 = -5103.0 / 18656.0;

// Fifth-order weights (also the last tableau row, FSAL)
const B1: f64 = 35.0 / 384.0;
const B3: f64 = 500.0 / 1113.0;
const B4: f64 = 125.0 / 192.0;
const B5: f64 = -2187.0 / 6784.0;
const B6: f64 = 11.0 / 84.0;

// Difference between fifth- and fourth-order weights
const E1: f64 = 71.0 / 57600.0;
const E3: f64 = -71.0 / 16695.0;
const E4: f64 = 71.0 / 1920.0;
const E5: f64 = -17253.0 / 339200.0;
const E6: f64 = 22.0 / 525.0;
const E7: f64 = -1.0 / 40.0;

const SAFETY: f64 = 0.9;
const MIN_FACTOR: f64 = 0.2;
const MAX_FACTOR: f64 = 10.0;

/// Embedded 5(4) Runge–Kutta pair with step-size control
#[derive(Clone, Copy, Debug)]
pub struct DormandPrince {
    rtol: f64,
    atol: f64,
    initial_step: Option<f64>,
    min_step: f64,
    max_step: f64,
    max_steps: usize,
}

impl Default for DormandPrince {
    fn default() -> Self {
        Self::from_config(&IntegratorConfig::default())
    }
}

struct Trial {
    y: State,
    f: State,
    error: f64,
}

impl DormandPrince {
    pub fn from_config(config: &IntegratorConfig) -> Self {
        Self {
            rtol: config.rtol,
            atol: config.atol,
            initial_step: config.initial_step,
            min_step: config.min_step,
            max_step: config.max_step.unwrap_or(f64::INFINITY),
            max_steps: config.max_steps.max(1),
        }
    }

    /// Override tolerances
    pub fn with_tolerances(mut self, rtol: f64, atol: f64) -> Self {
        self.rtol = rtol;
        self.atol = atol;
        self
    }

    fn scale(&self, a: f64, b: f64) -> f64 {
        self.atol + self.rtol * a.abs().max(b.abs())
    }

    /// RMS norm of `v` weighted by the tolerance scale at `y`
    fn norm(&self, v: &State, y: &State) -> f64 {
        let sum: f64 = v
            .iter()
            .zip(y)
            .map(|(vi, yi)| {
                let s = vi / self.scale(*yi, *yi);
                s * s
            })
            .sum();
        (sum / 2.0).sqrt()
    }

    /// Starting step estimate (Hairer, Nørsett & Wanner, II.4)
    fn initial_step(&self, system: &dyn OdeSystem, t: f64, y: &State, f0: &State, span: f64) -> f64 {
        if let Some(h) = self.initial_step {
            return h.min(span).min(self.max_step);
        }
        let d0 = self.norm(y, y);
        let d1 = self.norm(f0, y);
        let h0 = if d0 < 1e-5 || d1 < 1e-5 { 1e-6 } else { 0.01 * d0 / d1 };
        let h0 = h0.min(span);

        let y1 = [y[0] + h0 * f0[0], y[1] + h0 * f0[1]];
        let f1 = system.derivatives(t + h0, &y1);
        let df = [f1[0] - f0[0], f1[1] - f0[1]];
        let d2 = self.norm(&df, y) / h0;

        let h1 = if d1.max(d2) <= 1e-15 {
            (h0 * 1e-3).max(1e-6)
        } else {
            (0.01 / d1.max(d2)).powf(1.0 / 5.0)
        };
        (100.0 * h0).min(h1).min(span).min(self.max_step)
    }

    fn attempt(&self, system: &dyn OdeSystem, t: f64, y: &State, k1: &State, h: f64) -> Trial {
        let k2 = system.derivatives(t + C2 * h, &combine(y, h, &[(A21, k1)]));
        let k3 = system.derivatives(t + C3 * h, &combine(y, h, &[(A31, k1), (A32, &k2)]));
        let k4 = system.derivatives(t + C4 * h, &combine(y, h, &[(A41, k1), (A42, &k2), (A43, &k3)]));
        let k5 = system.derivatives(
            t + C5 * h,
            &combine(y, h, &[(A51, k1), (A52, &k2), (A53, &k3), (A54, &k4)]),
        );
        let k6 = system.derivatives(
            t + h,
            &combine(y, h, &[(A61, k1), (A62, &k2), (A63, &k3), (A64, &k4), (A65, &k5)]),
        );
        let y_new = combine(y, h, &[(B1, k1), (B3, &k3), (B4, &k4), (B5, &k5), (B6, &k6)]);
        let k7 = system.derivatives(t + h, &y_new);

        let mut err = [0.0; 2];
        for i in 0..2 {
            err[i] = h
                * (E1 * k1[i] + E3 * k3[i] + E4 * k4[i] + E5 * k5[i] + E6 * k6[i] + E7 * k7[i]);
        }
        let sum: f64 = (0..2)
            .map(|i| {
                let s = err[i] / self.scale(y[i], y_new[i]);
                s * s
            })
            .sum();

        Trial {
            y: y_new,
            f: k7,
            error: (sum / 2.0).sqrt(),
        }
    }
}

/// `y + h * Σ a_i k_i`
fn combine(y: &State, h: f64, coeffs: &[(f64, &State)]) -> State {
    let mut out = *y;
    for &(a, k) in coeffs {
        out[0] += h * a * k[0];
        out[1] += h * a * k[1];
    }
    out
}

impl Integrator for DormandPrince {
    fn name(&self) -> &'static str {
        "dormand-prince"
    }

    fn integrate(
        &self,
        system: &dyn OdeSystem,
        initial: State,
        times: &[f64],
    ) -> Result<Vec<State>, StepFailure> {
        let mut out = Vec::with_capacity(times.len());
        let Some(&t_start) = times.first() else {
            return Ok(out);
        };
        out.push(initial);

        let t_end = times.last().copied().unwrap_or(t_start);
        let mut t = t_start;
        let mut y = initial;
        let mut f = system.derivatives(t, &y);
        let mut h = if t_end > t_start {
            self.initial_step(system, t, &y, &f, t_end - t_start)
        } else {
            0.0
        };

        for &target in &times[1..] {
            let mut steps = 0usize;
            while t < target {
                if steps >= self.max_steps {
                    return Err(StepFailure::new(
                        t,
                        format!("exceeded {} steps before t={}", self.max_steps, target),
                    ));
                }
                let remaining = target - t;
                // A step that reaches the target is fine however short it is.
                if h < self.min_step && h < remaining {
                    return Err(StepFailure::new(
                        t,
                        format!("step size {h:e} fell below minimum {:e}", self.min_step),
                    ));
                }

                let lands = h >= remaining;
                let step = if lands { remaining } else { h };
                let trial = self.attempt(system, t, &y, &f, step);
                steps += 1;

                if trial.error.is_finite() && trial.error <= 1.0 {
                    t = if lands { target } else { t + step };
                    y = trial.y;
                    f = trial.f;
                    if !is_finite(&y) {
                        return Err(StepFailure::new(t, "state became non-finite"));
                    }
                    let factor = if trial.error == 0.0 {
                        MAX_FACTOR
                    } else {
                        (SAFETY * trial.error.powf(-0.2)).clamp(MIN_FACTOR, MAX_FACTOR)
                    };
                    // A shortened landing step says nothing about the natural size.
                    if !lands || step >= h {
                        h = (step * factor).min(self.max_step);
                    }
                } else {
                    let factor = if trial.error.is_finite() {
                        (SAFETY * trial.error.powf(-0.2)).clamp(MIN_FACTOR, 1.0)
                    } else {
                        MIN_FACTOR
                    };
                    h = step * factor;
                }
            }
            out.push(y);
        }
        Ok(out)
    }
}
