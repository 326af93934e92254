//! Classical fourth-order Runge–Kutta with a fixed number of substeps.

use super::{axpy, is_finite, Integrator, OdeSystem, State, StepFailure};

/// Fixed-step RK4
#[derive(Clone, Copy, Debug)]
pub struct Rk4 {
    substeps: usize,
}

impl Rk4 {
    /// `substeps` equal steps between consecutive grid points (at least 1)
    pub fn new(substeps: usize) -> Self {
        Self {
            substeps: substeps.max(1),
        }
    }

    pub fn substeps(&self) -> usize {
        self.substeps
    }

    /// Single RK4 step of size `h`
    pub fn step(system: &dyn OdeSystem, t: f64, y: &State, h: f64) -> State {
        let k1 = system.derivatives(t, y);
        let k2 = system.derivatives(t + 0.5 * h, &axpy(y, 0.5 * h, &k1));
        let k3 = system.derivatives(t + 0.5 * h, &axpy(y, 0.5 * h, &k2));
        let k4 = system.derivatives(t + h, &axpy(y, h, &k3));

        let mut next = *y;
        for i in 0..2 {
            next[i] += h / 6.0 * (k1[i] + 2.0 * k2[i] + 2.0 * k3[i] + k4[i]);
        }
        next
    }
}

impl Default for Rk4 {
    fn default() -> Self {
        Self::new(10)
    }
}

impl Integrator for Rk4 {
    fn name(&self) -> &'static str {
        "rk4"
    }

    fn integrate(
        &self,
        system: &dyn OdeSystem,
        initial: State,
        times: &[f64],
    ) -> Result<Vec<State>, StepFailure> {
        let mut out = Vec::with_capacity(times.len());
        if times.is_empty() {
            return Ok(out);
        }
        out.push(initial);

        let mut y = initial;
        for window in times.windows(2) {
            let (t0, t1) = (window[0], window[1]);
            let h = (t1 - t0) / self.substeps as f64;
            if h != 0.0 {
                for i in 0..self.substeps {
                    let t = t0 + h * i as f64;
                    y = Self::step(system, t, &y, h);
                    if !is_finite(&y) {
                        return Err(StepFailure::new(t, "state became non-finite"));
                    }
                }
            }
            out.push(y);
        }
        Ok(out)
    }
}
