//! Solver engine - numerical integration of oscillator dynamics
//!
//! A closed set of strategies behind one entry point, [`Integrator::advance`]:
//!
//! - **Fast**: explicit Euler, fixed sub-step
//! - **Rk4**: classical Runge-Kutta, fixed sub-step
//! - **Rkf45**: Runge-Kutta-Fehlberg 4(5), sub-step adapted to a local
//!   truncation error tolerance within [min_step, max_step]
//!
//! Scratch buffers belong to the integrator, one per network instance.
//! Non-finite state is reported as [`SyncError::Diverged`], never clamped.

use tracing::warn;

use crate::config::{AdaptiveParams, SolverKind};
use crate::coupling::OdeSystem;
use crate::error::{SyncError, SyncResult};

/// Accepted / rejected sub-step counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IntegratorStats {
    pub accepted: u64,
    pub rejected: u64,
}

/// Integration strategy with owned scratch space.
#[derive(Clone, Debug)]
pub struct Integrator {
    kind: SolverKind,
    adaptive: AdaptiveParams,
    k1: Vec<f64>,
    k2: Vec<f64>,
    k3: Vec<f64>,
    k4: Vec<f64>,
    k5: Vec<f64>,
    k6: Vec<f64>,
    tmp: Vec<f64>,
    /// Last adaptive sub-step, reused as the next starting guess.
    last_step: Option<f64>,
    stats: IntegratorStats,
}

impl Integrator {
    pub fn new(kind: SolverKind, adaptive: AdaptiveParams) -> Self {
        Self {
            kind,
            adaptive,
            k1: Vec::new(),
            k2: Vec::new(),
            k3: Vec::new(),
            k4: Vec::new(),
            k5: Vec::new(),
            k6: Vec::new(),
            tmp: Vec::new(),
            last_step: None,
            stats: IntegratorStats::default(),
        }
    }

    /// Strategy in use.
    pub fn kind(&self) -> SolverKind {
        self.kind
    }

    /// Switch strategy, keeping scratch buffers.
    pub fn set_kind(&mut self, kind: SolverKind) {
        if self.kind != kind {
            self.kind = kind;
            self.last_step = None;
        }
    }

    /// Sub-step counters since creation.
    pub fn stats(&self) -> IntegratorStats {
        self.stats
    }

    /// Advance `state` from time `t` to `t + span`.
    ///
    /// `step` is the fixed sub-step for Fast / Rk4 (rounded so that a whole
    /// number of sub-steps covers the span) and the initial guess for Rkf45.
    pub fn advance<S: OdeSystem + ?Sized>(
        &mut self,
        system: &S,
        t: f64,
        state: &mut [f64],
        span: f64,
        step: f64,
    ) -> SyncResult<()> {
        debug_assert_eq!(state.len(), system.dimension());
        if span <= 0.0 {
            return Ok(());
        }
        self.resize(state.len());

        match self.kind {
            SolverKind::Fast | SolverKind::Rk4 => {
                let count = (span / step).round().max(1.0) as usize;
                let h = span / count as f64;
                for n in 0..count {
                    let time = t + n as f64 * h;
                    if self.kind == SolverKind::Fast {
                        self.euler_step(system, time, state, h);
                    } else {
                        self.rk4_step(system, time, state, h);
                    }
                    self.stats.accepted += 1;
                    ensure_finite(state, time)?;
                }
                Ok(())
            }
            SolverKind::Rkf45 => self.rkf45(system, t, state, span, step),
        }
    }

    fn resize(&mut self, n: usize) {
        if self.tmp.len() != n {
            for buffer in [
                &mut self.k1,
                &mut self.k2,
                &mut self.k3,
                &mut self.k4,
                &mut self.k5,
                &mut self.k6,
                &mut self.tmp,
            ] {
                buffer.resize(n, 0.0);
            }
        }
    }

    fn euler_step<S: OdeSystem + ?Sized>(&mut self, system: &S, t: f64, state: &mut [f64], h: f64) {
        system.derivative(t, state, &mut self.k1);
        for (y, k) in state.iter_mut().zip(&self.k1) {
            *y += h * k;
        }
    }

    fn rk4_step<S: OdeSystem + ?Sized>(&mut self, system: &S, t: f64, state: &mut [f64], h: f64) {
        let Self {
            k1, k2, k3, k4, tmp, ..
        } = self;

        system.derivative(t, state, k1);
        combine(tmp, state, h, &[(0.5, &k1[..])]);
        system.derivative(t + 0.5 * h, tmp, k2);
        combine(tmp, state, h, &[(0.5, &k2[..])]);
        system.derivative(t + 0.5 * h, tmp, k3);
        combine(tmp, state, h, &[(1.0, &k3[..])]);
        system.derivative(t + h, tmp, k4);

        for i in 0..state.len() {
            state[i] += h * (k1[i] + 2.0 * k2[i] + 2.0 * k3[i] + k4[i]) / 6.0;
        }
    }

    fn rkf45<S: OdeSystem + ?Sized>(
        &mut self,
        system: &S,
        t: f64,
        state: &mut [f64],
        span: f64,
        step: f64,
    ) -> SyncResult<()> {
        let AdaptiveParams {
            tolerance,
            min_step,
            max_step,
        } = self.adaptive;
        let end = t + span;
        let eps = span * 1e-12;
        let mut time = t;
        let mut h = self.last_step.unwrap_or(step).clamp(min_step, max_step);

        while end - time > eps {
            let h_try = h.min(end - time);
            let error = self.fehlberg_trial(system, time, state, h_try);

            if !error.is_finite() {
                return Err(SyncError::Diverged { time });
            }

            let forced = h_try <= min_step;
            if error <= tolerance || forced {
                if error > tolerance {
                    warn!(time, error, tolerance, "adaptive step accepted at min_step");
                }
                // tmp holds the fifth-order solution
                state.copy_from_slice(&self.tmp);
                time += h_try;
                self.stats.accepted += 1;
                ensure_finite(state, time)?;
            } else {
                self.stats.rejected += 1;
            }

            let factor = if error > 0.0 {
                (0.84 * (tolerance / error).powf(0.25)).clamp(0.1, 4.0)
            } else {
                4.0
            };
            h = (h_try * factor).clamp(min_step, max_step);
        }

        self.last_step = Some(h);
        Ok(())
    }

    /// One Fehlberg trial step. Leaves the fifth-order result in `tmp` and
    /// returns the max-norm error estimate.
    fn fehlberg_trial<S: OdeSystem + ?Sized>(&mut self, system: &S, t: f64, y: &[f64], h: f64) -> f64 {
        let Self {
            k1,
            k2,
            k3,
            k4,
            k5,
            k6,
            tmp,
            ..
        } = self;

        system.derivative(t, y, k1);
        combine(tmp, y, h, &[(0.25, &k1[..])]);
        system.derivative(t + 0.25 * h, tmp, k2);
        combine(tmp, y, h, &[(3.0 / 32.0, &k1[..]), (9.0 / 32.0, &k2[..])]);
        system.derivative(t + 3.0 / 8.0 * h, tmp, k3);
        combine(
            tmp,
            y,
            h,
            &[(1932.0 / 2197.0, &k1[..]), (-7200.0 / 2197.0, &k2[..]), (7296.0 / 2197.0, &k3[..])],
        );
        system.derivative(t + 12.0 / 13.0 * h, tmp, k4);
        combine(
            tmp,
            y,
            h,
            &[
                (439.0 / 216.0, &k1[..]),
                (-8.0, &k2[..]),
                (3680.0 / 513.0, &k3[..]),
                (-845.0 / 4104.0, &k4[..]),
            ],
        );
        system.derivative(t + h, tmp, k5);
        combine(
            tmp,
            y,
            h,
            &[
                (-8.0 / 27.0, &k1[..]),
                (2.0, &k2[..]),
                (-3544.0 / 2565.0, &k3[..]),
                (1859.0 / 4104.0, &k4[..]),
                (-11.0 / 40.0, &k5[..]),
            ],
        );
        system.derivative(t + 0.5 * h, tmp, k6);

        let mut error = 0.0f64;
        for i in 0..y.len() {
            let e = h
                * (k1[i] / 360.0 - 128.0 / 4275.0 * k3[i] - 2197.0 / 75240.0 * k4[i]
                    + k5[i] / 50.0
                    + 2.0 / 55.0 * k6[i]);
            if e.is_nan() {
                error = f64::NAN;
            } else if !error.is_nan() {
                error = error.max(e.abs());
            }
        }

        combine(
            tmp,
            y,
            h,
            &[
                (16.0 / 135.0, &k1[..]),
                (6656.0 / 12825.0, &k3[..]),
                (28561.0 / 56430.0, &k4[..]),
                (-9.0 / 50.0, &k5[..]),
                (2.0 / 55.0, &k6[..]),
            ],
        );

        error
    }
}

/// out = y + h Σ cⱼ kⱼ
#[inline]
fn combine(out: &mut [f64], y: &[f64], h: f64, terms: &[(f64, &[f64])]) {
    for i in 0..y.len() {
        let increment: f64 = terms.iter().map(|(c, k)| c * k[i]).sum();
        out[i] = y[i] + h * increment;
    }
}

fn ensure_finite(state: &[f64], time: f64) -> SyncResult<()> {
    if state.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(SyncError::Diverged { time })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// dy/dt = -y
    struct Decay;

    impl OdeSystem for Decay {
        fn dimension(&self) -> usize {
            1
        }
        fn derivative(&self, _t: f64, state: &[f64], out: &mut [f64]) {
            out[0] = -state[0];
        }
    }

    /// dy/dt = y², blows up at t = 1 for y(0) = 1
    struct Blowup;

    impl OdeSystem for Blowup {
        fn dimension(&self) -> usize {
            1
        }
        fn derivative(&self, _t: f64, state: &[f64], out: &mut [f64]) {
            out[0] = state[0] * state[0];
        }
    }

    fn solve(kind: SolverKind, step: f64) -> f64 {
        let mut integrator = Integrator::new(kind, AdaptiveParams::default());
        let mut state = [1.0];
        integrator
            .advance(&Decay, 0.0, &mut state, 1.0, step)
            .unwrap();
        state[0]
    }

    #[test]
    fn test_accuracy_ordering() {
        let exact = (-1.0f64).exp();
        let euler = (solve(SolverKind::Fast, 0.01) - exact).abs();
        let rk4 = (solve(SolverKind::Rk4, 0.01) - exact).abs();
        let rkf = (solve(SolverKind::Rkf45, 0.01) - exact).abs();

        assert!(euler < 1e-2);
        assert!(rk4 < 1e-9);
        assert!(rkf < 1e-5);
        assert!(rk4 < euler);
    }

    #[test]
    fn test_adaptive_rejects_and_adapts() {
        let params = AdaptiveParams {
            tolerance: 1e-10,
            min_step: 1e-6,
            max_step: 1.0,
        };
        let mut integrator = Integrator::new(SolverKind::Rkf45, params);
        let mut state = [1.0];
        // Oversized initial guess must be rejected first
        integrator
            .advance(&Decay, 0.0, &mut state, 2.0, 1.0)
            .unwrap();

        let stats = integrator.stats();
        assert!(stats.rejected > 0);
        assert!(stats.accepted > 1);
        assert!((state[0] - (-2.0f64).exp()).abs() < 1e-8);
    }

    #[test]
    fn test_divergence_reported() {
        for kind in [SolverKind::Fast, SolverKind::Rk4, SolverKind::Rkf45] {
            let mut integrator = Integrator::new(kind, AdaptiveParams::default());
            let mut state = [1.0];
            let result = integrator.advance(&Blowup, 0.0, &mut state, 5.0, 0.01);
            assert!(
                matches!(result, Err(SyncError::Diverged { .. })),
                "{kind:?} should diverge"
            );
        }
    }

    #[test]
    fn test_zero_span_is_noop() {
        let mut integrator = Integrator::new(SolverKind::Rk4, AdaptiveParams::default());
        let mut state = [3.0];
        integrator.advance(&Decay, 0.0, &mut state, 0.0, 0.1).unwrap();
        assert_eq!(state, [3.0]);
    }

    #[test]
    fn test_fixed_step_count_rounds() {
        let mut integrator = Integrator::new(SolverKind::Fast, AdaptiveParams::default());
        let mut state = [1.0];
        integrator.advance(&Decay, 0.0, &mut state, 1.0, 0.3).unwrap();
        // 1.0 / 0.3 rounds to 3 sub-steps
        assert_eq!(integrator.stats().accepted, 3);
    }
}
