//! Simulation drivers - fixed-run and run-to-convergence
//!
//! Both drivers integrate an [`OdeSystem`] with the network's
//! [`Integrator`], record reporting steps and notify observers.
//!
//! ```text
//! Created → Running → Completed                              (fixed-run)
//! Created → Running → Converged | PlateauStopped | MaxStepsReached
//!                   ↘ Diverged                               (failure)
//! ```

use tracing::{debug, info, warn};

use crate::config::{ConvergenceConfig, PlateauMetric};
use crate::coupling::OdeSystem;
use crate::dynamic::{DynamicRecorder, SyncDynamic};
use crate::error::{SyncError, SyncResult};
use crate::observer::{Observers, SimulationEvent};
use crate::order::max_relative_phase_change;
use crate::solver::Integrator;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Lifecycle state of a network's most recent simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RunStatus {
    /// Never simulated.
    #[default]
    Created,
    /// Simulation in progress.
    Running,
    /// Fixed-run finished all steps.
    Completed,
    /// Target order reached.
    Converged,
    /// Change between reporting steps fell below the plateau threshold.
    PlateauStopped,
    /// Reporting step bound exhausted.
    MaxStepsReached,
    /// Solver produced non-finite state.
    Diverged,
}

impl RunStatus {
    /// True for every state a run can end in.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Created | Self::Running)
    }

    /// True only for the failure terminal state.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Diverged)
    }

    /// Status a network records after a run. Rejected input leaves the
    /// previous status in place.
    pub(crate) fn after(result: &SyncResult<SyncDynamic>, previous: Self) -> Self {
        match result {
            Ok(dynamic) => dynamic.status(),
            Err(SyncError::Diverged { .. }) => Self::Diverged,
            Err(_) => previous,
        }
    }
}

/// Advance `steps` reporting steps over `time`.
///
/// Each reporting step is integrated with sub-step `step / 10`. The initial
/// state is recorded at t = 0.
#[allow(clippy::too_many_arguments)]
pub(crate) fn run_fixed<S, M>(
    system: &S,
    integrator: &mut Integrator,
    state: &mut [f64],
    steps: usize,
    time: f64,
    collect: bool,
    observers: &Observers,
    metric: M,
) -> SyncResult<SyncDynamic>
where
    S: OdeSystem + ?Sized,
    M: Fn(&[f64]) -> f64,
{
    if steps == 0 {
        return Err(SyncError::InvalidConfig("steps must be > 0"));
    }
    if !(time > 0.0 && time.is_finite()) {
        return Err(SyncError::InvalidConfig("time must be > 0"));
    }

    let step = time / steps as f64;
    let int_step = step / 10.0;
    let mut recorder = DynamicRecorder::new(state.len(), collect, steps + 1);
    recorder.record(0.0, state);

    for n in 1..=steps {
        let start = (n - 1) as f64 * step;
        if let Err(err) = integrator.advance(system, start, state, step, int_step) {
            return Err(report_divergence(err, observers, n - 1));
        }

        let now = n as f64 * step;
        recorder.record(now, state);

        if !observers.is_empty() {
            observers.notify(SimulationEvent::Step {
                step: n,
                time: now,
                order: metric(state),
            });
        }
    }

    let order = metric(state);
    info!(steps, time, order, "fixed run completed");
    observers.notify(SimulationEvent::Terminated {
        status: RunStatus::Completed,
        steps,
        time,
        order,
    });

    Ok(recorder.finish(RunStatus::Completed))
}

/// Advance until the watched order reaches `config.order`, the plateau
/// guard trips or `config.max_steps` reporting steps have run.
pub(crate) fn run_to_convergence<S, M>(
    system: &S,
    integrator: &mut Integrator,
    state: &mut [f64],
    config: &ConvergenceConfig,
    collect: bool,
    observers: &Observers,
    metric: M,
) -> SyncResult<SyncDynamic>
where
    S: OdeSystem + ?Sized,
    M: Fn(&[f64]) -> f64,
{
    config.validate()?;

    let mut recorder = DynamicRecorder::new(state.len(), collect, 64);
    let mut time = 0.0;
    recorder.record(time, state);

    let mut order = metric(state);
    let mut previous_order = order;
    let mut previous_state = state.to_vec();
    let mut steps = 0;

    let status = if order >= config.order {
        RunStatus::Converged
    } else {
        loop {
            if steps == config.max_steps {
                break RunStatus::MaxStepsReached;
            }

            if let Err(err) = integrator.advance(system, time, state, config.step, config.int_step) {
                return Err(report_divergence(err, observers, steps));
            }
            steps += 1;
            time = steps as f64 * config.step;
            recorder.record(time, state);

            order = metric(state);
            debug!(step = steps, time, order, "reporting step");
            observers.notify(SimulationEvent::Step {
                step: steps,
                time,
                order,
            });

            if order >= config.order {
                break RunStatus::Converged;
            }

            let change = match config.plateau {
                PlateauMetric::StateChange => max_relative_phase_change(&previous_state, state),
                PlateauMetric::OrderChange => (order - previous_order).abs(),
            };
            if change < config.threshold_changes {
                break RunStatus::PlateauStopped;
            }

            previous_state.copy_from_slice(state);
            previous_order = order;
        }
    };

    info!(?status, steps, time, order, target = config.order, "run to convergence stopped");
    observers.notify(SimulationEvent::Terminated {
        status,
        steps,
        time,
        order,
    });

    Ok(recorder.finish(status))
}

fn report_divergence(err: SyncError, observers: &Observers, steps: usize) -> SyncError {
    if let SyncError::Diverged { time } = err {
        warn!(time, steps, "simulation diverged");
        observers.notify(SimulationEvent::Terminated {
            status: RunStatus::Diverged,
            steps,
            time,
            order: f64::NAN,
        });
    }
    err
}
