//! LEGION - locally excitatory, globally inhibitory oscillator network
//!
//! Each oscillator is a relaxation oscillator with an excitatory variable
//! x, an inhibitory variable y and a lateral potential p. A single global
//! inhibitor z suppresses every oscillator while any of them is active.
//!
//! ```text
//! dx/dt = 3x - x³ + 2 - y + Iᵢ·H(p + e^(-αt) - θ) + Sᵢ + ρ
//! dy/dt = ε (γ (1 + tanh(x / β)) - y)
//! dp/dt = λ (1 - p) H(Σₖ T·H(xₖ - θx) - θp) - μ p
//! dz/dt = φ (σ - z)
//!
//! Sᵢ = Σₖ Wᵢₖ H(xₖ - θx) - Wz H(z - θxz)
//! ```
//!
//! Coupling S, the potential input, σ and the noise ρ are computed from the
//! state at the start of every reporting step and held for its duration.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::config::{LegionConfig, LegionParameters, SolverKind};
use crate::coupling::OdeSystem;
use crate::dynamic::{DynamicRecorder, SyncDynamic};
use crate::ensemble::{allocate_activity_ensembles, Ensembles};
use crate::error::{SyncError, SyncResult};
use crate::observer::{Observers, SimulationEvent, SimulationObserver};
use crate::simulation::RunStatus;
use crate::solver::Integrator;
use crate::topology::Connectivity;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Excitatory level separating the active and silent phases when reading
/// ensembles off a LEGION output.
pub const DEFAULT_ACTIVITY_THRESHOLD: f64 = 0.0;

#[inline]
fn heaviside(value: f64) -> f64 {
    if value > 0.0 {
        1.0
    } else {
        0.0
    }
}

/// LEGION oscillatory network.
#[derive(Debug)]
pub struct LegionNetwork {
    config: LegionConfig,
    connectivity: Connectivity,
    /// [x₀..xₙ, y₀..yₙ, p₀..pₙ, z]
    state: Vec<f64>,
    noise: Vec<f64>,
    rng: StdRng,
    integrator: Integrator,
    observers: Observers,
    status: RunStatus,
}

impl LegionNetwork {
    pub fn new(config: LegionConfig) -> SyncResult<Self> {
        config.validate()?;
        let connectivity = Connectivity::from_type(config.size, config.connection)?;
        let size = config.size;

        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut state = vec![0.0; 3 * size + 1];
        for x in &mut state[..size] {
            *x = rng.gen::<f64>();
        }
        let noise = (0..size).map(|_| rng.gen::<f64>() * config.params.ro).collect();

        Ok(Self {
            integrator: Integrator::new(SolverKind::default(), config.adaptive),
            config,
            connectivity,
            state,
            noise,
            rng,
            observers: Observers::default(),
            status: RunStatus::Created,
        })
    }

    /// Oscillator count.
    pub fn size(&self) -> usize {
        self.config.size
    }

    pub fn params(&self) -> &LegionParameters {
        &self.config.params
    }

    pub fn connectivity(&self) -> &Connectivity {
        &self.connectivity
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    /// Register an observer for all subsequent runs.
    ///
    /// The `order` carried by LEGION events is the fraction of oscillators
    /// on the active branch (x above `teta_zx`).
    pub fn subscribe(&mut self, observer: Arc<dyn SimulationObserver>) {
        self.observers.subscribe(observer);
    }

    /// Current excitatory values.
    pub fn excitatory(&self) -> &[f64] {
        &self.state[..self.size()]
    }

    /// Current inhibitory values.
    pub fn inhibitory(&self) -> &[f64] {
        let n = self.size();
        &self.state[n..2 * n]
    }

    /// Current lateral potentials.
    pub fn potential(&self) -> &[f64] {
        let n = self.size();
        &self.state[2 * n..3 * n]
    }

    /// Current global inhibitor value.
    pub fn global_inhibitor(&self) -> f64 {
        self.state[3 * self.size()]
    }

    /// Fraction of oscillators on the active branch.
    fn active_fraction(&self) -> f64 {
        let threshold = self.config.params.teta_zx;
        let active = self.excitatory().iter().filter(|&&x| x > threshold).count();
        active as f64 / self.size() as f64
    }

    /// Fixed-run of `steps` reporting steps over `time` under `stimulus`.
    ///
    /// A positive stimulus entry feeds the oscillator with the configured
    /// input `i`; other entries leave it unstimulated.
    pub fn simulate(
        &mut self,
        steps: usize,
        time: f64,
        solver: SolverKind,
        collect: bool,
        stimulus: &[f64],
    ) -> SyncResult<LegionDynamic> {
        let size = self.size();
        if stimulus.len() != size {
            return Err(SyncError::dim_mismatch(size, stimulus.len()));
        }
        if steps == 0 {
            return Err(SyncError::InvalidConfig("steps must be > 0"));
        }
        if !(time > 0.0 && time.is_finite()) {
            return Err(SyncError::InvalidConfig("time must be > 0"));
        }

        let previous = self.status;
        self.status = RunStatus::Running;
        self.integrator.set_kind(solver);
        let result = self.run(steps, time, collect, stimulus);
        self.status = match &result {
            Ok(_) => RunStatus::Completed,
            Err(SyncError::Diverged { .. }) => RunStatus::Diverged,
            Err(_) => previous,
        };
        result
    }

    fn run(&mut self, steps: usize, time: f64, collect: bool, stimulus: &[f64]) -> SyncResult<LegionDynamic> {
        let size = self.size();
        let params = self.config.params;
        let inputs: Vec<f64> = stimulus
            .iter()
            .map(|&s| if s > 0.0 { params.i } else { 0.0 })
            .collect();
        let weights = self.dynamic_weights(&inputs);

        let step = time / steps as f64;
        let int_step = step / 10.0;
        let mut output = DynamicRecorder::new(size, collect, steps + 1);
        let mut inhibitory = DynamicRecorder::new(size, collect, steps + 1);
        let mut global = Vec::with_capacity(if collect { steps + 1 } else { 1 });

        let mut record = |state: &[f64], t: f64, global: &mut Vec<f64>| {
            output.record(t, &state[..size]);
            inhibitory.record(t, &state[size..2 * size]);
            if !collect {
                global.clear();
            }
            global.push(state[3 * size]);
        };
        record(&self.state, 0.0, &mut global);

        let mut coupling = vec![0.0; size];
        let mut potential = vec![0.0; size];

        for n in 1..=steps {
            let start = (n - 1) as f64 * step;
            let sigma = self.frozen_terms(&weights, &mut coupling, &mut potential);

            let system = LegionSystem {
                params: &params,
                inputs: &inputs,
                coupling: &coupling,
                potential: &potential,
                noise: &self.noise,
                sigma,
            };
            if let Err(err) = self.integrator.advance(&system, start, &mut self.state, step, int_step) {
                if let SyncError::Diverged { time } = err {
                    warn!(time, step = n, "legion simulation diverged");
                    self.observers.notify(SimulationEvent::Terminated {
                        status: RunStatus::Diverged,
                        steps: n - 1,
                        time,
                        order: f64::NAN,
                    });
                }
                return Err(err);
            }

            let now = n as f64 * step;
            record(&self.state, now, &mut global);

            let rho = params.ro;
            for noise in &mut self.noise {
                *noise = self.rng.gen::<f64>() * rho;
            }

            let active = self.active_fraction();
            debug!(step = n, time = now, active, "legion reporting step");
            if !self.observers.is_empty() {
                self.observers.notify(SimulationEvent::Step {
                    step: n,
                    time: now,
                    order: active,
                });
            }
        }

        let active = self.active_fraction();
        info!(steps, time, size, active, "legion simulation completed");
        self.observers.notify(SimulationEvent::Terminated {
            status: RunStatus::Completed,
            steps,
            time,
            order: active,
        });
        Ok(LegionDynamic {
            output: output.finish(RunStatus::Completed),
            inhibitory: inhibitory.finish(RunStatus::Completed),
            global_inhibitor: global,
        })
    }

    /// Weight of every edge, aligned with the connectivity's neighbour
    /// lists. Only stimulated oscillators receive lateral excitation, split
    /// evenly over their stimulated neighbours.
    fn dynamic_weights(&self, inputs: &[f64]) -> Vec<Vec<f64>> {
        (0..self.size())
            .map(|i| {
                let neighbors = self.connectivity.neighbors(i);
                let stimulated = neighbors.iter().filter(|&&j| inputs[j] > 0.0).count();
                let weight = if inputs[i] > 0.0 && stimulated > 0 {
                    self.config.params.wt / stimulated as f64
                } else {
                    0.0
                };
                vec![weight; neighbors.len()]
            })
            .collect()
    }

    /// Fill per-step coupling and potential input, return σ.
    fn frozen_terms(&self, weights: &[Vec<f64>], coupling: &mut [f64], potential: &mut [f64]) -> f64 {
        let params = &self.config.params;
        let x = self.excitatory();
        let inhibition = params.wz * heaviside(self.global_inhibitor() - params.teta_xz);

        for i in 0..self.size() {
            let neighbors = self.connectivity.neighbors(i);
            let mut excitation = 0.0;
            let mut lateral = 0.0;
            for (&j, &w) in neighbors.iter().zip(&weights[i]) {
                let active = heaviside(x[j] - params.teta_x);
                excitation += w * active;
                lateral += params.t * active;
            }
            coupling[i] = excitation - inhibition;
            potential[i] = lateral;
        }

        if x.iter().any(|&v| v > params.teta_zx) {
            1.0
        } else {
            0.0
        }
    }
}

/// Right-hand side of one reporting step with frozen coupling.
struct LegionSystem<'a> {
    params: &'a LegionParameters,
    inputs: &'a [f64],
    coupling: &'a [f64],
    potential: &'a [f64],
    noise: &'a [f64],
    sigma: f64,
}

impl OdeSystem for LegionSystem<'_> {
    fn dimension(&self) -> usize {
        3 * self.inputs.len() + 1
    }

    fn derivative(&self, t: f64, state: &[f64], out: &mut [f64]) {
        let p = self.params;
        let n = self.inputs.len();

        for i in 0..n {
            let (x, y, pot) = (state[i], state[n + i], state[2 * n + i]);
            let input = self.inputs[i];
            let gated = p.enable_potential && input > 0.0;

            let drive = if gated {
                input * heaviside(pot + (-p.alpha * t).exp() - p.teta)
            } else {
                input
            };
            out[i] = 3.0 * x - x.powi(3) + 2.0 - y + drive + self.coupling[i] + self.noise[i];
            out[n + i] = p.eps * (p.gamma * (1.0 + (x / p.betta).tanh()) - y);
            out[2 * n + i] = if gated {
                p.lamda * (1.0 - pot) * heaviside(self.potential[i] - p.teta_p) - p.mu * pot
            } else {
                0.0
            };
        }

        out[3 * n] = p.fi * (self.sigma - state[3 * n]);
    }
}

/// Output of one LEGION simulation. Owned by the caller.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LegionDynamic {
    output: SyncDynamic,
    inhibitory: SyncDynamic,
    global_inhibitor: Vec<f64>,
}

impl LegionDynamic {
    /// Number of recorded steps.
    pub fn len(&self) -> usize {
        self.output.len()
    }

    pub fn is_empty(&self) -> bool {
        self.output.is_empty()
    }

    /// Oscillator count.
    pub fn size(&self) -> usize {
        self.output.width()
    }

    pub fn times(&self) -> &[f64] {
        self.output.times()
    }

    /// Excitatory trajectory.
    pub fn output(&self) -> &SyncDynamic {
        &self.output
    }

    /// Inhibitory trajectory.
    pub fn inhibitory_output(&self) -> &SyncDynamic {
        &self.inhibitory
    }

    /// Global inhibitor value per recorded step.
    pub fn global_inhibitor(&self) -> &[f64] {
        &self.global_inhibitor
    }

    /// Ensembles by timing of each oscillator's last active period.
    ///
    /// Needs a full-history dynamic; from a last-only dynamic every
    /// oscillator is a singleton.
    pub fn allocate_sync_ensembles(&self, tolerance: f64, threshold: f64) -> Ensembles {
        let series: Vec<Vec<f64>> = (0..self.size()).map(|i| self.output.series(i)).collect();
        allocate_activity_ensembles(&series, tolerance, threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectionType;

    fn quiet_params(enable_potential: bool) -> LegionParameters {
        LegionParameters {
            ro: 0.0,
            enable_potential,
            ..LegionParameters::default()
        }
    }

    fn network(size: usize, connection: ConnectionType, params: LegionParameters) -> LegionNetwork {
        LegionNetwork::new(LegionConfig::new(size, connection).with_params(params).with_seed(3)).unwrap()
    }

    /// (min, max) of an oscillator's excitatory value over the second half.
    fn late_range(dynamic: &LegionDynamic, index: usize) -> (f64, f64) {
        let series = dynamic.output().series(index);
        series[series.len() / 2..]
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| (lo.min(x), hi.max(x)))
    }

    #[test]
    fn test_invalid_construction() {
        assert!(LegionNetwork::new(LegionConfig::new(0, ConnectionType::None)).is_err());
        assert!(LegionNetwork::new(LegionConfig::new(5, ConnectionType::GridEight)).is_err());

        let params = LegionParameters {
            betta: 0.0,
            ..LegionParameters::default()
        };
        let config = LegionConfig::new(4, ConnectionType::None).with_params(params);
        assert!(matches!(LegionNetwork::new(config), Err(SyncError::InvalidConfig(_))));
    }

    #[test]
    fn test_stimulus_length_checked() {
        let mut net = network(3, ConnectionType::ListBidir, LegionParameters::default());
        assert_eq!(
            net.simulate(10, 1.0, SolverKind::Fast, false, &[1.0, 1.0]).unwrap_err(),
            SyncError::DimensionMismatch { expected: 3, actual: 2 }
        );
        assert_eq!(net.status(), RunStatus::Created);
    }

    #[test]
    fn test_dynamic_shape() {
        let mut net = network(4, ConnectionType::GridFour, LegionParameters::default());
        let dynamic = net
            .simulate(100, 10.0, SolverKind::Rk4, true, &[1.0, 1.0, 0.0, 0.0])
            .unwrap();

        assert_eq!(dynamic.len(), 101);
        assert_eq!(dynamic.size(), 4);
        assert_eq!(dynamic.inhibitory_output().len(), 101);
        assert_eq!(dynamic.global_inhibitor().len(), 101);
        assert!(dynamic.times().windows(2).all(|w| w[1] > w[0]));
        assert_eq!(net.status(), RunStatus::Completed);

        let last_only = net
            .simulate(10, 1.0, SolverKind::Rk4, false, &[1.0, 1.0, 0.0, 0.0])
            .unwrap();
        assert_eq!(last_only.len(), 1);
        assert_eq!(last_only.global_inhibitor().len(), 1);
        assert_eq!(last_only.output().last().unwrap().1, net.excitatory());
    }

    #[test]
    fn test_stimulated_oscillator_keeps_oscillating() {
        let mut net = network(2, ConnectionType::None, quiet_params(false));
        let dynamic = net
            .simulate(2400, 600.0, SolverKind::Rk4, true, &[1.0, 0.0])
            .unwrap();

        let (lo, hi) = late_range(&dynamic, 0);
        assert!(hi > 1.0 && lo < -1.0, "stimulated range = ({lo}, {hi})");

        let (_, hi) = late_range(&dynamic, 1);
        assert!(hi < 0.0, "unstimulated peak = {hi}");

        let ensembles = dynamic.allocate_sync_ensembles(0.1, DEFAULT_ACTIVITY_THRESHOLD);
        assert_eq!(ensembles.into_inner(), vec![vec![0], vec![1]]);
    }

    #[test]
    fn test_lone_leader_loses_stimulus_without_potential() {
        // No neighbours: the potential never builds up and the stimulus gate
        // closes once e^(-αt) drops below θ
        let mut net = network(1, ConnectionType::None, quiet_params(true));
        let dynamic = net.simulate(2400, 600.0, SolverKind::Rk4, true, &[1.0]).unwrap();

        let (_, hi) = late_range(&dynamic, 0);
        assert!(hi < 0.0, "late peak = {hi}");
        assert!(net.potential()[0].abs() < 1e-12);
    }

    #[test]
    fn test_global_inhibitor_follows_activity() {
        let mut net = network(2, ConnectionType::None, quiet_params(false));
        let dynamic = net
            .simulate(2400, 600.0, SolverKind::Rk4, true, &[1.0, 0.0])
            .unwrap();

        let z = dynamic.global_inhibitor();
        assert!(z.iter().all(|v| (0.0..=1.0).contains(v)));
        assert!(z.iter().any(|&v| v > 0.9));
    }

    #[test]
    fn test_observers_see_every_step() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::mpsc;

        let mut net = network(3, ConnectionType::ListBidir, quiet_params(false));
        let steps = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&steps);
        net.subscribe(Arc::new(crate::observer::FnObserver(move |event: SimulationEvent| {
            if matches!(event, SimulationEvent::Step { .. }) {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        })));
        let (tx, rx) = mpsc::channel();
        net.subscribe(Arc::new(crate::observer::ChannelObserver::new(tx)));

        net.simulate(50, 5.0, SolverKind::Rk4, false, &[1.0, 1.0, 0.0]).unwrap();

        assert_eq!(steps.load(Ordering::SeqCst), 50);
        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(events.len(), 51);
        assert!(events[..50]
            .iter()
            .all(|e| matches!(e, SimulationEvent::Step { order, .. } if (0.0..=1.0).contains(order))));
        assert!(matches!(
            events[50],
            SimulationEvent::Terminated {
                status: RunStatus::Completed,
                steps: 50,
                ..
            }
        ));
    }

    #[test]
    fn test_seeded_runs_reproducible() {
        let stimulus = [1.0, 0.0, 1.0, 1.0];
        let mut a = network(4, ConnectionType::ListBidir, LegionParameters::default());
        let mut b = network(4, ConnectionType::ListBidir, LegionParameters::default());

        let da = a.simulate(200, 20.0, SolverKind::Fast, true, &stimulus).unwrap();
        let db = b.simulate(200, 20.0, SolverKind::Fast, true, &stimulus).unwrap();
        assert_eq!(da, db);

        let ensembles = da.allocate_sync_ensembles(0.1, DEFAULT_ACTIVITY_THRESHOLD);
        assert_eq!(ensembles.oscillator_count(), 4);
    }
}
