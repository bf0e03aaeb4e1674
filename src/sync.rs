//! Base phase-oscillator network
//!
//! A [`SyncNetwork`] owns its phase vector, connectivity, natural
//! frequencies and solver scratch state. Nothing is shared between
//! instances, so independent networks may be driven from separate threads.

use std::f64::consts::PI;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{ConvergenceConfig, InitialPhases, OrderMetric, SolverKind, SyncConfig};
use crate::coupling::KuramotoCoupling;
use crate::dynamic::SyncDynamic;
use crate::ensemble::{allocate_sync_ensembles, Ensembles};
use crate::error::{SyncError, SyncResult};
use crate::observer::{Observers, SimulationObserver};
use crate::order::{global_order, local_order};
use crate::simulation::{run_fixed, run_to_convergence, RunStatus};
use crate::solver::Integrator;
use crate::topology::Connectivity;

/// Phase-oscillator network with Kuramoto coupling.
#[derive(Debug)]
pub struct SyncNetwork {
    config: SyncConfig,
    connectivity: Connectivity,
    frequencies: Vec<f64>,
    phases: Vec<f64>,
    integrator: Integrator,
    observers: Observers,
    status: RunStatus,
}

impl SyncNetwork {
    /// Create a network. Invalid configuration produces no object.
    pub fn new(config: SyncConfig) -> SyncResult<Self> {
        config.validate()?;
        let connectivity = Connectivity::from_type(config.size, config.connection)?;
        Ok(Self::assemble(config, connectivity))
    }

    /// Build around an already constructed connectivity. `config.size` must
    /// equal the connectivity size.
    pub(crate) fn assemble(config: SyncConfig, connectivity: Connectivity) -> Self {
        debug_assert_eq!(config.size, connectivity.size());
        let mut rng = StdRng::seed_from_u64(config.seed);
        let phases = initial_phases(config.initial_phases, config.size, &mut rng);
        let frequencies = (0..config.size)
            .map(|_| rng.gen::<f64>() * config.frequency_factor)
            .collect();

        Self {
            integrator: Integrator::new(SolverKind::default(), config.adaptive),
            connectivity,
            frequencies,
            phases,
            observers: Observers::default(),
            status: RunStatus::Created,
            config,
        }
    }

    /// Oscillator count.
    pub fn size(&self) -> usize {
        self.phases.len()
    }

    /// Construction configuration. `connection` names the layout the
    /// connectivity was built from.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn connectivity(&self) -> &Connectivity {
        &self.connectivity
    }

    /// Natural frequency per oscillator.
    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    /// Current (unwrapped) phases.
    pub fn phases(&self) -> &[f64] {
        &self.phases
    }

    /// Replace the current phases.
    pub fn set_phases(&mut self, phases: &[f64]) -> SyncResult<()> {
        if phases.len() != self.size() {
            return Err(SyncError::dim_mismatch(self.size(), phases.len()));
        }
        if phases.iter().any(|p| !p.is_finite()) {
            return Err(SyncError::InvalidConfig("phases must be finite"));
        }
        self.phases.copy_from_slice(phases);
        Ok(())
    }

    /// Status of the most recent simulation.
    pub fn status(&self) -> RunStatus {
        self.status
    }

    /// Register an observer for all subsequent runs.
    pub fn subscribe(&mut self, observer: Arc<dyn SimulationObserver>) {
        self.observers.subscribe(observer);
    }

    /// Solver statistics accumulated over the network's lifetime.
    pub fn integrator(&self) -> &Integrator {
        &self.integrator
    }

    /// Fixed-run: `steps` reporting steps over `time`.
    pub fn simulate_static(
        &mut self,
        steps: usize,
        time: f64,
        solver: SolverKind,
        collect: bool,
    ) -> SyncResult<SyncDynamic> {
        let previous = self.status;
        self.status = RunStatus::Running;
        self.integrator.set_kind(solver);

        let model = KuramotoCoupling::new(
            &self.connectivity,
            &self.frequencies,
            self.config.weight,
            self.config.qcluster,
        );
        let result = run_fixed(
            &model,
            &mut self.integrator,
            &mut self.phases,
            steps,
            time,
            collect,
            &self.observers,
            global_order,
        );

        self.status = RunStatus::after(&result, previous);
        result
    }

    /// Run-to-convergence on the metric selected in `convergence`.
    pub fn simulate_dynamic(
        &mut self,
        convergence: &ConvergenceConfig,
        solver: SolverKind,
        collect: bool,
    ) -> SyncResult<SyncDynamic> {
        let previous = self.status;
        self.status = RunStatus::Running;
        self.integrator.set_kind(solver);

        let connectivity = &self.connectivity;
        let model = KuramotoCoupling::new(
            connectivity,
            &self.frequencies,
            self.config.weight,
            self.config.qcluster,
        );
        let metric = |phases: &[f64]| match convergence.metric {
            OrderMetric::Global => global_order(phases),
            OrderMetric::Local => local_order(phases, connectivity),
        };
        let result = run_to_convergence(
            &model,
            &mut self.integrator,
            &mut self.phases,
            convergence,
            collect,
            &self.observers,
            metric,
        );

        self.status = RunStatus::after(&result, previous);
        result
    }

    /// Global order of the current phases.
    pub fn sync_order(&self) -> f64 {
        global_order(&self.phases)
    }

    /// Local order of the current phases.
    pub fn sync_local_order(&self) -> f64 {
        local_order(&self.phases, &self.connectivity)
    }

    /// Ensembles of the current phases.
    pub fn allocate_sync_ensembles(&self, tolerance: f64) -> Ensembles {
        allocate_sync_ensembles(&self.phases, tolerance)
    }
}

/// Initial phase vector for `size` oscillators.
pub(crate) fn initial_phases(kind: InitialPhases, size: usize, rng: &mut StdRng) -> Vec<f64> {
    match kind {
        InitialPhases::Equipartition => (0..size).map(|i| PI / size as f64 * i as f64).collect(),
        InitialPhases::RandomUniform => (0..size).map(|_| rng.gen_range(0.0..2.0 * PI)).collect(),
    }
}
