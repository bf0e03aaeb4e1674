//! Pattern memory - associative recall through phase synchronization
//!
//! Training stores bipolar patterns in a Hebbian coupling matrix. Recall
//! starts from a probe pattern (+1 at phase 0, -1 at phase π/2) and lets
//! the network settle; a stored pattern shows up as two antiphase groups.

use std::f64::consts::FRAC_PI_2;
use std::sync::Arc;

use tracing::info;

use crate::config::{ConvergenceConfig, SolverKind, SyncPrConfig};
use crate::coupling::PatternCoupling;
use crate::dynamic::SyncDynamic;
use crate::error::{SyncError, SyncResult};
use crate::observer::{Observers, SimulationObserver};
use crate::order::memory_order;
use crate::simulation::{run_fixed, run_to_convergence, RunStatus};
use crate::solver::Integrator;

/// Oscillatory associative memory.
#[derive(Debug)]
pub struct SyncPr {
    config: SyncPrConfig,
    /// Row-major N x N Hebbian matrix.
    matrix: Vec<f64>,
    phases: Vec<f64>,
    trained: usize,
    integrator: Integrator,
    observers: Observers,
    status: RunStatus,
}

impl SyncPr {
    pub fn new(config: SyncPrConfig) -> SyncResult<Self> {
        config.validate()?;
        let size = config.size;
        Ok(Self {
            matrix: vec![0.0; size * size],
            phases: vec![0.0; size],
            trained: 0,
            integrator: Integrator::new(SolverKind::default(), config.adaptive),
            observers: Observers::default(),
            status: RunStatus::Created,
            config,
        })
    }

    /// Oscillator count (pattern length).
    pub fn size(&self) -> usize {
        self.config.size
    }

    /// Number of patterns stored by the last training.
    pub fn pattern_count(&self) -> usize {
        self.trained
    }

    /// Hebbian coupling between two oscillators.
    pub fn coupling(&self, i: usize, j: usize) -> Option<f64> {
        (i < self.size() && j < self.size()).then(|| self.matrix[i * self.size() + j])
    }

    pub fn phases(&self) -> &[f64] {
        &self.phases
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn subscribe(&mut self, observer: Arc<dyn SimulationObserver>) {
        self.observers.subscribe(observer);
    }

    /// Replace the coupling matrix with Σ pᵢ pⱼ over `patterns`.
    ///
    /// All patterns are validated before anything is overwritten.
    pub fn train(&mut self, patterns: &[Vec<f64>]) -> SyncResult<()> {
        if patterns.is_empty() {
            return Err(SyncError::EmptyInput("patterns"));
        }
        for pattern in patterns {
            self.validate_pattern(pattern)?;
        }

        let size = self.size();
        self.matrix.fill(0.0);
        for pattern in patterns {
            for i in 0..size {
                for j in 0..size {
                    if i != j {
                        self.matrix[i * size + j] += pattern[i] * pattern[j];
                    }
                }
            }
        }
        self.trained = patterns.len();

        info!(patterns = patterns.len(), size, "pattern memory trained");
        Ok(())
    }

    /// Fixed-run recall of `pattern`.
    pub fn simulate_static(
        &mut self,
        steps: usize,
        time: f64,
        pattern: &[f64],
        solver: SolverKind,
        collect: bool,
    ) -> SyncResult<SyncDynamic> {
        self.prepare(pattern, solver)?;
        let previous = self.status;
        self.status = RunStatus::Running;

        let model = PatternCoupling::new(
            &self.matrix,
            self.config.size,
            self.config.increase_strength1,
            self.config.increase_strength2,
        );
        let result = run_fixed(
            &model,
            &mut self.integrator,
            &mut self.phases,
            steps,
            time,
            collect,
            &self.observers,
            |phases: &[f64]| memory_order(phases, pattern),
        );

        self.status = RunStatus::after(&result, previous);
        result
    }

    /// Recall `pattern` until its memory order reaches `order`.
    ///
    /// `step` is the reporting step; sub-steps are a tenth of it.
    pub fn simulate_dynamic(
        &mut self,
        pattern: &[f64],
        order: f64,
        solver: SolverKind,
        collect: bool,
        step: f64,
    ) -> SyncResult<SyncDynamic> {
        let convergence = ConvergenceConfig::new(order).with_steps(step, step / 10.0);
        self.simulate_until(pattern, &convergence, solver, collect)
    }

    /// Recall `pattern` with an explicit convergence configuration. The
    /// watched metric is always the memory order of `pattern`.
    pub fn simulate_until(
        &mut self,
        pattern: &[f64],
        convergence: &ConvergenceConfig,
        solver: SolverKind,
        collect: bool,
    ) -> SyncResult<SyncDynamic> {
        convergence.validate()?;
        self.prepare(pattern, solver)?;
        let previous = self.status;
        self.status = RunStatus::Running;

        let model = PatternCoupling::new(
            &self.matrix,
            self.config.size,
            self.config.increase_strength1,
            self.config.increase_strength2,
        );
        let result = run_to_convergence(
            &model,
            &mut self.integrator,
            &mut self.phases,
            convergence,
            collect,
            &self.observers,
            |phases: &[f64]| memory_order(phases, pattern),
        );

        self.status = RunStatus::after(&result, previous);
        result
    }

    /// Overlap of the current phases with `pattern`. Read-only.
    pub fn memory_order(&self, pattern: &[f64]) -> SyncResult<f64> {
        self.validate_pattern(pattern)?;
        Ok(memory_order(&self.phases, pattern))
    }

    /// Patterns must have one bipolar value per oscillator.
    pub fn validate_pattern(&self, pattern: &[f64]) -> SyncResult<()> {
        if pattern.len() != self.size() {
            return Err(SyncError::dim_mismatch(self.size(), pattern.len()));
        }
        match pattern.iter().position(|&v| v != 1.0 && v != -1.0) {
            Some(index) => Err(SyncError::invalid_pattern(format!(
                "value {} at index {} is not bipolar",
                pattern[index], index
            ))),
            None => Ok(()),
        }
    }

    fn prepare(&mut self, pattern: &[f64], solver: SolverKind) -> SyncResult<()> {
        self.validate_pattern(pattern)?;
        for (phase, &p) in self.phases.iter_mut().zip(pattern) {
            *phase = if p > 0.0 { 0.0 } else { FRAC_PI_2 };
        }
        self.integrator.set_kind(solver);
        Ok(())
    }
}
