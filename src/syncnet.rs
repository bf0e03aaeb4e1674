//! Oscillatory clustering networks built from data
//!
//! Each input point becomes an oscillator. [`SyncNet`] connects points
//! within a fixed radius; [`HSyncNet`] grows the radius until the
//! connectivity has at most the requested number of components. Both then
//! run to convergence on local order and read clusters off the phases.

use std::sync::Arc;

use crate::config::{
    ConnectionType, ConvergenceConfig, HSyncNetConfig, OrderMetric, SolverKind, SyncConfig,
    SyncNetConfig,
};
use crate::dynamic::SyncDynamic;
use crate::ensemble::Ensembles;
use crate::error::SyncResult;
use crate::observer::SimulationObserver;
use crate::simulation::RunStatus;
use crate::sync::SyncNetwork;
use crate::topology::{build_hierarchical, Connectivity, HierarchicalTopology};

/// Customary phase tolerance for reading clusters off a converged network.
pub const DEFAULT_CLUSTER_TOLERANCE: f64 = 0.05;

/// Radius-based oscillatory clustering network.
#[derive(Debug)]
pub struct SyncNet {
    network: SyncNetwork,
    radius: f64,
}

impl SyncNet {
    /// Connect every pair of points within `config.radius`.
    pub fn new(points: &[Vec<f64>], config: SyncNetConfig) -> SyncResult<Self> {
        config.validate()?;
        let connectivity = Connectivity::build_static(points, config.radius, config.weighted)?;

        // Layout comes from the data; the inner network never exposes its config
        let base = SyncConfig::new(points.len(), 1.0, ConnectionType::AllToAll)
            .with_initial_phases(config.initial_phases)
            .with_seed(config.seed);
        let base = SyncConfig {
            adaptive: config.adaptive,
            ..base
        };

        Ok(Self {
            network: SyncNetwork::assemble(base, connectivity),
            radius: config.radius,
        })
    }

    /// Run until local order reaches `order`.
    pub fn process(&mut self, order: f64, solver: SolverKind, collect: bool) -> SyncResult<SyncDynamic> {
        let convergence = ConvergenceConfig::new(order).with_metric(OrderMetric::Local);
        self.network.simulate_dynamic(&convergence, solver, collect)
    }

    /// Run with an explicit convergence configuration.
    pub fn process_with(
        &mut self,
        convergence: &ConvergenceConfig,
        solver: SolverKind,
        collect: bool,
    ) -> SyncResult<SyncDynamic> {
        self.network.simulate_dynamic(convergence, solver, collect)
    }

    /// Clusters of the current phases.
    pub fn clusters(&self, tolerance: f64) -> Ensembles {
        self.network.allocate_sync_ensembles(tolerance)
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn size(&self) -> usize {
        self.network.size()
    }

    pub fn status(&self) -> RunStatus {
        self.network.status()
    }

    pub fn connectivity(&self) -> &Connectivity {
        self.network.connectivity()
    }

    /// Current oscillator phases, one per data point.
    pub fn phases(&self) -> &[f64] {
        self.network.phases()
    }

    /// Local order of the current phases over the radius graph.
    pub fn local_order(&self) -> f64 {
        self.network.sync_local_order()
    }

    pub fn subscribe(&mut self, observer: Arc<dyn SimulationObserver>) {
        self.network.subscribe(observer);
    }
}

/// Hierarchical oscillatory clustering network.
///
/// Construction fails with [`crate::SyncError::HierarchyNotReached`] when
/// the growth bound is exhausted before the component count reaches the
/// target.
#[derive(Debug)]
pub struct HSyncNet {
    network: SyncNetwork,
    clusters: usize,
    radius: f64,
    iterations: usize,
}

impl HSyncNet {
    pub fn new(points: &[Vec<f64>], config: HSyncNetConfig) -> SyncResult<Self> {
        config.validate()?;
        let HierarchicalTopology {
            connectivity,
            radius,
            iterations,
            ..
        } = build_hierarchical(
            points,
            config.clusters,
            config.initial_neighbors,
            config.growth_fraction,
            config.max_iterations,
        )?;

        // Layout comes from the data; the inner network never exposes its config
        let base = SyncConfig::new(points.len(), 1.0, ConnectionType::AllToAll)
            .with_initial_phases(config.initial_phases)
            .with_seed(config.seed);
        let base = SyncConfig {
            adaptive: config.adaptive,
            ..base
        };

        Ok(Self {
            network: SyncNetwork::assemble(base, connectivity),
            clusters: config.clusters,
            radius,
            iterations,
        })
    }

    /// Run until local order reaches `order`.
    pub fn process(&mut self, order: f64, solver: SolverKind, collect: bool) -> SyncResult<SyncDynamic> {
        let convergence = ConvergenceConfig::new(order).with_metric(OrderMetric::Local);
        self.network.simulate_dynamic(&convergence, solver, collect)
    }

    /// Clusters of the current phases.
    pub fn clusters(&self, tolerance: f64) -> Ensembles {
        self.network.allocate_sync_ensembles(tolerance)
    }

    /// Requested cluster count.
    pub fn target_clusters(&self) -> usize {
        self.clusters
    }

    /// Radius the growth stopped at.
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Growth iterations performed.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn size(&self) -> usize {
        self.network.size()
    }

    pub fn status(&self) -> RunStatus {
        self.network.status()
    }

    pub fn connectivity(&self) -> &Connectivity {
        self.network.connectivity()
    }

    /// Current oscillator phases, one per data point.
    pub fn phases(&self) -> &[f64] {
        self.network.phases()
    }

    /// Local order of the current phases over the radius graph.
    pub fn local_order(&self) -> f64 {
        self.network.sync_local_order()
    }

    pub fn subscribe(&mut self, observer: Arc<dyn SimulationObserver>) {
        self.network.subscribe(observer);
    }
}
