//! Oscillatory Networks - phase synchronization engine for clustering
//!
//! Oscillators that are coupled strongly enough fall into step. Clusters are
//! read off the phases.
//!
//! # Core Types
//!
//! - **SyncNetwork**: Kuramoto phase oscillators on a fixed connection layout
//! - **SyncNet / HSyncNet**: one oscillator per data point, coupled by radius
//! - **SyncPr**: Hebbian pattern memory recalled through synchronization
//! - **LegionNetwork**: relaxation oscillators with a global inhibitor
//! - **SyncDynamic**: recorded (time, state) trajectory of one run
//! - **Ensembles**: partition of oscillator indices into synchronous groups
//!
//! # Architecture: Topology / Coupling / Solver
//!
//! 1. **Topology** - who is coupled to whom (layout, radius or grown radius)
//! 2. **Coupling** - phase velocity law over the topology (`OdeSystem`)
//! 3. **Solver** - Euler, RK4 or adaptive RKF45 integration of the coupling
//!
//! A simulate call drives the solver either for a fixed number of steps or
//! until an order parameter reaches a target, the state stops changing, or a
//! step bound is hit. Subscribed observers are notified after every
//! reporting step.
//!
//! # Example: Clustering Two Groups of Points
//!
//! ```rust
//! use oscnet::{SolverKind, SyncNet, SyncNetConfig};
//!
//! let points = vec![
//!     vec![0.0, 0.0],
//!     vec![0.1, 0.0],
//!     vec![0.0, 0.1],
//!     vec![4.0, 4.0],
//!     vec![4.1, 4.0],
//!     vec![4.0, 4.1],
//! ];
//!
//! // Points closer than 0.5 are coupled
//! let mut network = SyncNet::new(&points, SyncNetConfig::new(0.5))?;
//!
//! // Run until every neighbourhood is synchronous
//! let dynamic = network.process(0.9999, SolverKind::Rk4, false)?;
//! assert!(dynamic.status().is_terminal());
//!
//! let clusters = network.clusters(0.05);
//! assert_eq!(clusters.into_inner(), vec![vec![0, 1, 2], vec![3, 4, 5]]);
//! # Ok::<(), oscnet::SyncError>(())
//! ```
//!
//! # Ownership
//!
//! Networks and results are plain owned values. Callers that need opaque
//! ids keep them in a [`HandleRegistry`], which destroys each object exactly
//! once and counts what is still live.

mod config;
mod coupling;
mod dynamic;
mod ensemble;
mod error;
mod handle;
mod legion;
mod observer;
mod order;
mod simulation;
mod solver;
mod sync;
mod syncnet;
mod syncpr;
mod topology;

pub use config::{
    AdaptiveParams, ConnectionType, ConvergenceConfig, HSyncNetConfig, InitialPhases, LegionConfig,
    LegionParameters, OrderMetric, PlateauMetric, SolverKind, SyncConfig, SyncNetConfig,
    SyncPrConfig,
};
pub use coupling::{KuramotoCoupling, OdeSystem, PatternCoupling};
pub use dynamic::SyncDynamic;
pub use ensemble::{allocate_activity_ensembles, allocate_sync_ensembles, Ensembles};
pub use error::{SyncError, SyncResult};
pub use handle::{Handle, HandleRegistry};
pub use legion::{LegionDynamic, LegionNetwork, DEFAULT_ACTIVITY_THRESHOLD};
pub use observer::{ChannelObserver, FnObserver, Observers, SimulationEvent, SimulationObserver};
pub use order::{
    circular_distance, global_order, local_order, max_phase_change, max_relative_phase_change,
    memory_order, order_parameter,
};
pub use simulation::RunStatus;
pub use solver::{Integrator, IntegratorStats};
pub use sync::SyncNetwork;
pub use syncnet::{HSyncNet, SyncNet, DEFAULT_CLUSTER_TOLERANCE};
pub use syncpr::SyncPr;
pub use topology::{
    average_neighbor_distance, build_hierarchical, euclidean, Connectivity, HierarchicalTopology,
    TopologyKind,
};
