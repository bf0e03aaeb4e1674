//! Network configuration

use crate::error::{SyncError, SyncResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Initial phase layout of a network.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum InitialPhases {
    /// Phases spread evenly over [0, π) in index order. Deterministic.
    #[default]
    Equipartition,
    /// Phases drawn uniformly from [0, 2π) using the configured seed.
    RandomUniform,
}

/// Integration strategy used by the solver engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SolverKind {
    /// Explicit single-stage (Euler).
    #[default]
    Fast,
    /// Classical four-stage Runge-Kutta.
    Rk4,
    /// Runge-Kutta-Fehlberg 4(5) with local error control.
    Rkf45,
}

/// Connection layout of a base network.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ConnectionType {
    /// Every oscillator coupled to every other one.
    #[default]
    AllToAll,
    /// Square grid, von Neumann neighbourhood.
    GridFour,
    /// Square grid, Moore neighbourhood.
    GridEight,
    /// Chain: each oscillator coupled to its predecessor and successor.
    ListBidir,
    /// No coupling.
    None,
}

/// Synchronization metric watched by run-to-convergence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum OrderMetric {
    /// Whole-network order parameter.
    #[default]
    Global,
    /// Neighbourhood-averaged order parameter.
    Local,
}

/// What the plateau guard compares between reporting steps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PlateauMetric {
    /// Largest phase change of any oscillator relative to the mean
    /// advance. A locked group rotating at a common frequency reads as
    /// zero change.
    #[default]
    StateChange,
    /// Change of the watched order parameter.
    OrderChange,
}

/// Error control for the adaptive solver.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AdaptiveParams {
    /// Maximum accepted local truncation error per sub-step.
    pub tolerance: f64,
    /// Lower bound of the sub-step.
    pub min_step: f64,
    /// Upper bound of the sub-step.
    pub max_step: f64,
}

impl Default for AdaptiveParams {
    fn default() -> Self {
        Self {
            tolerance: 1e-6,
            min_step: 1e-6,
            max_step: 0.1,
        }
    }
}

impl AdaptiveParams {
    /// Validate configuration.
    pub fn validate(&self) -> SyncResult<()> {
        if !(self.tolerance > 0.0) {
            return Err(SyncError::InvalidConfig("tolerance must be > 0"));
        }
        if !(self.min_step > 0.0) {
            return Err(SyncError::InvalidConfig("min_step must be > 0"));
        }
        if !(self.max_step >= self.min_step) {
            return Err(SyncError::InvalidConfig("max_step must be >= min_step"));
        }
        Ok(())
    }
}

/// Configuration of the base phase-oscillator network.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SyncConfig {
    /// Number of oscillators.
    pub size: usize,

    /// Coupling strength K.
    pub weight: f64,

    /// Natural frequencies are drawn uniformly from [0, frequency_factor).
    pub frequency_factor: f64,

    /// Phase multiplier q of the coupling term sin(q (θj - θi)).
    pub qcluster: u32,

    /// Connection layout.
    pub connection: ConnectionType,

    /// Initial phase layout.
    pub initial_phases: InitialPhases,

    /// Seed for random phases and frequencies.
    pub seed: u64,

    /// Adaptive solver bounds.
    pub adaptive: AdaptiveParams,
}

impl SyncConfig {
    /// Create a standard configuration: zero natural frequencies, qcluster 1.
    pub fn new(size: usize, weight: f64, connection: ConnectionType) -> Self {
        Self {
            size,
            weight,
            frequency_factor: 0.0,
            qcluster: 1,
            connection,
            initial_phases: InitialPhases::Equipartition,
            seed: 0,
            adaptive: AdaptiveParams::default(),
        }
    }

    pub fn with_frequency_factor(mut self, factor: f64) -> Self {
        self.frequency_factor = factor;
        self
    }

    pub fn with_qcluster(mut self, qcluster: u32) -> Self {
        self.qcluster = qcluster;
        self
    }

    pub fn with_initial_phases(mut self, initial_phases: InitialPhases) -> Self {
        self.initial_phases = initial_phases;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> SyncResult<()> {
        if self.size == 0 {
            return Err(SyncError::InvalidConfig("size must be > 0"));
        }
        if !self.weight.is_finite() {
            return Err(SyncError::InvalidConfig("weight must be finite"));
        }
        if !(self.frequency_factor.is_finite() && self.frequency_factor >= 0.0) {
            return Err(SyncError::InvalidConfig("frequency_factor must be >= 0"));
        }
        if self.qcluster == 0 {
            return Err(SyncError::InvalidConfig("qcluster must be > 0"));
        }
        self.adaptive.validate()
    }
}

/// Stop conditions of a run-to-convergence simulation.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConvergenceConfig {
    /// Target order in [0, 1].
    pub order: f64,

    /// Reporting step.
    pub step: f64,

    /// Integration sub-step, strictly smaller than `step`.
    pub int_step: f64,

    /// Plateau guard: stop when the change between reporting steps drops below this.
    pub threshold_changes: f64,

    /// Quantity compared by the plateau guard.
    pub plateau: PlateauMetric,

    /// Upper bound of reporting steps.
    pub max_steps: usize,

    /// Order parameter compared against `order`.
    pub metric: OrderMetric,
}

impl Default for ConvergenceConfig {
    fn default() -> Self {
        Self {
            order: 0.998,
            step: 0.1,
            int_step: 0.01,
            threshold_changes: 1e-7,
            plateau: PlateauMetric::StateChange,
            max_steps: 10_000,
            metric: OrderMetric::Global,
        }
    }
}

impl ConvergenceConfig {
    /// Create with a target order and default steps.
    pub fn new(order: f64) -> Self {
        Self {
            order,
            ..Self::default()
        }
    }

    pub fn with_steps(mut self, step: f64, int_step: f64) -> Self {
        self.step = step;
        self.int_step = int_step;
        self
    }

    pub fn with_metric(mut self, metric: OrderMetric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_plateau(mut self, plateau: PlateauMetric, threshold_changes: f64) -> Self {
        self.plateau = plateau;
        self.threshold_changes = threshold_changes;
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> SyncResult<()> {
        if !(0.0..=1.0).contains(&self.order) {
            return Err(SyncError::InvalidConfig("order must be in [0, 1]"));
        }
        if !(self.step > 0.0 && self.step.is_finite()) {
            return Err(SyncError::InvalidConfig("step must be > 0"));
        }
        if !(self.int_step > 0.0 && self.int_step < self.step) {
            return Err(SyncError::InvalidConfig("int_step must be in (0, step)"));
        }
        if !(self.threshold_changes >= 0.0) {
            return Err(SyncError::InvalidConfig("threshold_changes must be >= 0"));
        }
        if self.max_steps == 0 {
            return Err(SyncError::InvalidConfig("max_steps must be > 0"));
        }
        Ok(())
    }
}

/// Configuration of the radius-based clustering network.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SyncNetConfig {
    /// Connectivity radius between data points.
    pub radius: f64,

    /// Scale coupling inversely with distance.
    pub weighted: bool,

    /// Initial phase layout.
    pub initial_phases: InitialPhases,

    /// Seed for random phases.
    pub seed: u64,

    /// Adaptive solver bounds.
    pub adaptive: AdaptiveParams,
}

impl SyncNetConfig {
    pub fn new(radius: f64) -> Self {
        Self {
            radius,
            weighted: false,
            initial_phases: InitialPhases::Equipartition,
            seed: 0,
            adaptive: AdaptiveParams::default(),
        }
    }

    pub fn with_weights(mut self, weighted: bool) -> Self {
        self.weighted = weighted;
        self
    }

    pub fn with_initial_phases(mut self, initial_phases: InitialPhases) -> Self {
        self.initial_phases = initial_phases;
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> SyncResult<()> {
        if !(self.radius > 0.0 && self.radius.is_finite()) {
            return Err(SyncError::InvalidConfig("radius must be > 0"));
        }
        self.adaptive.validate()
    }
}

/// Configuration of the hierarchical clustering network.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HSyncNetConfig {
    /// Number of clusters to allocate.
    pub clusters: usize,

    /// Neighbour count used to estimate the initial radius.
    pub initial_neighbors: usize,

    /// Radius growth per iteration as a fraction of the current radius.
    pub growth_fraction: f64,

    /// Upper bound of growth iterations.
    pub max_iterations: usize,

    /// Initial phase layout.
    pub initial_phases: InitialPhases,

    /// Seed for random phases.
    pub seed: u64,

    /// Adaptive solver bounds.
    pub adaptive: AdaptiveParams,
}

impl HSyncNetConfig {
    pub fn new(clusters: usize) -> Self {
        Self {
            clusters,
            initial_neighbors: 3,
            growth_fraction: 0.1,
            max_iterations: 1000,
            initial_phases: InitialPhases::Equipartition,
            seed: 0,
            adaptive: AdaptiveParams::default(),
        }
    }

    pub fn with_growth(mut self, initial_neighbors: usize, growth_fraction: f64) -> Self {
        self.initial_neighbors = initial_neighbors;
        self.growth_fraction = growth_fraction;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> SyncResult<()> {
        if self.clusters == 0 {
            return Err(SyncError::InvalidConfig("clusters must be > 0"));
        }
        if self.initial_neighbors == 0 {
            return Err(SyncError::InvalidConfig("initial_neighbors must be > 0"));
        }
        if !(self.growth_fraction > 0.0 && self.growth_fraction.is_finite()) {
            return Err(SyncError::InvalidConfig("growth_fraction must be > 0"));
        }
        if self.max_iterations == 0 {
            return Err(SyncError::InvalidConfig("max_iterations must be > 0"));
        }
        self.adaptive.validate()
    }
}

/// Configuration of the pattern memory network.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SyncPrConfig {
    /// Number of oscillators (pattern length).
    pub size: usize,

    /// Strength of the second harmonic term sin(2Δθ).
    pub increase_strength1: f64,

    /// Strength of the third harmonic term sin(3Δθ).
    pub increase_strength2: f64,

    /// Adaptive solver bounds.
    pub adaptive: AdaptiveParams,
}

impl SyncPrConfig {
    pub fn new(size: usize, increase_strength1: f64, increase_strength2: f64) -> Self {
        Self {
            size,
            increase_strength1,
            increase_strength2,
            adaptive: AdaptiveParams::default(),
        }
    }

    /// Validate configuration.
    pub fn validate(&self) -> SyncResult<()> {
        if self.size == 0 {
            return Err(SyncError::InvalidConfig("size must be > 0"));
        }
        if !(self.increase_strength1.is_finite() && self.increase_strength2.is_finite()) {
            return Err(SyncError::InvalidConfig("increase strengths must be finite"));
        }
        self.adaptive.validate()
    }
}

/// Dynamics parameters of the LEGION network.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LegionParameters {
    /// Timescale separation of the inhibitory variable.
    pub eps: f64,
    /// Decay rate of the lateral potential gate exp(-alpha t).
    pub alpha: f64,
    /// Inhibitor gain.
    pub gamma: f64,
    /// Steepness of the inhibitor sigmoid.
    pub betta: f64,
    /// Potential growth rate.
    pub lamda: f64,
    /// Potential threshold for stimulus gating.
    pub teta: f64,
    /// Excitatory activity threshold.
    pub teta_x: f64,
    /// Lateral potential threshold.
    pub teta_p: f64,
    /// Global inhibitor threshold acting on oscillators.
    pub teta_xz: f64,
    /// Oscillator threshold acting on the global inhibitor.
    pub teta_zx: f64,
    /// Permanent connection weight to the potential.
    pub t: f64,
    /// Potential decay rate.
    pub mu: f64,
    /// Global inhibitor weight.
    pub wz: f64,
    /// Total dynamic connection weight per oscillator.
    pub wt: f64,
    /// Global inhibitor rate.
    pub fi: f64,
    /// Noise amplitude.
    pub ro: f64,
    /// Stimulus value applied to stimulated oscillators.
    pub i: f64,
    /// Enable the lateral potential gate.
    pub enable_potential: bool,
}

impl Default for LegionParameters {
    fn default() -> Self {
        Self {
            eps: 0.02,
            alpha: 0.005,
            gamma: 6.0,
            betta: 0.1,
            lamda: 0.1,
            teta: 0.9,
            teta_x: -1.5,
            teta_p: 1.5,
            teta_xz: 0.1,
            teta_zx: 0.1,
            t: 2.0,
            mu: 0.01,
            wz: 1.5,
            wt: 8.0,
            fi: 3.0,
            ro: 0.02,
            i: 0.2,
            enable_potential: true,
        }
    }
}

impl LegionParameters {
    /// Validate configuration.
    pub fn validate(&self) -> SyncResult<()> {
        let values = [
            self.eps, self.alpha, self.gamma, self.betta, self.lamda, self.teta, self.teta_x,
            self.teta_p, self.teta_xz, self.teta_zx, self.t, self.mu, self.wz, self.wt, self.fi,
            self.ro, self.i,
        ];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(SyncError::InvalidConfig("legion parameters must be finite"));
        }
        if self.betta == 0.0 {
            return Err(SyncError::InvalidConfig("betta must be non-zero"));
        }
        if self.ro < 0.0 {
            return Err(SyncError::InvalidConfig("ro must be >= 0"));
        }
        Ok(())
    }
}

/// Configuration of the LEGION network.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LegionConfig {
    /// Number of oscillators.
    pub size: usize,

    /// Connection layout.
    pub connection: ConnectionType,

    /// Dynamics parameters.
    pub params: LegionParameters,

    /// Seed for noise.
    pub seed: u64,

    /// Adaptive solver bounds.
    pub adaptive: AdaptiveParams,
}

impl LegionConfig {
    pub fn new(size: usize, connection: ConnectionType) -> Self {
        Self {
            size,
            connection,
            params: LegionParameters::default(),
            seed: 0,
            adaptive: AdaptiveParams::default(),
        }
    }

    pub fn with_params(mut self, params: LegionParameters) -> Self {
        self.params = params;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> SyncResult<()> {
        if self.size == 0 {
            return Err(SyncError::InvalidConfig("size must be > 0"));
        }
        self.params.validate()?;
        self.adaptive.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_config_validate() {
        assert!(SyncConfig::new(10, 1.0, ConnectionType::AllToAll)
            .validate()
            .is_ok());
        assert_eq!(
            SyncConfig::new(0, 1.0, ConnectionType::AllToAll).validate(),
            Err(SyncError::InvalidConfig("size must be > 0"))
        );
        assert!(SyncConfig::new(10, f64::NAN, ConnectionType::AllToAll)
            .validate()
            .is_err());
        assert!(SyncConfig::new(10, 1.0, ConnectionType::AllToAll)
            .with_qcluster(0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_convergence_config_requires_smaller_int_step() {
        assert!(ConvergenceConfig::default().validate().is_ok());
        assert!(ConvergenceConfig::new(0.99)
            .with_steps(0.1, 0.1)
            .validate()
            .is_err());
        assert!(ConvergenceConfig::new(1.5).validate().is_err());
        assert!(ConvergenceConfig::new(0.9)
            .with_max_steps(0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_radius_must_be_positive() {
        assert!(SyncNetConfig::new(0.0).validate().is_err());
        assert!(SyncNetConfig::new(-1.0).validate().is_err());
        assert!(SyncNetConfig::new(0.5).validate().is_ok());
    }

    #[test]
    fn test_hsyncnet_config_validate() {
        assert!(HSyncNetConfig::new(0).validate().is_err());
        assert!(HSyncNetConfig::new(2).with_growth(0, 0.1).validate().is_err());
        assert!(HSyncNetConfig::new(2).with_growth(3, 0.0).validate().is_err());
        assert!(HSyncNetConfig::new(2).validate().is_ok());
    }

    #[test]
    fn test_adaptive_bounds() {
        let bad = AdaptiveParams {
            tolerance: 1e-6,
            min_step: 0.1,
            max_step: 0.01,
        };
        assert!(bad.validate().is_err());
        assert!(AdaptiveParams::default().validate().is_ok());
    }

    #[test]
    fn test_legion_defaults_valid() {
        assert!(LegionConfig::new(16, ConnectionType::GridFour)
            .validate()
            .is_ok());
        let mut params = LegionParameters::default();
        params.betta = 0.0;
        assert!(LegionConfig::new(4, ConnectionType::AllToAll)
            .with_params(params)
            .validate()
            .is_err());
    }
}
