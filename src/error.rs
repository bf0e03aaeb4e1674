//! Error types for oscillatory network construction and simulation.

use thiserror::Error;

/// Result type for oscillatory network operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors raised by network construction, simulation and handle management.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SyncError {
    /// Configuration rejected at creation time. No object is produced.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    /// Input vector length does not match the network.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },

    /// Pattern contains values other than -1 / +1.
    #[error("invalid pattern: {0}")]
    InvalidPattern(String),

    /// Empty input data.
    #[error("empty input: {0}")]
    EmptyInput(&'static str),

    /// Solver produced a non-finite state.
    #[error("simulation diverged at t = {time}")]
    Diverged {
        /// Simulation time of the last finite state.
        time: f64,
    },

    /// Hierarchical radius growth exhausted its iteration bound.
    #[error("hierarchical topology stopped at {components} components (target {target}) after {iterations} iterations")]
    HierarchyNotReached {
        /// Requested cluster count.
        target: usize,
        /// Component count at the last iteration.
        components: usize,
        /// Iterations performed.
        iterations: usize,
    },

    /// Handle was already destroyed or never issued by this registry.
    #[error("stale handle: slot {slot}, generation {generation}")]
    StaleHandle {
        /// Slot index of the handle.
        slot: usize,
        /// Generation carried by the handle.
        generation: u32,
    },
}

impl SyncError {
    /// Create a dimension mismatch error.
    #[must_use]
    pub fn dim_mismatch(expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch { expected, actual }
    }

    /// Create an invalid pattern error.
    #[must_use]
    pub fn invalid_pattern(msg: impl Into<String>) -> Self {
        Self::InvalidPattern(msg.into())
    }

    /// True for the failure terminal state of a simulation.
    pub fn is_divergence(&self) -> bool {
        matches!(self, Self::Diverged { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let errors = vec![
            SyncError::InvalidConfig("size must be > 0"),
            SyncError::dim_mismatch(10, 5),
            SyncError::invalid_pattern("value 0.5 at index 2"),
            SyncError::EmptyInput("sample"),
            SyncError::Diverged { time: 1.5 },
            SyncError::HierarchyNotReached {
                target: 2,
                components: 5,
                iterations: 100,
            },
            SyncError::StaleHandle {
                slot: 0,
                generation: 1,
            },
        ];

        for err in &errors {
            assert!(!err.to_string().is_empty());
        }
        assert_eq!(
            SyncError::dim_mismatch(10, 5).to_string(),
            "dimension mismatch: expected 10, got 5"
        );
    }

    #[test]
    fn test_is_divergence() {
        assert!(SyncError::Diverged { time: 0.0 }.is_divergence());
        assert!(!SyncError::InvalidConfig("x").is_divergence());
    }
}
