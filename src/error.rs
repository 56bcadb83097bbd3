//! Error type shared by every stage of the engine.

use thiserror::Error;

/// Failure reasons for a permutation-cluster test.
///
/// Every error is reported synchronously; nothing is retried because the
/// computation is deterministic given its inputs and seed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClusterError {
    /// Empty arrays, mismatched trailing shapes, non-finite values,
    /// `n_surr < 1`, or bounds that cannot be broadcast onto the statistic.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Every surrogate produced the same value for this bin, so bounds
    /// derived from it would be meaningless.
    #[error("degenerate surrogate distribution in bin {bin}: zero variance across {n_surr} surrogates")]
    DegenerateDistribution {
        /// Bound bin (0 for global bounds, frequency row otherwise).
        bin: usize,
        /// Number of surrogates that were inspected.
        n_surr: usize,
    },

    /// Unrecognized mode string or out-of-range configuration value.
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ClusterError>;

impl ClusterError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        ClusterError::InvalidInput(msg.into())
    }

    pub(crate) fn config(msg: impl Into<String>) -> Self {
        ClusterError::Configuration(msg.into())
    }
}
