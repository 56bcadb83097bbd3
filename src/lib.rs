//! # permutation-cluster
//!
//! Non-parametric permutation-cluster tests for trial-based signals.
//!
//! Two groups of trials (baseline and condition) are compared without any
//! distributional assumption:
//! - A null distribution is built by repeatedly shuffling the pooled trials
//!   and recomputing the grouped difference (a *surrogate*)
//! - Extremes of the surrogates are aggregated into rejection bounds
//! - Samples of the observed difference outside the bounds form a mask
//! - Connected regions of the mask that are too small are discarded
//!
//! Three shapes are supported: one scalar per trial
//! ([`PermutationTest::test_global`]), one signal per trial
//! ([`PermutationTest::test_1d`]) and one time-frequency map per trial
//! ([`PermutationTest::test_2d`], [`PermutationTest::test_2d_per_condition`]).
//!
//! ## Quick Start
//!
//! ```ignore
//! use permutation_cluster::{cluster_1d, TrialArray};
//!
//! let baseline = TrialArray::from_signals(&baseline_trials)?;
//! let condition = TrialArray::from_signals(&condition_trials)?;
//!
//! let outcome = cluster_1d(&baseline, &condition)?;
//! println!("{} significant samples", outcome.n_significant());
//! ```
//!
//! ## Logging
//!
//! Progress, preflight warnings and stage summaries go through the `log`
//! facade. No logger is installed; attach one (e.g. `env_logger`) to see them.

#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
mod config;
mod engine;
mod error;
mod progress;
mod result;
mod types;

// Functional modules
pub mod analysis;
pub mod output;
pub mod preflight;
pub mod statistics;
pub mod thread_pool;

// Re-exports for public API
pub use config::{
    Config, Connectivity, GroupedStatistic, SurrogateStatistic, ThresholdAggregation,
    DEFAULT_PERCENTILES,
};
pub use engine::PermutationTest;
pub use error::{ClusterError, Result};
pub use progress::{milestone_count, ProgressCallback};
pub use result::{
    ClusterOutcome, ConditionMasks, GlobalVerdict, GroupMask, Metadata, TestKind,
};
pub use types::{BoundVector, Group, Mask, StatMatrix, TrialArray};

/// Signal cluster test with default configuration.
///
/// Equivalent to `PermutationTest::new().test_1d(baseline, condition)`.
///
/// # Errors
///
/// See [`PermutationTest::test_1d`].
pub fn cluster_1d(baseline: &TrialArray, condition: &TrialArray) -> Result<ClusterOutcome> {
    PermutationTest::new().test_1d(baseline, condition)
}

/// Time-frequency cluster test with default configuration.
///
/// Equivalent to `PermutationTest::new().test_2d(baseline, condition)`.
///
/// # Errors
///
/// See [`PermutationTest::test_2d`].
pub fn cluster_2d(baseline: &TrialArray, condition: &TrialArray) -> Result<ClusterOutcome> {
    PermutationTest::new().test_2d(baseline, condition)
}
