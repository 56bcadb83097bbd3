//! Preflight checks on trial counts and configuration.
//!
//! These never block a test. They flag setups where the permutation null is
//! likely to be coarse or misleading, so the caller can judge the outcome
//! accordingly.
//!
//! # Checks Performed
//!
//! - **Trial count**: fewer than [`MIN_TRIALS_PER_GROUP`] trials in a group
//! - **Repartitions**: fewer distinct draws exist than surrogates requested
//! - **Percentile resolution**: percentile bounds from under
//!   [`MIN_SURR_FOR_PERCENTILES`] surrogates
//! - **Truncation**: trials left out of every time-frequency draw when group
//!   sizes differ

use serde::{Deserialize, Serialize};

use crate::config::ThresholdAggregation;
use crate::statistics::DrawBalance;
use crate::types::Group;

/// Minimum trials per group for a meaningful null.
pub const MIN_TRIALS_PER_GROUP: usize = 5;

/// Minimum surrogates before percentile bounds resolve the tails.
pub const MIN_SURR_FOR_PERCENTILES: usize = 100;

/// How surrogate groups are drawn from the pooled trials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NullDraw {
    /// Shuffle and split the pool.
    Shuffle(DrawBalance),
    /// Coin-labelled draw of `min(n_baseline, n_condition)` trials.
    Mixed,
}

/// Non-fatal issue found before running a test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PreflightWarning {
    /// A group has very few trials.
    FewTrials {
        /// Affected group.
        group: Group,
        /// Trials available.
        n_trials: usize,
        /// Recommended minimum.
        recommended: usize,
    },

    /// The pool admits fewer distinct draws than surrogates requested, so
    /// surrogates repeat.
    FewRepartitions {
        /// Number of distinct draws (may be approximate for large pools).
        distinct: f64,
        /// Surrogates requested.
        n_surr: usize,
    },

    /// Percentile bounds from too few surrogates.
    CoarsePercentiles {
        /// Surrogates requested.
        n_surr: usize,
        /// Recommended minimum.
        recommended: usize,
    },

    /// Truncation to the smaller group leaves trials out of each draw.
    TrialsDiscarded {
        /// Group with the excess trials.
        group: Group,
        /// Trials unused per surrogate.
        per_draw: usize,
    },
}

impl PreflightWarning {
    /// Human-readable description.
    pub fn description(&self) -> String {
        match self {
            PreflightWarning::FewTrials {
                group,
                n_trials,
                recommended,
            } => format!(
                "{:?} has only {} trials ({} recommended); the permutation null will be coarse.",
                group, n_trials, recommended
            ),
            PreflightWarning::FewRepartitions { distinct, n_surr } => format!(
                "Only {:.0} distinct repartitions exist for {} surrogates; surrogates will repeat.",
                distinct, n_surr
            ),
            PreflightWarning::CoarsePercentiles { n_surr, recommended } => format!(
                "Percentile bounds from {} surrogates are unreliable ({} recommended).",
                n_surr, recommended
            ),
            PreflightWarning::TrialsDiscarded { group, per_draw } => format!(
                "{} {:?} trials are left out of every surrogate draw (groups truncated to the smaller size).",
                per_draw, group
            ),
        }
    }
}

/// Binomial coefficient in floating point; saturates to infinity.
fn n_choose_k(n: usize, k: usize) -> f64 {
    if k > n {
        return 0.0;
    }
    let k = k.min(n - k);
    (0..k).fold(1.0, |acc, i| acc * (n - i) as f64 / (i + 1) as f64)
}

/// Number of distinct surrogate draws for a pool.
pub fn distinct_draws(n_baseline: usize, n_condition: usize, draw: NullDraw) -> f64 {
    let n = n_baseline + n_condition;
    let k = n_baseline.min(n_condition);
    match draw {
        NullDraw::Shuffle(DrawBalance::KeepGroupSizes) => n_choose_k(n, n_baseline),
        NullDraw::Shuffle(DrawBalance::TruncateToSmaller) => n_choose_k(n, k) * n_choose_k(n - k, k),
        // any k-subset of the pool can come out of the coin-labelled draw
        NullDraw::Mixed => n_choose_k(n, k),
    }
}

/// Collect warnings for a test about to run. Each warning is also logged at
/// `warn` level.
pub fn check_inputs(
    n_baseline: usize,
    n_condition: usize,
    n_surr: usize,
    draw: NullDraw,
    aggregation: ThresholdAggregation,
) -> Vec<PreflightWarning> {
    let mut warnings = Vec::new();

    for (group, n_trials) in [(Group::Baseline, n_baseline), (Group::Condition, n_condition)] {
        if n_trials < MIN_TRIALS_PER_GROUP {
            warnings.push(PreflightWarning::FewTrials {
                group,
                n_trials,
                recommended: MIN_TRIALS_PER_GROUP,
            });
        }
    }

    let distinct = distinct_draws(n_baseline, n_condition, draw);
    if distinct < n_surr as f64 {
        warnings.push(PreflightWarning::FewRepartitions { distinct, n_surr });
    }

    if matches!(aggregation, ThresholdAggregation::Percentile { .. }) && n_surr < MIN_SURR_FOR_PERCENTILES {
        warnings.push(PreflightWarning::CoarsePercentiles {
            n_surr,
            recommended: MIN_SURR_FOR_PERCENTILES,
        });
    }

    if draw == NullDraw::Shuffle(DrawBalance::TruncateToSmaller) && n_baseline != n_condition {
        let (group, excess) = if n_baseline > n_condition {
            (Group::Baseline, n_baseline - n_condition)
        } else {
            (Group::Condition, n_condition - n_baseline)
        };
        warnings.push(PreflightWarning::TrialsDiscarded {
            group,
            per_draw: excess,
        });
    }

    for w in &warnings {
        log::warn!("{}", w.description());
    }
    warnings
}
