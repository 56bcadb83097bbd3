//! Statistical building blocks for the permutation engine.
//!
//! - Quantiles and percentiles with NumPy-compatible linear interpolation
//! - Grouped statistics (mean/median across trials) and the pooled trial view
//! - Counter-seeded random repartitions of pooled trials
//! - Z-score and robust-score normalization

mod grouped;
mod normalize;
mod permutation;
mod quantile;

pub use grouped::{grouped_difference, grouped_statistic, TrialPool};
pub(crate) use grouped::{pooled_difference, reduce_trials};
pub use normalize::{rscore_inplace, zscore_inplace, Normalization};
pub use permutation::{counter_rng_seed, draw_mixed, draw_partition, surrogate_rng, DrawBalance};
pub use quantile::{compute_quantile, compute_quantile_sorted, mean, median, percentile};
