//! Analysis pipeline for permutation-cluster tests.
//!
//! Each test runs the same four stages:
//!
//! 1. **Surrogates** ([`surrogate`]): shuffled repartitions of the pooled
//!    trials, each reduced to a `(low, high)` pair per bin
//! 2. **Thresholds** ([`threshold`]): per-bin rejection bounds aggregated
//!    across surrogates
//! 3. **Mask** ([`mask`]): cells of the observed statistic outside the bounds
//! 4. **Clusters** ([`cluster`]): connected regions below a size cutoff are
//!    removed

mod cluster;
mod mask;
mod surrogate;
mod threshold;

pub use cluster::{
    filter_clusters, filter_with_min_size, label_clusters, Cluster, ClusterSizeRule, FilteredMask,
    Labeling,
};
pub use mask::build_mask;
pub use surrogate::{validate_inputs, BoundAxis, SurrogateDistribution, SurrogateGenerator};
pub use threshold::{estimate_thresholds, Thresholds};
