//! Test outcome types and related structures.

use serde::{Deserialize, Serialize};

use crate::analysis::{Cluster, Thresholds};
use crate::preflight::PreflightWarning;
use crate::types::{Group, Mask, StatMatrix};

/// Which test produced an outcome.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TestKind {
    /// One scalar per trial.
    Global,
    /// One signal per trial, global bounds.
    Signal,
    /// Time-frequency maps, per-row bounds on the difference.
    TimeFrequency,
    /// Time-frequency maps, each group masked against a pooled null.
    PerCondition,
}

/// Metadata for debugging and reproduction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Metadata {
    /// Test variant.
    pub kind: TestKind,
    /// Surrogates drawn.
    pub n_surr: usize,
    /// Seed actually used. Re-running with this seed reproduces the outcome.
    pub seed: u64,
    /// Baseline trials.
    pub n_baseline: usize,
    /// Condition trials.
    pub n_condition: usize,
    /// `(rows, cols)` of one trial.
    pub shape: (usize, usize),
    /// Total runtime in seconds.
    pub runtime_secs: f64,
}

/// Complete result of a signal or time-frequency cluster test.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClusterOutcome {
    /// Observed grouped difference, condition minus baseline.
    pub observed: StatMatrix,

    /// Rejection bounds (one pair for signals, one per row for maps).
    pub thresholds: Thresholds,

    /// Cells outside the bounds before cluster filtering.
    pub raw_mask: Mask,

    /// Cells belonging to retained clusters.
    pub mask: Mask,

    /// Every cluster of the raw mask, with its retention flag.
    pub clusters: Vec<Cluster>,

    /// Resolved minimum cluster size (`None` when the raw mask was empty).
    pub min_cluster_size: Option<f64>,

    /// Non-fatal preflight findings.
    pub warnings: Vec<PreflightWarning>,

    /// Metadata for debugging.
    pub metadata: Metadata,
}

impl ClusterOutcome {
    /// True if any cluster survived.
    pub fn is_significant(&self) -> bool {
        self.mask.any()
    }

    /// Number of significant cells after filtering.
    pub fn n_significant(&self) -> usize {
        self.mask.count()
    }

    /// Clusters that survived the size filter.
    pub fn retained_clusters(&self) -> impl Iterator<Item = &Cluster> {
        self.clusters.iter().filter(|c| c.retained)
    }
}

/// Result of the scalar comparison.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GlobalVerdict {
    /// Whether the observed difference falls strictly outside the bounds.
    pub significant: bool,

    /// Observed grouped difference, condition minus baseline.
    pub observed: f64,

    /// Lower rejection bound.
    pub lower: f64,

    /// Upper rejection bound.
    pub upper: f64,

    /// Non-fatal preflight findings.
    pub warnings: Vec<PreflightWarning>,

    /// Metadata for debugging.
    pub metadata: Metadata,
}

/// Mask of one group's grouped map against the pooled null.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroupMask {
    /// Group the map belongs to.
    pub group: Group,
    /// Grouped map of that group.
    pub grouped: StatMatrix,
    /// Cells outside the bounds before cluster filtering.
    pub raw_mask: Mask,
    /// Cells belonging to retained clusters.
    pub mask: Mask,
    /// Every cluster of the raw mask.
    pub clusters: Vec<Cluster>,
    /// Resolved minimum cluster size.
    pub min_cluster_size: Option<f64>,
}

/// Result of the per-condition time-frequency test.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConditionMasks {
    /// Baseline map against the pooled null.
    pub baseline: GroupMask,
    /// Condition map against the pooled null.
    pub condition: GroupMask,
    /// Per-row bounds shared by both masks.
    pub thresholds: Thresholds,
    /// Non-fatal preflight findings.
    pub warnings: Vec<PreflightWarning>,
    /// Metadata for debugging.
    pub metadata: Metadata,
}

impl ConditionMasks {
    /// Mask for `group`.
    pub fn group(&self, group: Group) -> &GroupMask {
        match group {
            Group::Baseline => &self.baseline,
            Group::Condition => &self.condition,
        }
    }
}
