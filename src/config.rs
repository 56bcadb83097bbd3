//! Configuration for permutation-cluster tests.
//!
//! Every recognized option lives in [`Config`]; nothing is read from module
//! state. Mode enums parse from the short strings used in analysis scripts
//! (`"mean"`, `"minmax"`, `"percentile:2.5:97.5"`, ...), and
//! [`Config::from_env`] overlays `PC_*` environment variables.

use std::env;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ClusterError, Result};

/// Default lower/upper percentile pair (1st / 99th).
pub const DEFAULT_PERCENTILES: (f64, f64) = (1.0, 99.0);

/// Reduction across trials (`mode_grouped`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupedStatistic {
    /// Arithmetic mean across trials.
    #[default]
    Mean,
    /// Median across trials.
    Median,
}

/// Per-surrogate summary of the shuffled difference (`mode_generate_surr`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum SurrogateStatistic {
    /// True minimum and maximum.
    #[default]
    MinMax,
    /// Lower/upper percentiles (0–100), less sensitive to single-sample outliers.
    Percentile {
        /// Lower percentile, e.g. 1.0.
        lower: f64,
        /// Upper percentile, e.g. 99.0.
        upper: f64,
    },
}

/// Aggregation of per-surrogate lows/highs into bounds (`mode_select_thresh`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ThresholdAggregation {
    /// Mean of the lows for the lower bound, **median** of the highs for the
    /// upper bound.
    Mean,
    /// Median of the lows and median of the highs.
    Median,
    /// Percentiles (0–100) of the lows and of the highs.
    Percentile {
        /// Percentile taken over the lows, e.g. 1.0 or 2.5.
        lower: f64,
        /// Percentile taken over the highs, e.g. 99.0 or 97.5.
        upper: f64,
    },
}

/// Neighbourhood used when labeling clusters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Connectivity {
    /// Edge neighbours only.
    Four,
    /// Edge and diagonal neighbours.
    #[default]
    Eight,
}

/// Configuration options for [`PermutationTest`](crate::PermutationTest).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Number of surrogates per test (default: 1,000).
    pub n_surr: usize,

    /// Reduction across trials (default: mean).
    pub grouped: GroupedStatistic,

    /// Reduction across trials for the per-condition time-frequency test,
    /// applied to both the surrogate maps and each group's map (default: median).
    pub grouped_2d: GroupedStatistic,

    /// Per-surrogate statistic (default: min/max).
    pub surrogate_statistic: SurrogateStatistic,

    /// Bound aggregation for 1-D tests (default: mean, i.e. mean of lows
    /// and median of highs).
    pub threshold: ThresholdAggregation,

    /// Bound aggregation for time-frequency tests (default: median).
    pub threshold_2d: ThresholdAggregation,

    /// Bound aggregation for the scalar comparison (default: 1st/99th percentile).
    pub global_threshold: ThresholdAggregation,

    /// 1-D minimum cluster size as a fraction of the signal length (default: 0.05).
    pub size_thresh_alpha: f64,

    /// 2-D minimum cluster size as a percentile of observed cluster sizes
    /// (default: 95).
    pub cluster_size_percentile: f64,

    /// Cluster neighbourhood (default: 8-connectivity).
    pub connectivity: Connectivity,

    /// Optional deterministic seed. When unset a seed is drawn per call and
    /// reported in the outcome metadata.
    pub seed: Option<u64>,

    /// Percent milestones reported while surrogates run (default: 25, 50, 75).
    pub progress_milestones: Vec<u8>,
}

impl Default for Config {
    fn default() -> Self {
        let (lower, upper) = DEFAULT_PERCENTILES;
        Self {
            n_surr: 1_000,
            grouped: GroupedStatistic::Mean,
            grouped_2d: GroupedStatistic::Median,
            surrogate_statistic: SurrogateStatistic::MinMax,
            threshold: ThresholdAggregation::Mean,
            threshold_2d: ThresholdAggregation::Median,
            global_threshold: ThresholdAggregation::Percentile { lower, upper },
            size_thresh_alpha: 0.05,
            cluster_size_percentile: 95.0,
            connectivity: Connectivity::Eight,
            seed: None,
            progress_milestones: vec![25, 50, 75],
        }
    }
}

impl Config {
    /// Check every invariant.
    ///
    /// # Errors
    ///
    /// [`ClusterError::InvalidInput`] for `n_surr == 0`,
    /// [`ClusterError::Configuration`] for out-of-range values.
    pub fn validate(&self) -> Result<()> {
        if self.n_surr < 1 {
            return Err(ClusterError::invalid("n_surr must be at least 1"));
        }
        if let SurrogateStatistic::Percentile { lower, upper } = self.surrogate_statistic {
            check_percentile_pair(lower, upper)?;
        }
        for agg in [self.threshold, self.threshold_2d, self.global_threshold] {
            if let ThresholdAggregation::Percentile { lower, upper } = agg {
                check_percentile_pair(lower, upper)?;
            }
        }
        if !(self.size_thresh_alpha > 0.0 && self.size_thresh_alpha <= 1.0) {
            return Err(ClusterError::config(format!(
                "size_thresh_alpha must be in (0, 1], got {}",
                self.size_thresh_alpha
            )));
        }
        if !(0.0..=100.0).contains(&self.cluster_size_percentile) {
            return Err(ClusterError::config(format!(
                "cluster_size_percentile must be in [0, 100], got {}",
                self.cluster_size_percentile
            )));
        }
        if let Some(&m) = self.progress_milestones.iter().find(|&&m| m > 100) {
            return Err(ClusterError::config(format!(
                "progress milestone {}% is above 100%",
                m
            )));
        }
        Ok(())
    }

    /// Overlay values from `PC_*` environment variables.
    ///
    /// Recognized: `PC_N_SURR`, `PC_SEED`, `PC_MODE_GROUPED`,
    /// `PC_MODE_GROUPED_2D`, `PC_MODE_GENERATE_SURR`, `PC_MODE_SELECT_THRESH`,
    /// `PC_SIZE_THRESH_ALPHA`, `PC_CLUSTER_SIZE_PERCENTILE`,
    /// `PC_CONNECTIVITY`, `PC_PROGRESS` (comma-separated percentages).
    ///
    /// # Errors
    ///
    /// [`ClusterError::Configuration`] if a variable is set but cannot be parsed.
    pub fn from_env(mut self) -> Result<Self> {
        if let Some(n) = parse_env("PC_N_SURR")? {
            self.n_surr = n;
        }
        if let Some(seed) = parse_env("PC_SEED")? {
            self.seed = Some(seed);
        }
        if let Some(grouped) = parse_env("PC_MODE_GROUPED")? {
            self.grouped = grouped;
        }
        if let Some(grouped) = parse_env("PC_MODE_GROUPED_2D")? {
            self.grouped_2d = grouped;
        }
        if let Some(stat) = parse_env("PC_MODE_GENERATE_SURR")? {
            self.surrogate_statistic = stat;
        }
        if let Some(agg) = parse_env("PC_MODE_SELECT_THRESH")? {
            self.threshold = agg;
        }
        if let Some(alpha) = parse_env("PC_SIZE_THRESH_ALPHA")? {
            self.size_thresh_alpha = alpha;
        }
        if let Some(p) = parse_env("PC_CLUSTER_SIZE_PERCENTILE")? {
            self.cluster_size_percentile = p;
        }
        if let Some(conn) = parse_env("PC_CONNECTIVITY")? {
            self.connectivity = conn;
        }
        if let Ok(raw) = env::var("PC_PROGRESS") {
            self.progress_milestones = parse_milestones(&raw)?;
        }
        Ok(self)
    }
}

fn parse_env<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ClusterError::config(format!("{}={:?}: {}", key, raw, e))),
        Err(_) => Ok(None),
    }
}

fn parse_milestones(raw: &str) -> Result<Vec<u8>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u8>()
                .map_err(|e| ClusterError::config(format!("PC_PROGRESS entry {:?}: {}", s, e)))
        })
        .collect()
}

/// `0 <= lower < upper <= 100`.
pub(crate) fn check_percentile_pair(lower: f64, upper: f64) -> Result<()> {
    if !(0.0..=100.0).contains(&lower) || !(0.0..=100.0).contains(&upper) || lower >= upper {
        return Err(ClusterError::config(format!(
            "percentile pair must satisfy 0 <= low < high <= 100, got ({}, {})",
            lower, upper
        )));
    }
    Ok(())
}

/// Parse `"percentile"` or `"percentile:<low>:<high>"`.
fn parse_percentile_mode(s: &str) -> Result<Option<(f64, f64)>> {
    let mut parts = s.split(':');
    if parts.next() != Some("percentile") {
        return Ok(None);
    }
    let pair = match (parts.next(), parts.next(), parts.next()) {
        (None, _, _) => DEFAULT_PERCENTILES,
        (Some(lo), Some(hi), None) => {
            let lo = lo
                .parse::<f64>()
                .map_err(|_| ClusterError::config(format!("bad lower percentile in {:?}", s)))?;
            let hi = hi
                .parse::<f64>()
                .map_err(|_| ClusterError::config(format!("bad upper percentile in {:?}", s)))?;
            (lo, hi)
        }
        _ => {
            return Err(ClusterError::config(format!(
                "expected 'percentile' or 'percentile:<low>:<high>', got {:?}",
                s
            )))
        }
    };
    check_percentile_pair(pair.0, pair.1)?;
    Ok(Some(pair))
}

impl FromStr for GroupedStatistic {
    type Err = ClusterError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mean" => Ok(GroupedStatistic::Mean),
            "median" => Ok(GroupedStatistic::Median),
            other => Err(ClusterError::config(format!(
                "unknown grouped statistic {:?} (expected mean or median)",
                other
            ))),
        }
    }
}

impl FromStr for SurrogateStatistic {
    type Err = ClusterError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.to_ascii_lowercase();
        if s == "minmax" {
            return Ok(SurrogateStatistic::MinMax);
        }
        match parse_percentile_mode(&s)? {
            Some((lower, upper)) => Ok(SurrogateStatistic::Percentile { lower, upper }),
            None => Err(ClusterError::config(format!(
                "unknown surrogate statistic {:?} (expected minmax or percentile)",
                s
            ))),
        }
    }
}

impl FromStr for ThresholdAggregation {
    type Err = ClusterError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.to_ascii_lowercase();
        match s.as_str() {
            "mean" => return Ok(ThresholdAggregation::Mean),
            "median" => return Ok(ThresholdAggregation::Median),
            _ => {}
        }
        match parse_percentile_mode(&s)? {
            Some((lower, upper)) => Ok(ThresholdAggregation::Percentile { lower, upper }),
            None => Err(ClusterError::config(format!(
                "unknown threshold selection {:?} (expected mean, median or percentile)",
                s
            ))),
        }
    }
}

impl FromStr for Connectivity {
    type Err = ClusterError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "4" | "four" => Ok(Connectivity::Four),
            "8" | "eight" => Ok(Connectivity::Eight),
            other => Err(ClusterError::config(format!(
                "unknown connectivity {:?} (expected 4 or 8)",
                other
            ))),
        }
    }
}

impl fmt::Display for GroupedStatistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupedStatistic::Mean => write!(f, "mean"),
            GroupedStatistic::Median => write!(f, "median"),
        }
    }
}

impl fmt::Display for SurrogateStatistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SurrogateStatistic::MinMax => write!(f, "minmax"),
            SurrogateStatistic::Percentile { lower, upper } => {
                write!(f, "percentile:{}:{}", lower, upper)
            }
        }
    }
}

impl fmt::Display for ThresholdAggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThresholdAggregation::Mean => write!(f, "mean"),
            ThresholdAggregation::Median => write!(f, "median"),
            ThresholdAggregation::Percentile { lower, upper } => {
                write!(f, "percentile:{}:{}", lower, upper)
            }
        }
    }
}

impl fmt::Display for Connectivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Connectivity::Four => write!(f, "4"),
            Connectivity::Eight => write!(f, "8"),
        }
    }
}
