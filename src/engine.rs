//! Main `PermutationTest` entry point and builder.

use std::time::Instant;

use rand::Rng;

use crate::analysis::{
    build_mask, estimate_thresholds, filter_clusters, validate_inputs, BoundAxis, ClusterSizeRule,
    SurrogateGenerator, Thresholds,
};
use crate::config::{
    Config, Connectivity, GroupedStatistic, SurrogateStatistic, ThresholdAggregation,
};
use crate::error::{ClusterError, Result};
use crate::preflight::{check_inputs, NullDraw};
use crate::progress::ProgressCallback;
use crate::result::{ClusterOutcome, ConditionMasks, GlobalVerdict, GroupMask, Metadata, TestKind};
use crate::statistics::{grouped_difference, grouped_statistic, DrawBalance};
use crate::types::{Group, StatMatrix, TrialArray};

/// Main entry point for permutation-cluster tests.
///
/// Use the builder pattern to configure and run tests.
///
/// # Example
///
/// ```ignore
/// use permutation_cluster::{PermutationTest, TrialArray};
///
/// let baseline = TrialArray::from_signals(&baseline_trials)?;
/// let condition = TrialArray::from_signals(&condition_trials)?;
///
/// let outcome = PermutationTest::new()
///     .n_surr(500)
///     .seed(42)
///     .test_1d(&baseline, &condition)?;
///
/// println!("{} significant samples", outcome.n_significant());
/// ```
///
/// # Reproducibility
///
/// Without an explicit [`seed`](Self::seed) a fresh seed is drawn for every
/// call and reported in the outcome's [`Metadata::seed`]. Passing that value
/// back reproduces the outcome exactly, with or without the `parallel`
/// feature.
#[derive(Debug, Clone)]
pub struct PermutationTest {
    config: Config,
    progress: Option<ProgressCallback>,
}

impl Default for PermutationTest {
    fn default() -> Self {
        Self::new()
    }
}

impl PermutationTest {
    /// Create with default configuration (1,000 surrogates).
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create with fast configuration for exploration and tests.
    ///
    /// Settings:
    /// - 200 surrogates (vs 1,000 default)
    pub fn quick() -> Self {
        Self::with_config(Config {
            n_surr: 200,
            ..Config::default()
        })
    }

    /// Create with a large surrogate count for final analyses.
    ///
    /// Settings:
    /// - 5,000 surrogates (vs 1,000 default)
    pub fn thorough() -> Self {
        Self::with_config(Config {
            n_surr: 5_000,
            ..Config::default()
        })
    }

    /// Create from an explicit configuration.
    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            progress: None,
        }
    }

    /// Create from defaults overlaid with `PC_*` environment variables.
    ///
    /// # Errors
    ///
    /// [`ClusterError::Configuration`] if a variable cannot be parsed.
    pub fn from_env() -> Result<Self> {
        Ok(Self::with_config(Config::default().from_env()?))
    }

    /// Set the number of surrogates.
    pub fn n_surr(mut self, n: usize) -> Self {
        self.config.n_surr = n;
        self
    }

    /// Set a deterministic seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// Set the reduction across trials.
    pub fn grouped(mut self, stat: GroupedStatistic) -> Self {
        self.config.grouped = stat;
        self
    }

    /// Set the reduction across trials for the per-condition test.
    pub fn grouped_2d(mut self, stat: GroupedStatistic) -> Self {
        self.config.grouped_2d = stat;
        self
    }

    /// Set the per-surrogate low/high statistic.
    pub fn surrogate_statistic(mut self, stat: SurrogateStatistic) -> Self {
        self.config.surrogate_statistic = stat;
        self
    }

    /// Set the bound aggregation for signal tests.
    pub fn threshold(mut self, agg: ThresholdAggregation) -> Self {
        self.config.threshold = agg;
        self
    }

    /// Set the bound aggregation for time-frequency tests.
    pub fn threshold_2d(mut self, agg: ThresholdAggregation) -> Self {
        self.config.threshold_2d = agg;
        self
    }

    /// Set the bound aggregation for the scalar comparison.
    pub fn global_threshold(mut self, agg: ThresholdAggregation) -> Self {
        self.config.global_threshold = agg;
        self
    }

    /// Set the signal minimum cluster size as a fraction of its length.
    pub fn size_thresh_alpha(mut self, alpha: f64) -> Self {
        self.config.size_thresh_alpha = alpha;
        self
    }

    /// Set the percentile of observed cluster sizes used as the
    /// time-frequency minimum.
    pub fn cluster_size_percentile(mut self, p: f64) -> Self {
        self.config.cluster_size_percentile = p;
        self
    }

    /// Set the cluster neighbourhood.
    pub fn connectivity(mut self, conn: Connectivity) -> Self {
        self.config.connectivity = conn;
        self
    }

    /// Set the percent milestones reported while surrogates run.
    pub fn progress_milestones(mut self, milestones: Vec<u8>) -> Self {
        self.config.progress_milestones = milestones;
        self
    }

    /// Receive each progress milestone.
    pub fn on_progress<F>(mut self, f: F) -> Self
    where
        F: Fn(u8) + Send + Sync + 'static,
    {
        self.progress = Some(ProgressCallback::new(f));
        self
    }

    /// Get the current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Compare one scalar per trial.
    ///
    /// The observed `grouped(condition) - grouped(baseline)` is significant
    /// when it falls strictly outside bounds aggregated from the surrogate
    /// differences (1st/99th percentile by default).
    ///
    /// # Errors
    ///
    /// [`ClusterError::InvalidInput`] for empty or non-finite inputs,
    /// [`ClusterError::DegenerateDistribution`] if every surrogate difference
    /// is identical, [`ClusterError::Configuration`] for invalid settings.
    pub fn test_global(&self, baseline: &[f64], condition: &[f64]) -> Result<GlobalVerdict> {
        let start = Instant::now();
        self.config.validate()?;

        let base = TrialArray::new(baseline.len(), 1, 1, baseline.to_vec())?;
        let cond = TrialArray::new(condition.len(), 1, 1, condition.to_vec())?;
        validate_inputs(&base, &cond)?;

        let draw = NullDraw::Shuffle(DrawBalance::KeepGroupSizes);
        let warnings = check_inputs(
            base.n_trials(),
            cond.n_trials(),
            self.config.n_surr,
            draw,
            self.config.global_threshold,
        );

        let seed = self.resolve_seed();
        let dist = self
            .generator(seed, DrawBalance::KeepGroupSizes, BoundAxis::Global)
            .generate(&base, &cond)?;
        let thresholds = estimate_thresholds(&dist, self.config.global_threshold)?;
        let (lower, upper) = thresholds.bounds_for_row(0);

        let observed = grouped_difference(&base, &cond, self.config.grouped)[(0, 0)];
        let significant = observed < lower || observed > upper;

        log::info!(
            "scalar test: observed {:.4} vs [{:.4}, {:.4}] -> {}",
            observed,
            lower,
            upper,
            if significant { "significant" } else { "not significant" }
        );

        Ok(GlobalVerdict {
            significant,
            observed,
            lower,
            upper,
            warnings,
            metadata: self.metadata(TestKind::Global, seed, &base, &cond, start),
        })
    }

    /// Signal test: global bounds over the whole difference, clusters shorter
    /// than `size_thresh_alpha × n_samples` removed.
    ///
    /// Trials must have a single row.
    ///
    /// # Errors
    ///
    /// [`ClusterError::InvalidInput`] for empty, mismatched, multi-row or
    /// non-finite inputs, [`ClusterError::DegenerateDistribution`] for a
    /// zero-variance null, [`ClusterError::Configuration`] for invalid
    /// settings.
    pub fn test_1d(&self, baseline: &TrialArray, condition: &TrialArray) -> Result<ClusterOutcome> {
        if baseline.rows() > 1 || condition.rows() > 1 {
            return Err(ClusterError::invalid(format!(
                "signal trials must have one row, got {} and {}",
                baseline.rows(),
                condition.rows()
            )));
        }
        self.run_cluster_test(
            TestKind::Signal,
            baseline,
            condition,
            DrawBalance::KeepGroupSizes,
            BoundAxis::Global,
            self.config.threshold,
            ClusterSizeRule::FractionOfSamples(self.config.size_thresh_alpha),
        )
    }

    /// Time-frequency test on the difference map: per-row bounds, clusters
    /// below the `cluster_size_percentile`-th percentile of observed cluster
    /// sizes removed.
    ///
    /// Both surrogate groups draw `min(n_baseline, n_condition)` trials from
    /// the shuffled pool; the remaining trials sit out that surrogate.
    ///
    /// # Errors
    ///
    /// Same as [`test_1d`](Self::test_1d), without the single-row
    /// requirement.
    pub fn test_2d(&self, baseline: &TrialArray, condition: &TrialArray) -> Result<ClusterOutcome> {
        self.run_cluster_test(
            TestKind::TimeFrequency,
            baseline,
            condition,
            DrawBalance::TruncateToSmaller,
            BoundAxis::PerRow,
            self.config.threshold_2d,
            ClusterSizeRule::Percentile(self.config.cluster_size_percentile),
        )
    }

    /// Time-frequency test of each group's own map against a pooled null.
    ///
    /// Each surrogate is the grouped map of `min(n_baseline, n_condition)`
    /// trials whose group is chosen by a fair coin per slot. The baseline and
    /// condition maps are masked against the same per-row bounds and
    /// filtered with the percentile rule.
    ///
    /// Trials are reduced with `grouped_2d` (median by default), not
    /// `grouped`.
    ///
    /// # Errors
    ///
    /// Same as [`test_2d`](Self::test_2d).
    pub fn test_2d_per_condition(
        &self,
        baseline: &TrialArray,
        condition: &TrialArray,
    ) -> Result<ConditionMasks> {
        let start = Instant::now();
        self.config.validate()?;
        validate_inputs(baseline, condition)?;

        let warnings = check_inputs(
            baseline.n_trials(),
            condition.n_trials(),
            self.config.n_surr,
            NullDraw::Mixed,
            self.config.threshold_2d,
        );

        let seed = self.resolve_seed();
        let reduction = self.config.grouped_2d;
        let generator = SurrogateGenerator {
            grouped: reduction,
            ..self.generator(seed, DrawBalance::TruncateToSmaller, BoundAxis::PerRow)
        };
        let dist = generator.generate_mixed(baseline, condition)?;
        let thresholds = estimate_thresholds(&dist, self.config.threshold_2d)?;

        let rule = ClusterSizeRule::Percentile(self.config.cluster_size_percentile);
        let base_mask = self.group_mask(
            Group::Baseline,
            grouped_statistic(baseline, reduction),
            &thresholds,
            rule,
        )?;
        let cond_mask = self.group_mask(
            Group::Condition,
            grouped_statistic(condition, reduction),
            &thresholds,
            rule,
        )?;

        log::info!(
            "per-condition test: {} baseline and {} condition cells significant",
            base_mask.mask.count(),
            cond_mask.mask.count()
        );

        Ok(ConditionMasks {
            baseline: base_mask,
            condition: cond_mask,
            thresholds,
            warnings,
            metadata: self.metadata(TestKind::PerCondition, seed, baseline, condition, start),
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn run_cluster_test(
        &self,
        kind: TestKind,
        baseline: &TrialArray,
        condition: &TrialArray,
        balance: DrawBalance,
        axis: BoundAxis,
        aggregation: ThresholdAggregation,
        rule: ClusterSizeRule,
    ) -> Result<ClusterOutcome> {
        let start = Instant::now();
        self.config.validate()?;
        validate_inputs(baseline, condition)?;

        let warnings = check_inputs(
            baseline.n_trials(),
            condition.n_trials(),
            self.config.n_surr,
            NullDraw::Shuffle(balance),
            aggregation,
        );

        let seed = self.resolve_seed();
        let dist = self.generator(seed, balance, axis).generate(baseline, condition)?;
        let thresholds = estimate_thresholds(&dist, aggregation)?;

        let observed = grouped_difference(baseline, condition, self.config.grouped);
        let raw_mask = build_mask(&observed, &thresholds)?;
        let filtered = filter_clusters(&raw_mask, rule, self.config.connectivity)?;

        log::info!(
            "{:?} test: {} of {} cells outside bounds, {} of {} clusters kept",
            kind,
            raw_mask.count(),
            raw_mask.len(),
            filtered.n_retained(),
            filtered.clusters.len()
        );

        Ok(ClusterOutcome {
            observed,
            thresholds,
            raw_mask,
            mask: filtered.mask,
            clusters: filtered.clusters,
            min_cluster_size: filtered.min_size,
            warnings,
            metadata: self.metadata(kind, seed, baseline, condition, start),
        })
    }

    fn group_mask(
        &self,
        group: Group,
        grouped: StatMatrix,
        thresholds: &Thresholds,
        rule: ClusterSizeRule,
    ) -> Result<GroupMask> {
        let raw_mask = build_mask(&grouped, thresholds)?;
        let filtered = filter_clusters(&raw_mask, rule, self.config.connectivity)?;
        Ok(GroupMask {
            group,
            grouped,
            raw_mask,
            mask: filtered.mask,
            clusters: filtered.clusters,
            min_cluster_size: filtered.min_size,
        })
    }

    fn generator(&self, seed: u64, balance: DrawBalance, axis: BoundAxis) -> SurrogateGenerator {
        SurrogateGenerator {
            grouped: self.config.grouped,
            statistic: self.config.surrogate_statistic,
            balance,
            axis,
            milestones: self.config.progress_milestones.clone(),
            progress: self.progress.clone(),
            ..SurrogateGenerator::new(self.config.n_surr, seed)
        }
    }

    fn resolve_seed(&self) -> u64 {
        match self.config.seed {
            Some(seed) => seed,
            None => {
                let seed: u64 = rand::rng().random();
                log::debug!("no seed configured, drew {}", seed);
                seed
            }
        }
    }

    fn metadata(
        &self,
        kind: TestKind,
        seed: u64,
        baseline: &TrialArray,
        condition: &TrialArray,
        start: Instant,
    ) -> Metadata {
        Metadata {
            kind,
            n_surr: self.config.n_surr,
            seed,
            n_baseline: baseline.n_trials(),
            n_condition: condition.n_trials(),
            shape: baseline.shape(),
            runtime_secs: start.elapsed().as_secs_f64(),
        }
    }
}
