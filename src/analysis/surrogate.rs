//! Surrogate generation: shuffled repartitions and their extremal statistics.
//!
//! One generic loop, [`run_surrogates`], drives every variant. It is
//! parameterized by a *draw* closure (which builds the surrogate statistic
//! matrix from a seeded generator) and by the reduction of that matrix into a
//! `(low, high)` pair per bin:
//!
//! - scalar and 1-D tests reduce the whole difference to one bin
//!   ([`BoundAxis::Global`]);
//! - time-frequency tests reduce each frequency row on its own
//!   ([`BoundAxis::PerRow`]).
//!
//! Surrogate `i` always uses the generator from
//! [`surrogate_rng`](crate::statistics::surrogate_rng)`(seed, i)`, so the
//! distribution is identical whether the loop runs sequentially or on the
//! rayon pool.

use nalgebra::DMatrix;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::{check_percentile_pair, GroupedStatistic, SurrogateStatistic};
use crate::error::{ClusterError, Result};
use crate::progress::{ProgressCallback, ProgressTracker};
use crate::statistics::{
    compute_quantile, draw_mixed, draw_partition, pooled_difference, reduce_trials, surrogate_rng,
    DrawBalance, TrialPool,
};
use crate::types::{StatMatrix, TrialArray};

/// Domain over which one `(low, high)` pair is extracted from a surrogate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoundAxis {
    /// One pair for the whole matrix.
    Global,
    /// One pair per row (frequency bin), taken along time.
    PerRow,
}

impl BoundAxis {
    /// Number of bins for a statistic with `rows` rows.
    pub fn n_bins(self, rows: usize) -> usize {
        match self {
            BoundAxis::Global => 1,
            BoundAxis::PerRow => rows,
        }
    }
}

/// Per-surrogate lows and highs, each `n_bins × n_surr`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurrogateDistribution {
    /// Low statistic (minimum or lower percentile) per bin and surrogate.
    pub lows: DMatrix<f64>,
    /// High statistic (maximum or upper percentile) per bin and surrogate.
    pub highs: DMatrix<f64>,
}

impl SurrogateDistribution {
    /// Number of surrogates.
    pub fn n_surr(&self) -> usize {
        self.lows.ncols()
    }

    /// Number of bins.
    pub fn n_bins(&self) -> usize {
        self.lows.nrows()
    }

    /// Lows of one bin across all surrogates.
    pub fn lows_of(&self, bin: usize) -> Vec<f64> {
        self.lows.row(bin).iter().copied().collect()
    }

    /// Highs of one bin across all surrogates.
    pub fn highs_of(&self, bin: usize) -> Vec<f64> {
        self.highs.row(bin).iter().copied().collect()
    }
}

/// Reusable per-worker buffers.
#[derive(Debug, Default)]
pub(crate) struct SurrogateScratch {
    order: Vec<usize>,
    values: Vec<f64>,
    extremes: Vec<f64>,
}

impl SurrogateStatistic {
    /// `(low, high)` of a set of values. `values` may be reordered.
    ///
    /// # Panics
    ///
    /// Panics if `values` is empty.
    pub fn extremes(self, values: &mut [f64]) -> (f64, f64) {
        match self {
            SurrogateStatistic::MinMax => values
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v))),
            SurrogateStatistic::Percentile { lower, upper } => (
                compute_quantile(values, lower / 100.0),
                compute_quantile(values, upper / 100.0),
            ),
        }
    }
}

/// Reduce one surrogate statistic matrix to a `(low, high)` pair per bin.
pub(crate) fn summarize(
    stat: &StatMatrix,
    statistic: SurrogateStatistic,
    axis: BoundAxis,
    buf: &mut Vec<f64>,
) -> Vec<(f64, f64)> {
    match axis {
        BoundAxis::Global => {
            buf.clear();
            buf.extend(stat.iter().copied());
            vec![statistic.extremes(buf)]
        }
        BoundAxis::PerRow => (0..stat.nrows())
            .map(|r| {
                buf.clear();
                buf.extend(stat.row(r).iter().copied());
                statistic.extremes(buf)
            })
            .collect(),
    }
}

/// Generic surrogate loop.
///
/// Calls `draw` once per surrogate with that surrogate's generator, reduces
/// the returned matrix with `statistic` over `axis`, and collects the pairs
/// into an `n_bins × n_surr` distribution.
pub(crate) fn run_surrogates<F>(
    n_surr: usize,
    seed: u64,
    n_bins: usize,
    statistic: SurrogateStatistic,
    axis: BoundAxis,
    progress: &ProgressTracker<'_>,
    draw: F,
) -> SurrogateDistribution
where
    F: Fn(&mut Xoshiro256PlusPlus, &mut SurrogateScratch) -> StatMatrix + Sync,
{
    let one = |scratch: &mut SurrogateScratch, i: usize| {
        let mut rng = surrogate_rng(seed, i);
        let stat = draw(&mut rng, scratch);
        let pairs = summarize(&stat, statistic, axis, &mut scratch.extremes);
        progress.tick();
        pairs
    };

    #[cfg(feature = "parallel")]
    let per_surrogate: Vec<Vec<(f64, f64)>> = crate::thread_pool::install(|| {
        (0..n_surr)
            .into_par_iter()
            .map_init(SurrogateScratch::default, |scratch, i| one(scratch, i))
            .collect()
    });

    #[cfg(not(feature = "parallel"))]
    let per_surrogate: Vec<Vec<(f64, f64)>> = {
        let mut scratch = SurrogateScratch::default();
        (0..n_surr).map(|i| one(&mut scratch, i)).collect()
    };

    log::debug!("{} surrogates done", progress.completed());

    let mut lows = DMatrix::zeros(n_bins, n_surr);
    let mut highs = DMatrix::zeros(n_bins, n_surr);
    for (i, pairs) in per_surrogate.iter().enumerate() {
        for (bin, &(lo, hi)) in pairs.iter().enumerate() {
            lows[(bin, i)] = lo;
            highs[(bin, i)] = hi;
        }
    }

    SurrogateDistribution { lows, highs }
}

/// Check that two trial arrays can be compared.
///
/// # Errors
///
/// [`ClusterError::InvalidInput`] if either array has no trials or no
/// samples, if the trailing shapes differ, or if any value is non-finite.
pub fn validate_inputs(baseline: &TrialArray, condition: &TrialArray) -> Result<()> {
    for (name, arr) in [("baseline", baseline), ("condition", condition)] {
        if arr.n_trials() == 0 {
            return Err(ClusterError::invalid(format!("{} has no trials", name)));
        }
        if arr.trial_len() == 0 {
            return Err(ClusterError::invalid(format!("{} trials are empty", name)));
        }
    }
    if baseline.shape() != condition.shape() {
        return Err(ClusterError::invalid(format!(
            "trailing shapes differ: baseline {:?}, condition {:?}",
            baseline.shape(),
            condition.shape()
        )));
    }
    baseline.ensure_finite("baseline")?;
    condition.ensure_finite("condition")?;
    Ok(())
}

/// Surrogate generator for one test invocation.
///
/// Randomness is injected through `seed`; two generators with identical
/// settings produce identical distributions.
#[derive(Debug, Clone)]
pub struct SurrogateGenerator {
    /// Number of surrogates (≥ 1).
    pub n_surr: usize,
    /// Reduction across trials.
    pub grouped: GroupedStatistic,
    /// Per-surrogate low/high statistic.
    pub statistic: SurrogateStatistic,
    /// How the shuffled pool is split.
    pub balance: DrawBalance,
    /// Global or per-row bounds.
    pub axis: BoundAxis,
    /// Base seed.
    pub seed: u64,
    /// Percent milestones to report.
    pub milestones: Vec<u8>,
    /// Optional milestone callback.
    pub progress: Option<ProgressCallback>,
}

impl SurrogateGenerator {
    /// Generator with default statistics: mean, min/max, all trials kept,
    /// global bounds, no progress reporting.
    pub fn new(n_surr: usize, seed: u64) -> Self {
        Self {
            n_surr,
            grouped: GroupedStatistic::Mean,
            statistic: SurrogateStatistic::MinMax,
            balance: DrawBalance::KeepGroupSizes,
            axis: BoundAxis::Global,
            seed,
            milestones: Vec::new(),
            progress: None,
        }
    }

    /// Shuffled-difference null: each surrogate is
    /// `grouped(surrogate condition) - grouped(surrogate baseline)`.
    ///
    /// # Errors
    ///
    /// [`ClusterError::InvalidInput`] for empty or mismatched inputs or
    /// `n_surr < 1`, [`ClusterError::Configuration`] for an invalid
    /// percentile pair.
    pub fn generate(&self, baseline: &TrialArray, condition: &TrialArray) -> Result<SurrogateDistribution> {
        self.check(baseline, condition)?;
        let pool = TrialPool::new(baseline, condition);
        let (nb, nc) = (pool.n_baseline(), pool.n_condition());
        let tracker = self.tracker("shuffled difference");

        log::debug!(
            "generating {} surrogates ({} baseline, {} condition trials, {:?})",
            self.n_surr,
            nb,
            nc,
            self.balance
        );

        Ok(run_surrogates(
            self.n_surr,
            self.seed,
            self.axis.n_bins(baseline.rows()),
            self.statistic,
            self.axis,
            &tracker,
            |rng, scratch| {
                let SurrogateScratch { order, values, .. } = scratch;
                let (base_idx, cond_idx) = draw_partition(rng, nb, nc, self.balance, order);
                pooled_difference(&pool, cond_idx, base_idx, self.grouped, values)
            },
        ))
    }

    /// Mixed-draw null: each surrogate is the grouped statistic of
    /// `min(n_baseline, n_condition)` trials, each drawn from either group
    /// with equal probability.
    ///
    /// # Errors
    ///
    /// [`ClusterError::InvalidInput`] for empty or mismatched inputs or
    /// `n_surr < 1`, [`ClusterError::Configuration`] for an invalid
    /// percentile pair.
    pub fn generate_mixed(
        &self,
        baseline: &TrialArray,
        condition: &TrialArray,
    ) -> Result<SurrogateDistribution> {
        self.check(baseline, condition)?;
        let pool = TrialPool::new(baseline, condition);
        let (nb, nc) = (pool.n_baseline(), pool.n_condition());
        let (rows, cols) = pool.shape();
        let tracker = self.tracker("mixed draw");

        Ok(run_surrogates(
            self.n_surr,
            self.seed,
            self.axis.n_bins(rows),
            self.statistic,
            self.axis,
            &tracker,
            |rng, scratch| {
                let SurrogateScratch { order, values, .. } = scratch;
                draw_mixed(rng, nb, nc, order);
                let selected: Vec<&[f64]> = order.iter().map(|&i| pool.trial(i)).collect();
                reduce_trials(&selected, rows, cols, self.grouped, values)
            },
        ))
    }

    fn check(&self, baseline: &TrialArray, condition: &TrialArray) -> Result<()> {
        if self.n_surr < 1 {
            return Err(ClusterError::invalid("n_surr must be at least 1"));
        }
        if let SurrogateStatistic::Percentile { lower, upper } = self.statistic {
            check_percentile_pair(lower, upper)?;
        }
        validate_inputs(baseline, condition)
    }

    fn tracker(&self, label: &'static str) -> ProgressTracker<'_> {
        ProgressTracker::new(label, self.n_surr, &self.milestones, self.progress.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};

    fn noise(n_trials: usize, rows: usize, cols: usize, seed: u64) -> TrialArray {
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        TrialArray::from_fn(n_trials, rows, cols, |_, _, _| rng.random_range(-1.0..1.0))
    }

    #[test]
    fn test_minmax_and_percentile_extremes() {
        let mut v: Vec<f64> = (0..=100).map(|x| x as f64).collect();
        assert_eq!(SurrogateStatistic::MinMax.extremes(&mut v), (0.0, 100.0));
        let (lo, hi) = SurrogateStatistic::Percentile { lower: 1.0, upper: 99.0 }.extremes(&mut v);
        approx::assert_abs_diff_eq!(lo, 1.0, epsilon = 1e-12);
        approx::assert_abs_diff_eq!(hi, 99.0, epsilon = 1e-12);
    }

    #[test]
    fn test_summarize_per_row() {
        let m = DMatrix::from_row_slice(2, 3, &[1.0, -2.0, 3.0, 10.0, 20.0, 5.0]);
        let mut buf = Vec::new();
        let rows = summarize(&m, SurrogateStatistic::MinMax, BoundAxis::PerRow, &mut buf);
        assert_eq!(rows, vec![(-2.0, 3.0), (5.0, 20.0)]);
        let global = summarize(&m, SurrogateStatistic::MinMax, BoundAxis::Global, &mut buf);
        assert_eq!(global, vec![(-2.0, 20.0)]);
    }

    #[test]
    fn test_distribution_shape() {
        let base = noise(8, 3, 20, 1);
        let cond = noise(6, 3, 20, 2);

        let mut generator = SurrogateGenerator::new(25, 11);
        let dist = generator.generate(&base, &cond).unwrap();
        assert_eq!((dist.n_bins(), dist.n_surr()), (1, 25));

        generator.axis = BoundAxis::PerRow;
        generator.balance = DrawBalance::TruncateToSmaller;
        let dist = generator.generate(&base, &cond).unwrap();
        assert_eq!((dist.n_bins(), dist.n_surr()), (3, 25));
        for bin in 0..3 {
            for (lo, hi) in dist.lows_of(bin).iter().zip(dist.highs_of(bin)) {
                assert!(*lo <= hi);
            }
        }
    }

    #[test]
    fn test_same_seed_same_distribution() {
        let base = noise(10, 1, 40, 3);
        let cond = noise(12, 1, 40, 4);
        let generator = SurrogateGenerator::new(50, 2024);
        assert_eq!(generator.generate(&base, &cond).unwrap(), generator.generate(&base, &cond).unwrap());

        let other = SurrogateGenerator::new(50, 2025);
        assert_ne!(generator.generate(&base, &cond).unwrap(), other.generate(&base, &cond).unwrap());
    }

    #[test]
    fn test_mixed_draw_stays_within_data_range() {
        let base = TrialArray::from_fn(5, 2, 4, |_, _, _| 1.0);
        let cond = TrialArray::from_fn(7, 2, 4, |_, _, _| 3.0);
        let mut generator = SurrogateGenerator::new(30, 5);
        generator.axis = BoundAxis::PerRow;
        let dist = generator.generate_mixed(&base, &cond).unwrap();
        assert_eq!(dist.n_bins(), 2);
        assert!(dist.lows.iter().all(|&v| (1.0..=3.0).contains(&v)));
        assert!(dist.highs.iter().all(|&v| (1.0..=3.0).contains(&v)));
    }

    #[test]
    fn test_rejects_bad_inputs() {
        let base = noise(4, 1, 10, 1);
        let short = noise(4, 1, 9, 1);
        let none = TrialArray::new(0, 1, 10, Vec::new()).unwrap();

        let generator = SurrogateGenerator::new(10, 0);
        assert!(matches!(generator.generate(&base, &short), Err(ClusterError::InvalidInput(_))));
        assert!(matches!(generator.generate(&none, &base), Err(ClusterError::InvalidInput(_))));

        let zero = SurrogateGenerator::new(0, 0);
        assert!(matches!(zero.generate(&base, &base), Err(ClusterError::InvalidInput(_))));
    }

    /// Whatever the scheduling, surrogate `i` equals the one built in order
    /// from `surrogate_rng(seed, i)` on a single thread.
    #[test]
    fn test_matches_in_order_reference() {
        let base = noise(7, 3, 12, 3);
        let cond = noise(9, 3, 12, 4);
        let mut generator = SurrogateGenerator::new(64, 123);
        generator.axis = BoundAxis::PerRow;
        generator.balance = DrawBalance::TruncateToSmaller;
        generator.statistic = SurrogateStatistic::Percentile { lower: 10.0, upper: 90.0 };
        let dist = generator.generate(&base, &cond).unwrap();

        let pool = TrialPool::new(&base, &cond);
        let (mut order, mut values, mut buf) = (Vec::new(), Vec::new(), Vec::new());
        for i in 0..generator.n_surr {
            let mut rng = surrogate_rng(generator.seed, i);
            let (base_idx, cond_idx) = draw_partition(&mut rng, 7, 9, generator.balance, &mut order);
            let stat = pooled_difference(&pool, cond_idx, base_idx, generator.grouped, &mut values);
            let pairs = summarize(&stat, generator.statistic, generator.axis, &mut buf);
            for (bin, &(lo, hi)) in pairs.iter().enumerate() {
                assert_eq!(dist.lows[(bin, i)], lo, "low of surrogate {} bin {}", i, bin);
                assert_eq!(dist.highs[(bin, i)], hi, "high of surrogate {} bin {}", i, bin);
            }
        }
    }

    #[test]
    fn test_out_of_range_percentiles_are_configuration_errors() {
        let base = noise(4, 2, 10, 1);
        let cond = noise(4, 2, 10, 2);

        for (lower, upper) in [(150.0, 200.0), (-5.0, 99.0), (60.0, 40.0)] {
            let mut generator = SurrogateGenerator::new(10, 0);
            generator.statistic = SurrogateStatistic::Percentile { lower, upper };
            assert!(matches!(
                generator.generate(&base, &cond),
                Err(ClusterError::Configuration(_))
            ));
            assert!(matches!(
                generator.generate_mixed(&base, &cond),
                Err(ClusterError::Configuration(_))
            ));
        }
    }
}
