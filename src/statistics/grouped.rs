//! Reduction across the trial dimension.
//!
//! A grouped statistic collapses `n` trials of shape `rows × cols` into one
//! `rows × cols` matrix, cell by cell, with either the mean or the median.

use nalgebra::DMatrix;

use super::quantile::{mean, median};
use crate::config::GroupedStatistic;
use crate::types::{StatMatrix, TrialArray};

impl GroupedStatistic {
    /// Reduce one cell's values across trials.
    ///
    /// `values` may be reordered. Must not be empty.
    pub fn reduce(self, values: &mut [f64]) -> f64 {
        match self {
            GroupedStatistic::Mean => mean(values),
            GroupedStatistic::Median => median(values),
        }
    }
}

/// Baseline and condition trials addressed as one pooled index space:
/// indices `0..n_baseline` are baseline trials, the rest condition trials.
#[derive(Debug, Clone, Copy)]
pub struct TrialPool<'a> {
    baseline: &'a TrialArray,
    condition: &'a TrialArray,
}

impl<'a> TrialPool<'a> {
    /// Pool two arrays. Callers must have checked that trailing shapes match.
    pub fn new(baseline: &'a TrialArray, condition: &'a TrialArray) -> Self {
        debug_assert_eq!(baseline.shape(), condition.shape());
        Self {
            baseline,
            condition,
        }
    }

    /// Total number of pooled trials.
    pub fn len(&self) -> usize {
        self.baseline.n_trials() + self.condition.n_trials()
    }

    /// True if neither group has trials.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Baseline trial count.
    pub fn n_baseline(&self) -> usize {
        self.baseline.n_trials()
    }

    /// Condition trial count.
    pub fn n_condition(&self) -> usize {
        self.condition.n_trials()
    }

    /// Trailing `(rows, cols)` shape.
    pub fn shape(&self) -> (usize, usize) {
        self.baseline.shape()
    }

    /// Baseline trials.
    pub fn baseline(&self) -> &'a TrialArray {
        self.baseline
    }

    /// Condition trials.
    pub fn condition(&self) -> &'a TrialArray {
        self.condition
    }

    /// Pooled trial `i`.
    pub fn trial(&self, i: usize) -> &'a [f64] {
        let nb = self.baseline.n_trials();
        if i < nb {
            self.baseline.trial(i)
        } else {
            self.condition.trial(i - nb)
        }
    }
}

/// Grouped statistic over every trial of `trials`.
///
/// # Panics
///
/// Panics if `trials` has no trials.
pub fn grouped_statistic(trials: &TrialArray, stat: GroupedStatistic) -> StatMatrix {
    let selected: Vec<&[f64]> = (0..trials.n_trials()).map(|t| trials.trial(t)).collect();
    let mut scratch = Vec::with_capacity(selected.len());
    reduce_trials(&selected, trials.rows(), trials.cols(), stat, &mut scratch)
}

/// Observed grouped difference `grouped(condition) - grouped(baseline)`.
pub fn grouped_difference(
    baseline: &TrialArray,
    condition: &TrialArray,
    stat: GroupedStatistic,
) -> StatMatrix {
    grouped_statistic(condition, stat) - grouped_statistic(baseline, stat)
}

/// Grouped difference between two index sets of a pool.
///
/// `scratch` is reused across calls to avoid per-cell allocation.
pub(crate) fn pooled_difference(
    pool: &TrialPool<'_>,
    condition_idx: &[usize],
    baseline_idx: &[usize],
    stat: GroupedStatistic,
    scratch: &mut Vec<f64>,
) -> StatMatrix {
    let (rows, cols) = pool.shape();
    let cond: Vec<&[f64]> = condition_idx.iter().map(|&i| pool.trial(i)).collect();
    let base: Vec<&[f64]> = baseline_idx.iter().map(|&i| pool.trial(i)).collect();
    reduce_trials(&cond, rows, cols, stat, scratch) - reduce_trials(&base, rows, cols, stat, scratch)
}

/// Cell-wise reduction of a set of flat row-major trials.
pub(crate) fn reduce_trials(
    selected: &[&[f64]],
    rows: usize,
    cols: usize,
    stat: GroupedStatistic,
    scratch: &mut Vec<f64>,
) -> StatMatrix {
    assert!(!selected.is_empty(), "Cannot reduce an empty trial set");

    DMatrix::from_fn(rows, cols, |r, c| {
        let idx = r * cols + c;
        scratch.clear();
        scratch.extend(selected.iter().map(|trial| trial[idx]));
        stat.reduce(scratch)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(n_trials: usize, offset: f64) -> TrialArray {
        TrialArray::from_fn(n_trials, 2, 3, |t, r, c| offset + t as f64 + (r * 3 + c) as f64 * 10.0)
    }

    #[test]
    fn test_mean_over_trials() {
        let arr = ramp(3, 0.0);
        let g = grouped_statistic(&arr, GroupedStatistic::Mean);
        assert_eq!(g.shape(), (2, 3));
        // trials contribute 0, 1, 2 on top of the cell offset
        approx::assert_abs_diff_eq!(g[(0, 0)], 1.0, epsilon = 1e-12);
        approx::assert_abs_diff_eq!(g[(1, 2)], 51.0, epsilon = 1e-12);
    }

    #[test]
    fn test_median_ignores_outlier_trial() {
        let arr = TrialArray::from_fn(3, 1, 2, |t, _, _| if t == 2 { 1000.0 } else { t as f64 });
        let g = grouped_statistic(&arr, GroupedStatistic::Median);
        approx::assert_abs_diff_eq!(g[(0, 1)], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_difference_sign_is_condition_minus_baseline() {
        let base = ramp(4, 0.0);
        let cond = ramp(2, 5.0);
        let d = grouped_difference(&base, &cond, GroupedStatistic::Mean);
        // base mean adds 1.5, cond mean adds 5.5
        approx::assert_abs_diff_eq!(d[(0, 1)], 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_pool_indexing() {
        let base = ramp(2, 0.0);
        let cond = ramp(3, 100.0);
        let pool = TrialPool::new(&base, &cond);
        assert_eq!(pool.len(), 5);
        assert_eq!(pool.trial(1)[0], 1.0);
        assert_eq!(pool.trial(2)[0], 100.0);

        let mut scratch = Vec::new();
        let d = pooled_difference(&pool, &[2, 3, 4], &[0, 1], GroupedStatistic::Mean, &mut scratch);
        let direct = grouped_difference(&base, &cond, GroupedStatistic::Mean);
        approx::assert_abs_diff_eq!(d[(1, 1)], direct[(1, 1)], epsilon = 1e-12);
    }
}
