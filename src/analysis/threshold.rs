//! Threshold estimation: per-surrogate lows/highs → rejection bounds.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use super::surrogate::SurrogateDistribution;
use crate::config::{check_percentile_pair, ThresholdAggregation};
use crate::error::{ClusterError, Result};
use crate::statistics::{compute_quantile, mean, median};
use crate::types::BoundVector;

/// Two-sided rejection bounds, one entry per bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Lower bound per bin.
    pub lower: BoundVector,
    /// Upper bound per bin.
    pub upper: BoundVector,
}

impl Thresholds {
    /// Single global bound pair.
    pub fn global(lower: f64, upper: f64) -> Self {
        Self {
            lower: DVector::from_element(1, lower),
            upper: DVector::from_element(1, upper),
        }
    }

    /// One bound pair per row.
    pub fn per_row(lower: Vec<f64>, upper: Vec<f64>) -> Self {
        Self {
            lower: DVector::from_vec(lower),
            upper: DVector::from_vec(upper),
        }
    }

    /// Number of bins.
    pub fn len(&self) -> usize {
        self.lower.len()
    }

    /// True if there are no bins.
    pub fn is_empty(&self) -> bool {
        self.lower.is_empty()
    }

    /// True if a single pair applies to the whole statistic.
    pub fn is_global(&self) -> bool {
        self.len() == 1
    }

    /// `(lower, upper)` applying to `row`.
    pub fn bounds_for_row(&self, row: usize) -> (f64, f64) {
        let bin = if self.is_global() { 0 } else { row };
        (self.lower[bin], self.upper[bin])
    }
}

impl ThresholdAggregation {
    /// Combine the lows and highs of one bin into `(lower, upper)`.
    ///
    /// `Mean` pairs the mean of the lows with the **median** of the highs.
    /// Both slices may be reordered and must not be empty.
    pub fn aggregate(self, lows: &mut [f64], highs: &mut [f64]) -> (f64, f64) {
        match self {
            ThresholdAggregation::Mean => (mean(lows), median(highs)),
            ThresholdAggregation::Median => (median(lows), median(highs)),
            ThresholdAggregation::Percentile { lower, upper } => (
                compute_quantile(lows, lower / 100.0),
                compute_quantile(highs, upper / 100.0),
            ),
        }
    }
}

/// Reduce a surrogate distribution into per-bin bounds.
///
/// # Errors
///
/// [`ClusterError::DegenerateDistribution`] if every low and high of a bin
/// is the same value (zero-variance null),
/// [`ClusterError::InvalidInput`] if the distribution is empty, and
/// [`ClusterError::Configuration`] for an invalid percentile pair.
pub fn estimate_thresholds(
    dist: &SurrogateDistribution,
    aggregation: ThresholdAggregation,
) -> Result<Thresholds> {
    if let ThresholdAggregation::Percentile { lower, upper } = aggregation {
        check_percentile_pair(lower, upper)?;
    }
    let n_surr = dist.n_surr();
    if n_surr == 0 || dist.n_bins() == 0 {
        return Err(ClusterError::invalid("surrogate distribution is empty"));
    }

    let mut lower = Vec::with_capacity(dist.n_bins());
    let mut upper = Vec::with_capacity(dist.n_bins());

    for bin in 0..dist.n_bins() {
        let mut lows = dist.lows_of(bin);
        let mut highs = dist.highs_of(bin);

        let first = lows[0];
        if lows.iter().chain(highs.iter()).all(|&v| v == first) {
            return Err(ClusterError::DegenerateDistribution { bin, n_surr });
        }

        let (lo, hi) = aggregation.aggregate(&mut lows, &mut highs);
        lower.push(lo);
        upper.push(hi);
    }

    log::debug!(
        "thresholds ({}): {} bins, first bin [{:.4}, {:.4}]",
        aggregation,
        lower.len(),
        lower[0],
        upper[0]
    );

    Ok(Thresholds::per_row(lower, upper))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix;

    fn dist(lows: &[f64], highs: &[f64]) -> SurrogateDistribution {
        SurrogateDistribution {
            lows: DMatrix::from_row_slice(1, lows.len(), lows),
            highs: DMatrix::from_row_slice(1, highs.len(), highs),
        }
    }

    #[test]
    fn test_mean_mode_is_asymmetric() {
        // lows: mean -3, median -1; highs: mean 4, median 2
        let d = dist(&[-1.0, -1.0, -7.0], &[1.0, 2.0, 9.0]);
        let t = estimate_thresholds(&d, ThresholdAggregation::Mean).unwrap();
        approx::assert_abs_diff_eq!(t.lower[0], -3.0, epsilon = 1e-12);
        approx::assert_abs_diff_eq!(t.upper[0], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_median_mode() {
        let d = dist(&[-1.0, -1.0, -7.0], &[1.0, 2.0, 9.0]);
        let t = estimate_thresholds(&d, ThresholdAggregation::Median).unwrap();
        assert_eq!((t.lower[0], t.upper[0]), (-1.0, 2.0));
    }

    #[test]
    fn test_percentile_mode() {
        let lows: Vec<f64> = (0..101).map(|x| -(x as f64)).collect();
        let highs: Vec<f64> = (0..101).map(|x| x as f64).collect();
        let d = dist(&lows, &highs);
        let t = estimate_thresholds(&d, ThresholdAggregation::Percentile { lower: 2.5, upper: 97.5 })
            .unwrap();
        approx::assert_abs_diff_eq!(t.lower[0], -97.5, epsilon = 1e-9);
        approx::assert_abs_diff_eq!(t.upper[0], 97.5, epsilon = 1e-9);
    }

    #[test]
    fn test_per_row_bins_are_independent() {
        let d = SurrogateDistribution {
            lows: DMatrix::from_row_slice(2, 2, &[-1.0, -2.0, -10.0, -20.0]),
            highs: DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 10.0, 20.0]),
        };
        let t = estimate_thresholds(&d, ThresholdAggregation::Median).unwrap();
        assert_eq!(t.len(), 2);
        assert_eq!(t.bounds_for_row(0), (-1.5, 1.5));
        assert_eq!(t.bounds_for_row(1), (-15.0, 15.0));
    }

    #[test]
    fn test_zero_variance_is_degenerate() {
        let d = dist(&[0.0; 8], &[0.0; 8]);
        let err = estimate_thresholds(&d, ThresholdAggregation::Median).unwrap_err();
        assert_eq!(err, ClusterError::DegenerateDistribution { bin: 0, n_surr: 8 });
    }

    #[test]
    fn test_invalid_percentile_pair_is_configuration_error() {
        let d = dist(&[-3.0, -1.0, -2.0], &[1.0, 2.0, 3.0]);
        for (lower, upper) in [(-5.0, 99.0), (1.0, 101.0), (50.0, 50.0)] {
            let err = estimate_thresholds(&d, ThresholdAggregation::Percentile { lower, upper })
                .unwrap_err();
            assert!(matches!(err, ClusterError::Configuration(_)), "{:?}", err);
        }
    }

    #[test]
    fn test_global_bounds_broadcast() {
        let t = Thresholds::global(-1.0, 1.0);
        assert!(t.is_global());
        assert_eq!(t.bounds_for_row(7), (-1.0, 1.0));
    }
}
