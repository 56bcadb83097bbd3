//! Significance masks from an observed statistic and its bounds.

use super::threshold::Thresholds;
use crate::error::{ClusterError, Result};
use crate::types::{Mask, StatMatrix};

/// Mark every cell strictly outside `(lower, upper)`.
///
/// Global bounds (length 1) apply to every cell; per-row bounds must have one
/// entry per row of `observed`. A value equal to a bound is not significant.
///
/// # Errors
///
/// [`ClusterError::InvalidInput`] if the bounds cannot be broadcast onto the
/// statistic.
pub fn build_mask(observed: &StatMatrix, thresholds: &Thresholds) -> Result<Mask> {
    let rows = observed.nrows();
    if thresholds.lower.len() != thresholds.upper.len() {
        return Err(ClusterError::invalid(format!(
            "lower bounds have {} entries but upper bounds have {}",
            thresholds.lower.len(),
            thresholds.upper.len()
        )));
    }
    if !(thresholds.is_global() || thresholds.len() == rows) {
        return Err(ClusterError::invalid(format!(
            "{} bounds cannot be broadcast onto a statistic with {} rows",
            thresholds.len(),
            rows
        )));
    }

    Ok(Mask::from_fn(rows, observed.ncols(), |r, c| {
        let (lo, hi) = thresholds.bounds_for_row(r);
        let v = observed[(r, c)];
        v < lo || v > hi
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix;

    #[test]
    fn test_bounds_are_strict() {
        let obs = DMatrix::from_row_slice(1, 5, &[-2.0, -1.0, 0.0, 1.0, 2.0]);
        let mask = build_mask(&obs, &Thresholds::global(-1.0, 1.0)).unwrap();
        assert_eq!(mask.as_slice(), &[true, false, false, false, true]);
    }

    #[test]
    fn test_per_row_bounds() {
        let obs = DMatrix::from_row_slice(2, 3, &[0.5, 1.5, -0.5, 0.5, 1.5, -0.5]);
        let t = Thresholds::per_row(vec![-1.0, 0.0], vec![1.0, 1.0]);
        let mask = build_mask(&obs, &t).unwrap();
        assert_eq!(mask.as_slice(), &[false, true, false, false, true, true]);
        assert_eq!(build_mask(&obs, &t).unwrap(), mask);
    }

    #[test]
    fn test_rejects_unbroadcastable_bounds() {
        let obs = DMatrix::zeros(3, 4);
        let t = Thresholds::per_row(vec![0.0, 0.0], vec![1.0, 1.0]);
        assert!(matches!(build_mask(&obs, &t), Err(ClusterError::InvalidInput(_))));
    }
}
