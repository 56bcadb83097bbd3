//! Z-score and robust-score normalization.
//!
//! `zscore_inplace`: `(x - mean) / std`, population std (ddof = 0).
//!
//! `rscore_inplace`: `(x - median) * 0.6745 / MAD`, where MAD is the median
//! absolute deviation. The 0.6745 factor makes the score comparable to a
//! z-score for Gaussian data.

use serde::{Deserialize, Serialize};

use super::quantile::{mean, median};
use crate::types::TrialArray;

/// Normal quantile at 0.75, scaling MAD to a standard deviation.
const MAD_SCALE: f64 = 0.6745;

/// Normalization applied along the time axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Normalization {
    /// Mean / standard deviation.
    ZScore,
    /// Median / median absolute deviation.
    RScore,
}

/// Z-score a slice in place. Returns `(mean, std)`, or `None` if the slice is
/// empty or constant, in which case it is left unchanged.
pub fn zscore_inplace(data: &mut [f64]) -> Option<(f64, f64)> {
    if data.is_empty() {
        return None;
    }
    let m = mean(data);
    let var = data.iter().map(|&v| (v - m) * (v - m)).sum::<f64>() / data.len() as f64;
    let std = var.sqrt();
    if std == 0.0 {
        return None;
    }
    for v in data.iter_mut() {
        *v = (*v - m) / std;
    }
    Some((m, std))
}

/// Robust-score a slice in place. Returns `(median, mad)`, or `None` if the
/// slice is empty or its MAD is zero, in which case it is left unchanged.
pub fn rscore_inplace(data: &mut [f64]) -> Option<(f64, f64)> {
    if data.is_empty() {
        return None;
    }
    let mut work = data.to_vec();
    let med = median(&mut work);
    for (w, &v) in work.iter_mut().zip(data.iter()) {
        *w = (v - med).abs();
    }
    let mad = median(&mut work);
    if mad == 0.0 {
        return None;
    }
    for v in data.iter_mut() {
        *v = (*v - med) * MAD_SCALE / mad;
    }
    Some((med, mad))
}

impl Normalization {
    /// Apply to one slice. See [`zscore_inplace`] and [`rscore_inplace`].
    pub fn apply(self, data: &mut [f64]) -> Option<(f64, f64)> {
        match self {
            Normalization::ZScore => zscore_inplace(data),
            Normalization::RScore => rscore_inplace(data),
        }
    }
}

impl TrialArray {
    /// Normalize every row of every trial independently along time.
    ///
    /// Returns the number of rows left unchanged because they were constant.
    pub fn normalize_rows(&mut self, method: Normalization) -> usize {
        let cols = self.cols();
        if cols == 0 {
            return 0;
        }
        let mut skipped = 0;
        for t in 0..self.n_trials() {
            for row in self.trial_mut(t).chunks_mut(cols) {
                if method.apply(row).is_none() {
                    skipped += 1;
                }
            }
        }
        if skipped > 0 {
            log::debug!("{} constant rows left unnormalized", skipped);
        }
        skipped
    }
}
