//! Core data types: trial arrays, significance masks and type aliases.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::{ClusterError, Result};

/// Grouped statistic or grouped difference, `rows × cols` (1 × time for
/// signals, freq × time for time-frequency maps).
pub type StatMatrix = DMatrix<f64>;

/// One bound per bin (length 1 for global bounds, one per row otherwise).
pub type BoundVector = DVector<f64>;

/// Experimental group a trial belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Group {
    /// Reference trials.
    Baseline,
    /// Trials compared against the baseline.
    Condition,
}

/// Trial-wise data for one experimental group.
///
/// Stored trial-major, row-major inside each trial: the value of trial `t`,
/// row `r`, column `c` lives at `t * rows * cols + r * cols + c`. Signals use
/// `rows = 1`; time-frequency maps use one row per frequency bin.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialArray {
    n_trials: usize,
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl TrialArray {
    /// Wrap a flat buffer of `n_trials × rows × cols` values.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::InvalidInput`] if `data.len()` does not match
    /// the declared shape.
    pub fn new(n_trials: usize, rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        if data.len() != n_trials * rows * cols {
            return Err(ClusterError::invalid(format!(
                "buffer holds {} values, shape [{}, {}, {}] needs {}",
                data.len(),
                n_trials,
                rows,
                cols,
                n_trials * rows * cols
            )));
        }
        Ok(Self {
            n_trials,
            rows,
            cols,
            data,
        })
    }

    /// Build a `[trials, rows, cols]` array from a generator closure.
    pub fn from_fn<F>(n_trials: usize, rows: usize, cols: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize, usize) -> f64,
    {
        let mut data = Vec::with_capacity(n_trials * rows * cols);
        for t in 0..n_trials {
            for r in 0..rows {
                for c in 0..cols {
                    data.push(f(t, r, c));
                }
            }
        }
        Self {
            n_trials,
            rows,
            cols,
            data,
        }
    }

    /// Build a `[trials, time]` array from one vector per trial.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::InvalidInput`] if trials have different lengths.
    pub fn from_signals(trials: &[Vec<f64>]) -> Result<Self> {
        let cols = trials.first().map_or(0, Vec::len);
        if let Some(i) = trials.iter().position(|t| t.len() != cols) {
            return Err(ClusterError::invalid(format!(
                "trial {} has {} samples, expected {}",
                i,
                trials[i].len(),
                cols
            )));
        }
        let data = trials.iter().flatten().copied().collect();
        Self::new(trials.len(), 1, cols, data)
    }

    /// Build a `[trials, time]` array from a matrix with one trial per row.
    pub fn from_matrix(trials: &DMatrix<f64>) -> Self {
        let (n_trials, cols) = trials.shape();
        Self::from_fn(n_trials, 1, cols, |t, _, c| trials[(t, c)])
    }

    /// Build a `[trials, freq, time]` array from one `freq × time` map per trial.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::InvalidInput`] if the maps have different shapes.
    pub fn from_maps(maps: &[DMatrix<f64>]) -> Result<Self> {
        let (rows, cols) = maps.first().map_or((0, 0), |m| m.shape());
        if let Some(i) = maps.iter().position(|m| m.shape() != (rows, cols)) {
            return Err(ClusterError::invalid(format!(
                "trial {} has shape {:?}, expected {:?}",
                i,
                maps[i].shape(),
                (rows, cols)
            )));
        }
        let mut data = Vec::with_capacity(maps.len() * rows * cols);
        for m in maps {
            for r in 0..rows {
                data.extend(m.row(r).iter().copied());
            }
        }
        Self::new(maps.len(), rows, cols, data)
    }

    /// Number of trials (leading dimension).
    pub fn n_trials(&self) -> usize {
        self.n_trials
    }

    /// Rows per trial (1 for signals, frequency bins for maps).
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Columns per trial (time samples).
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Trailing `(rows, cols)` shape shared by every trial.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Number of values in one trial.
    pub fn trial_len(&self) -> usize {
        self.rows * self.cols
    }

    /// True if the array holds no values at all.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Flat row-major view of trial `t`.
    ///
    /// # Panics
    ///
    /// Panics if `t >= n_trials()`.
    pub fn trial(&self, t: usize) -> &[f64] {
        let len = self.trial_len();
        &self.data[t * len..(t + 1) * len]
    }

    pub(crate) fn trial_mut(&mut self, t: usize) -> &mut [f64] {
        let len = self.trial_len();
        &mut self.data[t * len..(t + 1) * len]
    }

    pub(crate) fn ensure_finite(&self, name: &str) -> Result<()> {
        match self.data.iter().position(|v| !v.is_finite()) {
            Some(i) => Err(ClusterError::invalid(format!(
                "{} contains a non-finite value in trial {}",
                name,
                i / self.trial_len().max(1)
            ))),
            None => Ok(()),
        }
    }
}

/// Boolean significance mask with the shape of the grouped statistic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mask {
    rows: usize,
    cols: usize,
    cells: Vec<bool>,
}

impl Mask {
    /// All-False mask of the given shape.
    pub fn empty(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![false; rows * cols],
        }
    }

    /// Build a mask cell by cell.
    pub fn from_fn<F>(rows: usize, cols: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> bool,
    {
        let mut cells = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            for c in 0..cols {
                cells.push(f(r, c));
            }
        }
        Self { rows, cols, cells }
    }

    /// Single-row mask from a slice of flags.
    pub fn from_row(flags: &[bool]) -> Self {
        Self {
            rows: 1,
            cols: flags.len(),
            cells: flags.to_vec(),
        }
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// True if the mask has no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cell value at `(r, c)`.
    pub fn get(&self, r: usize, c: usize) -> bool {
        self.cells[r * self.cols + c]
    }

    /// Set the cell at `(r, c)`.
    pub fn set(&mut self, r: usize, c: usize, value: bool) {
        self.cells[r * self.cols + c] = value;
    }

    /// Number of True cells.
    pub fn count(&self) -> usize {
        self.cells.iter().filter(|&&v| v).count()
    }

    /// True if at least one cell is set.
    pub fn any(&self) -> bool {
        self.cells.iter().any(|&v| v)
    }

    /// Row-major cell flags.
    pub fn as_slice(&self) -> &[bool] {
        &self.cells
    }

    /// Flags of row `r`.
    pub fn row(&self, r: usize) -> &[bool] {
        &self.cells[r * self.cols..(r + 1) * self.cols]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trial_layout() {
        let arr = TrialArray::from_fn(3, 2, 4, |t, r, c| (t * 100 + r * 10 + c) as f64);
        assert_eq!(arr.n_trials(), 3);
        assert_eq!(arr.shape(), (2, 4));
        assert_eq!(arr.trial(1)[0], 100.0);
        assert_eq!(arr.trial(2)[5], 211.0);
    }

    #[test]
    fn test_from_signals_rejects_ragged() {
        let err = TrialArray::from_signals(&[vec![1.0, 2.0], vec![1.0]]).unwrap_err();
        assert!(matches!(err, ClusterError::InvalidInput(_)));
    }

    #[test]
    fn test_from_maps_matches_row_major() {
        let m = DMatrix::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let arr = TrialArray::from_maps(&[m.clone(), m * 2.0]).unwrap();
        assert_eq!(arr.trial(0), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(arr.trial(1)[5], 12.0);
    }

    #[test]
    fn test_from_matrix_one_trial_per_row() {
        let m = DMatrix::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let arr = TrialArray::from_matrix(&m);
        assert_eq!(arr.n_trials(), 2);
        assert_eq!(arr.shape(), (1, 3));
        assert_eq!(arr.trial(1), &[4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_non_finite_detected() {
        let arr = TrialArray::from_fn(2, 1, 3, |t, _, c| if t == 1 && c == 2 { f64::NAN } else { 0.0 });
        assert!(arr.ensure_finite("baseline").is_err());
    }

    #[test]
    fn test_mask_accessors() {
        let mut mask = Mask::empty(2, 3);
        assert!(!mask.any());
        mask.set(1, 2, true);
        assert!(mask.get(1, 2));
        assert_eq!(mask.count(), 1);
        assert_eq!(mask.row(1), &[false, false, true]);
    }
}
