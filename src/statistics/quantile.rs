//! Quantiles, percentiles and central tendency.
//!
//! Percentiles use the linear-interpolation ("R-7") definition, which is
//! also NumPy's default for `np.percentile` and `np.median`. Selection uses
//! `select_nth_unstable_by` so a single quantile costs O(n) on average.

/// Compute a single quantile from a mutable slice.
///
/// The slice is partially reordered as a side effect.
///
/// # Arguments
///
/// * `data` - Values to summarize (will be partially reordered)
/// * `p` - Quantile probability in [0, 1]
///
/// # Panics
///
/// Panics if `data` is empty or if `p` is outside [0, 1].
pub fn compute_quantile(data: &mut [f64], p: f64) -> f64 {
    assert!(!data.is_empty(), "Cannot compute quantile of empty slice");
    assert!(
        (0.0..=1.0).contains(&p),
        "Quantile probability must be in [0, 1]"
    );

    let n = data.len();
    if n == 1 {
        return data[0];
    }

    let h = (n - 1) as f64 * p;
    let h_floor = h.floor() as usize;
    let h_frac = h - h.floor();

    if h_floor >= n - 1 {
        let (_, &mut max, _) = data.select_nth_unstable_by(n - 1, |a, b| a.total_cmp(b));
        return max;
    }

    let (_, &mut lower, upper) = data.select_nth_unstable_by(h_floor, |a, b| a.total_cmp(b));
    if h_frac == 0.0 {
        return lower;
    }

    // The next order statistic is the minimum of the upper partition.
    let upper_min = upper
        .iter()
        .copied()
        .min_by(|a, b| a.total_cmp(b))
        .unwrap_or(lower);

    lower + h_frac * (upper_min - lower)
}

/// Quantile of already-sorted data (ascending). No verification is performed.
///
/// # Panics
///
/// Panics if `sorted` is empty.
pub fn compute_quantile_sorted(sorted: &[f64], p: f64) -> f64 {
    assert!(!sorted.is_empty(), "Cannot compute quantile of empty slice");

    let n = sorted.len();
    let h = (n - 1) as f64 * p.clamp(0.0, 1.0);
    let h_floor = h.floor() as usize;
    let h_frac = h - h.floor();

    if h_floor >= n - 1 {
        sorted[n - 1]
    } else if h_frac == 0.0 {
        sorted[h_floor]
    } else {
        sorted[h_floor] + h_frac * (sorted[h_floor + 1] - sorted[h_floor])
    }
}

/// Percentile on the 0–100 scale, e.g. `percentile(&mut v, 99.0)`.
///
/// # Panics
///
/// Panics if `data` is empty or `q` is outside [0, 100].
pub fn percentile(data: &mut [f64], q: f64) -> f64 {
    compute_quantile(data, q / 100.0)
}

/// Median (average of the two middle values for even lengths).
///
/// # Panics
///
/// Panics if `data` is empty.
pub fn median(data: &mut [f64]) -> f64 {
    compute_quantile(data, 0.5)
}

/// Arithmetic mean. Returns NaN for an empty slice.
pub fn mean(data: &[f64]) -> f64 {
    data.iter().sum::<f64>() / data.len() as f64
}
