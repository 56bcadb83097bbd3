//! Progress reporting for long surrogate loops.
//!
//! Purely observational: milestones are logged at `info` level and forwarded
//! to an optional callback; they never affect control flow.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Callback receiving the percentage milestone that was just reached.
#[derive(Clone)]
pub struct ProgressCallback(Arc<dyn Fn(u8) + Send + Sync>);

impl ProgressCallback {
    /// Wrap a closure.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(u8) + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    fn call(&self, pct: u8) {
        (self.0)(pct)
    }
}

impl fmt::Debug for ProgressCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ProgressCallback(..)")
    }
}

/// Number of completed surrogates at which `pct` percent is reached:
/// the smallest `i` with `i / total * 100 >= pct`.
pub fn milestone_count(pct: u8, total: usize) -> usize {
    (pct as usize * total).div_ceil(100)
}

/// Counts completed surrogates across worker threads and fires milestones.
pub(crate) struct ProgressTracker<'a> {
    label: &'a str,
    milestones: Vec<(usize, u8)>,
    done: AtomicUsize,
    callback: Option<&'a ProgressCallback>,
}

impl<'a> ProgressTracker<'a> {
    pub(crate) fn new(
        label: &'a str,
        total: usize,
        percents: &[u8],
        callback: Option<&'a ProgressCallback>,
    ) -> Self {
        let milestones = percents
            .iter()
            .map(|&pct| (milestone_count(pct, total), pct))
            .filter(|&(at, _)| at > 0)
            .collect();
        Self {
            label,
            milestones,
            done: AtomicUsize::new(0),
            callback,
        }
    }

    /// Record one completed surrogate.
    pub(crate) fn tick(&self) {
        let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        for &(at, pct) in &self.milestones {
            if done == at {
                log::info!("{}: {}% of surrogates done", self.label, pct);
                if let Some(cb) = self.callback {
                    cb.call(pct);
                }
            }
        }
    }

    pub(crate) fn completed(&self) -> usize {
        self.done.load(Ordering::Relaxed)
    }
}
