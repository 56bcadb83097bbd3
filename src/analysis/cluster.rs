//! Connected-component labeling and cluster-size filtering.
//!
//! Labeling is the classic two-pass algorithm: the first raster scan assigns
//! provisional labels and records equivalences in a union-find forest, the
//! second resolves every cell to its root. Final labels are renumbered
//! `1..=n` in order of first appearance, so they follow raster order.

use serde::{Deserialize, Serialize};

use crate::config::Connectivity;
use crate::error::{ClusterError, Result};
use crate::statistics::percentile;
use crate::types::Mask;

/// Disjoint-set forest over provisional labels.
#[derive(Debug, Default)]
struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn make_set(&mut self) -> usize {
        let id = self.parent.len();
        self.parent.push(id);
        id
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            // path halving
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            // keep the smaller root so early labels stay stable
            let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[hi] = lo;
        }
    }
}

/// One connected region of a mask.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    /// Label in `1..=n`, raster order of first cell.
    pub label: usize,
    /// Number of cells.
    pub size: usize,
    /// Inclusive row range.
    pub rows: (usize, usize),
    /// Inclusive column range.
    pub cols: (usize, usize),
    /// Whether the cluster survived the size filter.
    pub retained: bool,
}

impl Cluster {
    fn seed(label: usize, r: usize, c: usize) -> Self {
        Self {
            label,
            size: 0,
            rows: (r, r),
            cols: (c, c),
            retained: true,
        }
    }

    fn include(&mut self, r: usize, c: usize) {
        self.size += 1;
        self.rows = (self.rows.0.min(r), self.rows.1.max(r));
        self.cols = (self.cols.0.min(c), self.cols.1.max(c));
    }
}

/// Result of labeling a mask.
#[derive(Debug, Clone, PartialEq)]
pub struct Labeling {
    rows: usize,
    cols: usize,
    /// Row-major labels, 0 for background.
    labels: Vec<usize>,
    /// Clusters ordered by label.
    pub clusters: Vec<Cluster>,
}

impl Labeling {
    /// Label at `(r, c)`, 0 for background.
    pub fn label_at(&self, r: usize, c: usize) -> usize {
        self.labels[r * self.cols + c]
    }

    /// Number of clusters.
    pub fn n_clusters(&self) -> usize {
        self.clusters.len()
    }

    /// Cluster sizes ordered by label.
    pub fn sizes(&self) -> Vec<usize> {
        self.clusters.iter().map(|c| c.size).collect()
    }

    /// `(rows, cols)` of the labeled grid.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }
}

/// Label the connected True regions of `mask`.
pub fn label_clusters(mask: &Mask, connectivity: Connectivity) -> Labeling {
    let (rows, cols) = mask.shape();
    let mut provisional = vec![usize::MAX; rows * cols];
    let mut forest = UnionFind::default();

    for r in 0..rows {
        for c in 0..cols {
            if !mask.get(r, c) {
                continue;
            }
            let mut neighbours = [usize::MAX; 4];
            let mut n = 0;
            let mut push = |rr: usize, cc: usize| {
                let l = provisional[rr * cols + cc];
                if l != usize::MAX {
                    neighbours[n] = l;
                    n += 1;
                }
            };
            if c > 0 {
                push(r, c - 1);
            }
            if r > 0 {
                push(r - 1, c);
                if connectivity == Connectivity::Eight {
                    if c > 0 {
                        push(r - 1, c - 1);
                    }
                    if c + 1 < cols {
                        push(r - 1, c + 1);
                    }
                }
            }

            let label = match neighbours[..n].iter().min() {
                Some(&first) => {
                    for &other in &neighbours[..n] {
                        forest.union(first, other);
                    }
                    first
                }
                None => forest.make_set(),
            };
            provisional[r * cols + c] = label;
        }
    }

    let mut renumber = vec![0usize; forest.parent.len()];
    let mut labels = vec![0usize; rows * cols];
    let mut clusters: Vec<Cluster> = Vec::new();

    for r in 0..rows {
        for c in 0..cols {
            let p = provisional[r * cols + c];
            if p == usize::MAX {
                continue;
            }
            let root = forest.find(p);
            if renumber[root] == 0 {
                clusters.push(Cluster::seed(clusters.len() + 1, r, c));
                renumber[root] = clusters.len();
            }
            let label = renumber[root];
            labels[r * cols + c] = label;
            clusters[label - 1].include(r, c);
        }
    }

    Labeling {
        rows,
        cols,
        labels,
        clusters,
    }
}

/// How the minimum retained cluster size is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ClusterSizeRule {
    /// `total_cells × alpha`, independent of the data.
    FractionOfSamples(f64),
    /// Given percentile (0–100) of the observed cluster sizes.
    Percentile(f64),
    /// Fixed size.
    Fixed(f64),
}

impl ClusterSizeRule {
    /// Resolve the minimum size for a grid of `total_cells` with these
    /// cluster `sizes`. Returns `None` when there are no clusters.
    ///
    /// # Errors
    ///
    /// [`ClusterError::Configuration`] for a negative or non-finite alpha or
    /// size, or a percentile outside `[0, 100]`.
    pub fn min_size(self, sizes: &[usize], total_cells: usize) -> Result<Option<f64>> {
        self.check()?;
        if sizes.is_empty() {
            return Ok(None);
        }
        Ok(Some(match self {
            ClusterSizeRule::FractionOfSamples(alpha) => total_cells as f64 * alpha,
            ClusterSizeRule::Percentile(p) => {
                let mut s: Vec<f64> = sizes.iter().map(|&s| s as f64).collect();
                percentile(&mut s, p)
            }
            ClusterSizeRule::Fixed(n) => n,
        }))
    }

    fn check(self) -> Result<()> {
        let ok = match self {
            ClusterSizeRule::FractionOfSamples(alpha) => alpha.is_finite() && alpha >= 0.0,
            ClusterSizeRule::Percentile(p) => (0.0..=100.0).contains(&p),
            ClusterSizeRule::Fixed(n) => n.is_finite() && n >= 0.0,
        };
        if ok {
            Ok(())
        } else {
            Err(ClusterError::config(format!("invalid cluster size rule {:?}", self)))
        }
    }
}

/// A mask after cluster-size filtering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilteredMask {
    /// Mask keeping only retained clusters.
    pub mask: Mask,
    /// Every labeled cluster, retained or not.
    pub clusters: Vec<Cluster>,
    /// Resolved minimum size, `None` if the input mask was empty.
    pub min_size: Option<f64>,
}

impl FilteredMask {
    /// Clusters that survived the filter.
    pub fn retained(&self) -> impl Iterator<Item = &Cluster> {
        self.clusters.iter().filter(|c| c.retained)
    }

    /// Number of surviving clusters.
    pub fn n_retained(&self) -> usize {
        self.retained().count()
    }
}

/// Zero every cluster of `mask` smaller than the size chosen by `rule`.
///
/// An all-False mask is returned unchanged without labeling.
///
/// # Errors
///
/// [`ClusterError::Configuration`] for a negative or non-finite alpha or
/// size, or a percentile outside `[0, 100]`.
pub fn filter_clusters(
    mask: &Mask,
    rule: ClusterSizeRule,
    connectivity: Connectivity,
) -> Result<FilteredMask> {
    rule.check()?;
    if !mask.any() {
        return Ok(FilteredMask {
            mask: mask.clone(),
            clusters: Vec::new(),
            min_size: None,
        });
    }

    let labeling = label_clusters(mask, connectivity);
    let min_size = rule.min_size(&labeling.sizes(), mask.len())?;
    Ok(apply_min_size(&labeling, min_size))
}

/// Zero every cluster of `mask` with fewer than `min_size` cells.
pub fn filter_with_min_size(mask: &Mask, min_size: f64, connectivity: Connectivity) -> FilteredMask {
    if !mask.any() {
        return FilteredMask {
            mask: mask.clone(),
            clusters: Vec::new(),
            min_size: Some(min_size),
        };
    }
    apply_min_size(&label_clusters(mask, connectivity), Some(min_size))
}

fn apply_min_size(labeling: &Labeling, min_size: Option<f64>) -> FilteredMask {
    let threshold = min_size.unwrap_or(0.0);
    let mut clusters = labeling.clusters.clone();
    for cluster in &mut clusters {
        cluster.retained = cluster.size as f64 >= threshold;
    }

    let (rows, cols) = labeling.shape();
    let mask = Mask::from_fn(rows, cols, |r, c| match labeling.label_at(r, c) {
        0 => false,
        label => clusters[label - 1].retained,
    });

    log::debug!(
        "cluster filter: {} of {} clusters kept (min size {:.2})",
        clusters.iter().filter(|c| c.retained).count(),
        clusters.len(),
        threshold
    );

    FilteredMask {
        mask,
        clusters,
        min_size,
    }
}
