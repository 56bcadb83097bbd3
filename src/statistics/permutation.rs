//! Random repartitions of pooled trials.
//!
//! Every surrogate gets its own generator, seeded from the base seed and the
//! surrogate index through [`counter_rng_seed`]. Results therefore do not
//! depend on how surrogates are scheduled across threads.

use rand::seq::{index, SliceRandom};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

/// Counter-based RNG seed generation using SplitMix64.
///
/// Stateless hash of `(base_seed, counter)` giving well-distributed,
/// uncorrelated seeds for consecutive counters.
#[inline]
pub fn counter_rng_seed(base_seed: u64, counter: u64) -> u64 {
    // SplitMix64, see https://xoshiro.di.unimi.it/splitmix64.c
    let mut z = base_seed.wrapping_add(counter.wrapping_mul(0x9e3779b97f4a7c15));
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
    z ^ (z >> 31)
}

/// Generator for surrogate number `i` of a run seeded with `base_seed`.
pub fn surrogate_rng(base_seed: u64, i: usize) -> Xoshiro256PlusPlus {
    Xoshiro256PlusPlus::seed_from_u64(counter_rng_seed(base_seed, i as u64))
}

/// How a shuffled pool is split into surrogate groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrawBalance {
    /// Surrogate baseline gets `n_baseline` trials, surrogate condition the
    /// other `n_condition`. Every trial is used.
    KeepGroupSizes,
    /// Both surrogate groups get `min(n_baseline, n_condition)` trials; the
    /// excess of the larger group is left out of that draw.
    TruncateToSmaller,
}

impl DrawBalance {
    /// Surrogate `(baseline, condition)` group sizes for the given counts.
    pub fn group_sizes(self, n_baseline: usize, n_condition: usize) -> (usize, usize) {
        match self {
            DrawBalance::KeepGroupSizes => (n_baseline, n_condition),
            DrawBalance::TruncateToSmaller => {
                let k = n_baseline.min(n_condition);
                (k, k)
            }
        }
    }
}

/// Shuffle `order` (reset to `0..n_total`) and split it into surrogate
/// groups.
///
/// Returns `(baseline_indices, condition_indices)` as sub-slices of `order`.
pub fn draw_partition<'o, R: Rng>(
    rng: &mut R,
    n_baseline: usize,
    n_condition: usize,
    balance: DrawBalance,
    order: &'o mut Vec<usize>,
) -> (&'o [usize], &'o [usize]) {
    let n_total = n_baseline + n_condition;
    order.clear();
    order.extend(0..n_total);
    order.shuffle(rng);

    let (k_base, k_cond) = balance.group_sizes(n_baseline, n_condition);
    let (base, rest) = order.split_at(k_base);
    (base, &rest[..k_cond])
}

/// Draw a mixed set of `min(n_baseline, n_condition)` trials where every slot
/// comes from the baseline or the condition with equal probability.
///
/// Trials are drawn without replacement inside each group. Indices are
/// returned in pooled space (condition indices offset by `n_baseline`) and
/// written to `out`.
pub fn draw_mixed<R: Rng>(rng: &mut R, n_baseline: usize, n_condition: usize, out: &mut Vec<usize>) {
    let k = n_baseline.min(n_condition);
    let from_baseline = (0..k).filter(|_| rng.random_bool(0.5)).count();
    let from_condition = k - from_baseline;

    out.clear();
    out.extend(index::sample(rng, n_baseline, from_baseline).into_iter());
    out.extend(
        index::sample(rng, n_condition, from_condition)
            .into_iter()
            .map(|i| i + n_baseline),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_seeds_differ() {
        let a = counter_rng_seed(42, 0);
        let b = counter_rng_seed(42, 1);
        let c = counter_rng_seed(43, 0);
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, counter_rng_seed(42, 0));
    }

    #[test]
    fn test_partition_keeps_group_sizes() {
        let mut rng = surrogate_rng(7, 0);
        let mut order = Vec::new();
        let (base, cond) = draw_partition(&mut rng, 3, 5, DrawBalance::KeepGroupSizes, &mut order);
        assert_eq!(base.len(), 3);
        assert_eq!(cond.len(), 5);

        let mut all: Vec<usize> = base.iter().chain(cond).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn test_partition_truncates_to_smaller() {
        let mut rng = surrogate_rng(7, 1);
        let mut order = Vec::new();
        let (base, cond) = draw_partition(&mut rng, 4, 9, DrawBalance::TruncateToSmaller, &mut order);
        assert_eq!(base.len(), 4);
        assert_eq!(cond.len(), 4);
        assert!(base.iter().all(|i| !cond.contains(i)));
    }

    #[test]
    fn test_partition_is_reproducible() {
        let mut order_a = Vec::new();
        let mut order_b = Vec::new();
        let a = draw_partition(&mut surrogate_rng(99, 5), 10, 10, DrawBalance::KeepGroupSizes, &mut order_a);
        let a = a.0.to_vec();
        let b = draw_partition(&mut surrogate_rng(99, 5), 10, 10, DrawBalance::KeepGroupSizes, &mut order_b);
        assert_eq!(a, b.0);
    }

    #[test]
    fn test_mixed_draw_is_unique_and_in_range() {
        let mut rng = surrogate_rng(3, 0);
        let mut out = Vec::new();
        for _ in 0..50 {
            draw_mixed(&mut rng, 6, 4, &mut out);
            assert_eq!(out.len(), 4);
            let mut sorted = out.clone();
            sorted.sort_unstable();
            sorted.dedup();
            assert_eq!(sorted.len(), 4, "indices must not repeat");
            assert!(out.iter().all(|&i| i < 10));
        }
    }
}
