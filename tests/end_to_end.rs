//! End-to-end scenarios on synthetic data with a known effect.

use permutation_cluster::{
    GroupedStatistic, PermutationTest, SurrogateStatistic, ThresholdAggregation, TrialArray,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

fn gaussian_trials<F>(n_trials: usize, rows: usize, cols: usize, seed: u64, effect: F) -> TrialArray
where
    F: Fn(usize, usize) -> f64,
{
    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::new(0.0, 1.0).unwrap();
    TrialArray::from_fn(n_trials, rows, cols, |_, r, c| normal.sample(&mut rng) + effect(r, c))
}

/// 20 trials × 100 samples, +3 on samples 40..=60 in the condition.
#[test]
fn signal_effect_is_recovered() {
    let baseline = gaussian_trials(20, 1, 100, 11, |_, _| 0.0);
    let condition = gaussian_trials(20, 1, 100, 12, |_, c| {
        if (40..=60).contains(&c) {
            3.0
        } else {
            0.0
        }
    });

    let outcome = PermutationTest::new()
        .n_surr(200)
        .seed(7)
        .grouped(GroupedStatistic::Mean)
        .surrogate_statistic(SurrogateStatistic::MinMax)
        .size_thresh_alpha(0.05)
        .test_1d(&baseline, &condition)
        .unwrap();

    let mask = outcome.mask.row(0);
    let inside = (40..=60).filter(|&c| mask[c]).count();
    let outside_idx: Vec<usize> = (0..100).filter(|c| !(35..65).contains(c)).collect();
    let outside = outside_idx.iter().filter(|&&c| mask[c]).count();

    assert!(inside >= 15, "only {} of 21 effect samples detected", inside);
    assert!(
        (outside as f64) / (outside_idx.len() as f64) < 0.10,
        "{} false positives outside the effect",
        outside
    );
    approx::assert_abs_diff_eq!(outcome.min_cluster_size.unwrap(), 5.0, epsilon = 1e-9);
    assert!(outcome.retained_clusters().all(|c| c.size >= 5));
    assert!(outcome.thresholds.is_global());
}

/// 15 trials of 5 × 50 maps, +4 on rows 2–3, times 20..=30 in the condition.
#[test]
fn time_frequency_cluster_is_recovered() {
    let in_region = |r: usize, c: usize| (2..=3).contains(&r) && (20..=30).contains(&c);
    let baseline = gaussian_trials(15, 5, 50, 21, |_, _| 0.0);
    let condition = gaussian_trials(15, 5, 50, 22, |r, c| if in_region(r, c) { 4.0 } else { 0.0 });

    let outcome = PermutationTest::new()
        .n_surr(200)
        .seed(3)
        .test_2d(&baseline, &condition)
        .unwrap();

    assert_eq!(outcome.thresholds.len(), 5);
    for r in 2..=3 {
        for c in 20..=30 {
            assert!(outcome.mask.get(r, c), "cell ({}, {}) missing from the cluster", r, c);
        }
    }

    let retained: Vec<_> = outcome.retained_clusters().collect();
    assert_eq!(retained.len(), 1, "expected one cluster, got {:?}", retained);
    assert!(retained[0].size >= 22);

    let stray = (0..5)
        .flat_map(|r| (0..50).map(move |c| (r, c)))
        .filter(|&(r, c)| !in_region(r, c) && outcome.mask.get(r, c))
        .count();
    assert!(stray <= 10, "{} cells attached outside the effect region", stray);
}

#[test]
fn per_condition_masks_separate_groups() {
    let in_region = |r: usize, c: usize| (2..=3).contains(&r) && (20..=30).contains(&c);
    let baseline = gaussian_trials(15, 5, 50, 31, |_, _| 0.0);
    let condition = gaussian_trials(15, 5, 50, 32, |r, c| if in_region(r, c) { 4.0 } else { 0.0 });

    let masks = PermutationTest::new()
        .n_surr(200)
        .seed(5)
        .test_2d_per_condition(&baseline, &condition)
        .unwrap();

    let mut baseline_hits = 0;
    for r in 2..=3 {
        for c in 20..=30 {
            assert!(masks.condition.mask.get(r, c), "condition cell ({}, {}) missing", r, c);
            if masks.baseline.mask.get(r, c) {
                baseline_hits += 1;
            }
        }
    }
    assert!(baseline_hits <= 3, "{} baseline cells flagged in the effect region", baseline_hits);
    assert_eq!(masks.metadata.shape, (5, 50));
}

#[test]
fn scalar_shift_is_significant() {
    let mut rng = StdRng::seed_from_u64(99);
    let normal = Normal::new(0.0, 1.0).unwrap();
    let baseline: Vec<f64> = (0..30).map(|_| normal.sample(&mut rng)).collect();
    let condition: Vec<f64> = (0..30).map(|_| normal.sample(&mut rng) + 2.0).collect();

    let verdict = PermutationTest::new()
        .n_surr(500)
        .seed(1)
        .test_global(&baseline, &condition)
        .unwrap();

    assert!(verdict.significant);
    assert!(verdict.observed > verdict.upper);
    assert!(verdict.lower < 0.0 && verdict.upper > 0.0);
}

#[test]
fn median_modes_also_recover_signal_effect() {
    let baseline = gaussian_trials(20, 1, 100, 41, |_, _| 0.0);
    let condition = gaussian_trials(20, 1, 100, 42, |_, c| if (40..=60).contains(&c) { 3.0 } else { 0.0 });

    let outcome = PermutationTest::new()
        .n_surr(200)
        .seed(8)
        .grouped(GroupedStatistic::Median)
        .threshold(ThresholdAggregation::Median)
        .test_1d(&baseline, &condition)
        .unwrap();

    let mask = outcome.mask.row(0);
    assert!((40..=60).filter(|&c| mask[c]).count() >= 15);
}
