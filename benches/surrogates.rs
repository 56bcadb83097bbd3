//! Benchmarks for the surrogate loop and the full cluster tests.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use permutation_cluster::analysis::{filter_clusters, ClusterSizeRule, SurrogateGenerator};
use permutation_cluster::{Connectivity, Mask, PermutationTest, TrialArray};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

fn gaussian(n_trials: usize, rows: usize, cols: usize, seed: u64) -> TrialArray {
    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::new(0.0, 1.0).unwrap();
    TrialArray::from_fn(n_trials, rows, cols, |_, _, _| normal.sample(&mut rng))
}

fn bench_surrogates(c: &mut Criterion) {
    let mut group = c.benchmark_group("surrogates");
    let baseline = gaussian(20, 1, 500, 1);
    let condition = gaussian(20, 1, 500, 2);

    for n_surr in [100usize, 1_000] {
        let generator = SurrogateGenerator::new(n_surr, 42);
        group.bench_with_input(BenchmarkId::new("signal_500", n_surr), &n_surr, |b, _| {
            b.iter(|| generator.generate(black_box(&baseline), black_box(&condition)))
        });
    }

    group.finish();
}

fn bench_tests(c: &mut Criterion) {
    let mut group = c.benchmark_group("tests");
    group.sample_size(10);

    let base_1d = gaussian(20, 1, 100, 3);
    let cond_1d = gaussian(20, 1, 100, 4);
    group.bench_function("test_1d", |b| {
        let test = PermutationTest::new().n_surr(200).seed(1);
        b.iter(|| test.test_1d(black_box(&base_1d), black_box(&cond_1d)))
    });

    let base_2d = gaussian(15, 20, 100, 5);
    let cond_2d = gaussian(15, 20, 100, 6);
    group.bench_function("test_2d", |b| {
        let test = PermutationTest::new().n_surr(200).seed(1);
        b.iter(|| test.test_2d(black_box(&base_2d), black_box(&cond_2d)))
    });

    group.finish();
}

fn bench_labeling(c: &mut Criterion) {
    // checkerboard-ish blocks, many small clusters
    let mask = Mask::from_fn(64, 256, |r, c| (r / 3 + c / 5) % 2 == 0 && (r * 7 + c) % 11 != 0);
    c.bench_function("filter_clusters_64x256", |b| {
        b.iter(|| {
            filter_clusters(
                black_box(&mask),
                ClusterSizeRule::Percentile(95.0),
                Connectivity::Eight,
            )
        })
    });
}

criterion_group!(benches, bench_surrogates, bench_tests, bench_labeling);
criterion_main!(benches);
