//! Benchmarks for distance kernels.

use arbor_distance::{
    chebyshev_distance, cosine_distance, euclidean_distance, manhattan_distance,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn generate_vectors(dims: usize) -> (Vec<f64>, Vec<f64>) {
    let a: Vec<f64> = (0..dims).map(|i| (i as f64) * 0.1).collect();
    let b: Vec<f64> = (0..dims).map(|i| (i as f64) * 0.2 + 0.5).collect();
    (a, b)
}

fn bench_euclidean(c: &mut Criterion) {
    let mut group = c.benchmark_group("euclidean_distance");

    for dims in [8, 16, 32, 64, 128, 256].iter() {
        let (a, b) = generate_vectors(*dims);
        group.bench_with_input(BenchmarkId::from_parameter(dims), dims, |bencher, _| {
            bencher.iter(|| euclidean_distance(black_box(&a), black_box(&b)))
        });
    }

    group.finish();
}

fn bench_manhattan(c: &mut Criterion) {
    let mut group = c.benchmark_group("manhattan_distance");

    for dims in [8, 16, 32, 64, 128, 256].iter() {
        let (a, b) = generate_vectors(*dims);
        group.bench_with_input(BenchmarkId::from_parameter(dims), dims, |bencher, _| {
            bencher.iter(|| manhattan_distance(black_box(&a), black_box(&b)))
        });
    }

    group.finish();
}

fn bench_chebyshev(c: &mut Criterion) {
    let mut group = c.benchmark_group("chebyshev_distance");

    for dims in [8, 16, 32, 64, 128, 256].iter() {
        let (a, b) = generate_vectors(*dims);
        group.bench_with_input(BenchmarkId::from_parameter(dims), dims, |bencher, _| {
            bencher.iter(|| chebyshev_distance(black_box(&a), black_box(&b)))
        });
    }

    group.finish();
}

fn bench_cosine(c: &mut Criterion) {
    let mut group = c.benchmark_group("cosine_distance");

    for dims in [8, 16, 32, 64, 128, 256].iter() {
        let (a, b) = generate_vectors(*dims);
        group.bench_with_input(BenchmarkId::from_parameter(dims), dims, |bencher, _| {
            bencher.iter(|| cosine_distance(black_box(&a), black_box(&b)))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_euclidean,
    bench_manhattan,
    bench_chebyshev,
    bench_cosine
);
criterion_main!(benches);
