//! # Hierarchical Bit Vector Benchmark
//!
//! Point and range writes, plus traversal of sparse and dense sets over
//! the full 2^24 id space.
//!
//! Run with: `cargo bench --package strata_core --bench hbv_benchmark`

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use strata_core::bits::{self, and, Hbv, MAX_BITS};

/// Ids touched per point benchmark iteration.
const POINT_OPS: u32 = 100_000;

fn random_ids(count: u32, seed: u64) -> Vec<u32> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count).map(|_| rng.gen_range(0..MAX_BITS)).collect()
}

/// Benchmark: random single-bit set then test.
fn bench_point_ops(c: &mut Criterion) {
    let ids = random_ids(POINT_OPS, 1);
    let mut vec = Hbv::with_capacity(MAX_BITS, false);

    c.bench_function("set_100k_random", |b| {
        b.iter(|| {
            for id in &ids {
                vec.set(*id, true);
            }
            for id in &ids {
                vec.set(*id, false);
            }
        });
    });

    for id in &ids {
        vec.set(*id, true);
    }
    c.bench_function("test_100k_random", |b| {
        b.iter(|| ids.iter().filter(|id| vec.test(**id)).count());
    });
}

/// Benchmark: range fill and clear across block boundaries.
fn bench_range_set(c: &mut Criterion) {
    let mut group = c.benchmark_group("range_set");

    for len in [64u32, 4096, 262_144, 4_000_000] {
        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |b, &len| {
            let mut vec = Hbv::with_capacity(MAX_BITS, false);
            b.iter(|| {
                vec.range_set(black_box(1000), 1000 + len, true);
                vec.range_set(black_box(1000), 1000 + len, false);
            });
        });
    }

    group.finish();
}

/// Benchmark: ascending traversal, sparse vs dense.
fn bench_for_each(c: &mut Criterion) {
    let mut group = c.benchmark_group("for_each");

    let mut sparse = Hbv::with_capacity(MAX_BITS, false);
    for id in random_ids(10_000, 2) {
        sparse.set(id, true);
    }
    let mut dense = Hbv::with_capacity(MAX_BITS, false);
    dense.range_set(0, 1_000_000, true);

    group.bench_function("sparse_10k_of_16M", |b| {
        b.iter(|| {
            let mut sum = 0u64;
            bits::for_each(&sparse, |id| sum += u64::from(id));
            black_box(sum)
        });
    });
    group.bench_function("dense_1M", |b| {
        b.iter(|| {
            let mut sum = 0u64;
            bits::for_each(&dense, |id| sum += u64::from(id));
            black_box(sum)
        });
    });
    group.bench_function("and_sparse_dense", |b| {
        b.iter(|| black_box(bits::count(&and((&sparse, &dense)))));
    });

    group.finish();
}

criterion_group!(benches, bench_point_ops, bench_range_set, bench_for_each);
criterion_main!(benches);
