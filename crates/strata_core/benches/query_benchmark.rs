//! # Query Dispatch Benchmark
//!
//! One movement update over 1,000,000 entities, sequential against the
//! rayon strategy, and the per-cycle spawn/retire churn.
//!
//! Run with: `cargo bench --package strata_core --bench query_benchmark`

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use strata_core::query::{for_view, Parallel, Res, Sequential};
use strata_core::{DenseStorage, Entities, SparseStorage, StrataConfig};

/// Entities alive in every query benchmark.
const ENTITY_COUNT: u32 = 1_000_000;

struct Scene {
    position: SparseStorage<[f32; 3]>,
    velocity: DenseStorage<[f32; 3]>,
}

fn scene(velocity_every: u32) -> Scene {
    let mut position = SparseStorage::new();
    let mut velocity = DenseStorage::new();
    position.batch_create(0, ENTITY_COUNT, [0.0; 3]);
    for id in (0..ENTITY_COUNT).step_by(velocity_every as usize) {
        velocity.create(id, [1.0, 0.5, 0.25]);
    }
    Scene { position, velocity }
}

fn integrate(p: &mut [f32; 3], v: &[f32; 3], dt: f32) {
    for (p, v) in p.iter_mut().zip(v) {
        *p += v * dt;
    }
}

/// Benchmark: movement update, sequential vs parallel, by velocity density.
fn bench_movement(c: &mut Criterion) {
    let mut group = c.benchmark_group("movement");
    let dt = 1.0f32 / 60.0;

    for every in [1u32, 16] {
        let mut scene = scene(every);

        group.bench_with_input(BenchmarkId::new("sequential", every), &every, |b, _| {
            b.iter(|| {
                let query = (scene.position.write(), &scene.velocity, Res(&dt));
                for_view(&Sequential, query, |(p, v, dt)| integrate(p, v, *dt))
            });
        });

        let parallel = Parallel::with_config(&StrataConfig::bulk());
        group.bench_with_input(BenchmarkId::new("parallel", every), &every, |b, _| {
            b.iter(|| {
                let query = (scene.position.write(), &scene.velocity, Res(&dt));
                for_view(&parallel, query, |(p, v, dt)| integrate(p, v, *dt))
            });
        });
    }

    group.finish();
}

/// Benchmark: spawn a batch, kill all of it, retire.
fn bench_entity_cycle(c: &mut Criterion) {
    c.bench_function("entity_cycle_10k", |b| {
        let mut entities = Entities::with_config(&StrataConfig::bulk());
        b.iter(|| {
            if let Ok(range) = entities.batch_create(10_000) {
                for id in range {
                    entities.kill(entities.get(id));
                }
            }
            entities.die();
            black_box(entities.free_count())
        });
    });
}

criterion_group!(benches, bench_movement, bench_entity_cycle);
criterion_main!(benches);
