//! Criterion micro-benchmarks for arena allocation and rollback.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use plume_arena::{Arena, ArenaConfig, ArenaScope, ArenaSet, Placement};

/// Benchmark: 1K small allocations followed by a rollback.
fn bench_allocate_1k(c: &mut Criterion) {
    let mut arena = Arena::open(64 * 1024, Placement::Any).unwrap();
    c.bench_function("arena_allocate_1k", |b| {
        b.iter(|| {
            for i in 0..1000usize {
                black_box(arena.allocate(8 + i % 24, false).unwrap());
            }
            arena.rollback();
        });
    });
}

/// Benchmark: zero-filled allocation of a 64 KiB block.
fn bench_allocate_zeroed_64k(c: &mut Criterion) {
    let mut arena = Arena::open(128 * 1024, Placement::Any).unwrap();
    c.bench_function("arena_allocate_zeroed_64k", |b| {
        b.iter(|| {
            black_box(arena.allocate(64 * 1024, true).unwrap());
            arena.rollback();
        });
    });
}

/// Benchmark: handle validation on read after many allocations.
fn bench_bytes_lookup(c: &mut Criterion) {
    let mut arena = Arena::open(64 * 1024, Placement::Any).unwrap();
    let handles: Vec<_> = (0..256).map(|_| arena.allocate(32, true).unwrap()).collect();
    c.bench_function("arena_bytes_lookup_256", |b| {
        b.iter(|| {
            let mut sum = 0usize;
            for h in &handles {
                sum += arena.bytes(*h).unwrap().len();
            }
            black_box(sum);
        });
    });
}

/// Benchmark: opening the default game/chapter/room arena set.
fn bench_open_set(c: &mut Criterion) {
    let config = ArenaConfig::default();
    c.bench_function("arena_set_open_default", |b| {
        b.iter(|| {
            let set = ArenaSet::open(&config).unwrap();
            black_box(set.get(ArenaScope::Room).size());
        });
    });
}

criterion_group!(
    benches,
    bench_allocate_1k,
    bench_allocate_zeroed_64k,
    bench_bytes_lookup,
    bench_open_set
);
criterion_main!(benches);
