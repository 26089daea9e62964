//! Benchmarks for size allocation.
//!
//! Run with: cargo bench -p tabula-layout

use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use tabula_layout::SizeAllocator;
use tabula_layout::percentage::{Slot, resolve};

/// Allocator with every tenth position overridden.
fn sparse_overrides(n: usize) -> SizeAllocator {
    let mut alloc = SizeAllocator::new(20);
    for p in (0..n).step_by(10) {
        alloc.set_size(p, 35);
    }
    alloc
}

fn bench_aggregate_cold(c: &mut Criterion) {
    let mut group = c.benchmark_group("allocator/aggregate_cold");

    for n in [1_000usize, 10_000, 100_000] {
        group.bench_with_input(BenchmarkId::new("pixels", n), &n, |b, &n| {
            b.iter_batched(
                || sparse_overrides(n),
                |alloc| black_box(alloc.get_aggregate_size(n)),
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_aggregate_warm(c: &mut Criterion) {
    let mut group = c.benchmark_group("allocator/aggregate_warm");

    for n in [1_000usize, 100_000] {
        let alloc = sparse_overrides(n);
        let _ = alloc.get_aggregate_size(n);
        group.bench_with_input(BenchmarkId::new("lookup", n), &n, |b, &n| {
            b.iter(|| black_box(alloc.get_aggregate_size(black_box(n / 2))))
        });
    }

    group.finish();
}

fn bench_resize_then_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("allocator/resize_query");
    let n = 10_000usize;

    for at in [10usize, 5_000, 9_990] {
        group.bench_with_input(BenchmarkId::new("at", at), &at, |b, &at| {
            b.iter_batched(
                || {
                    let alloc = sparse_overrides(n);
                    let _ = alloc.get_aggregate_size(n);
                    alloc
                },
                |mut alloc| {
                    alloc.set_size(at, 50);
                    black_box(alloc.get_aggregate_size(n))
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_percentage_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("allocator/percentage_resolve");

    for n in [10usize, 100, 1_000] {
        let slots: Vec<Slot> = (0..n)
            .map(|i| match i % 4 {
                0 => Slot::Fixed(30),
                1 => Slot::Dynamic {
                    percentage: Some(1.0),
                    min: 0,
                },
                _ => Slot::Dynamic {
                    percentage: None,
                    min: 5,
                },
            })
            .collect();
        group.bench_with_input(BenchmarkId::new("slots", n), &slots, |b, slots| {
            b.iter(|| black_box(resolve(slots, 200_000)))
        });
    }

    group.finish();
}

fn bench_percentage_redistribute(c: &mut Criterion) {
    c.bench_function("allocator/percentage_redistribute", |b| {
        b.iter_batched(
            || {
                let mut alloc = SizeAllocator::new(100);
                alloc.set_percentage_sizing(true);
                alloc.calculate_percentages(10_000, 100);
                alloc
            },
            |mut alloc| {
                alloc.set_size(50, 180);
                black_box(alloc.get_aggregate_size(100))
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(
    benches,
    bench_aggregate_cold,
    bench_aggregate_warm,
    bench_resize_then_query,
    bench_percentage_resolve,
    bench_percentage_redistribute,
);

criterion_main!(benches);
