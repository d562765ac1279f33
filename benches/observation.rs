//! Performance benchmarks for observation-test-utils.
//!
//! Covers the hot paths a test suite exercises:
//! - Untracked and tracked reads
//! - Writes with and without armed observers
//! - Round-trip latency of a blocking wait satisfied from another thread

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use observation_test_utils::prelude::*;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

/// Benchmark untracked vs tracked reads
fn benchmark_reads(c: &mut Criterion) {
    let property = Observable::new(42u64);

    let mut group = c.benchmark_group("reads");
    group.bench_function("get", |b| {
        b.iter(|| {
            let value = property.get();
            black_box(*value);
        });
    });
    group.bench_function("tracked_scope", |b| {
        b.iter(|| {
            let (value, observation) = with_observation_tracking(|t| property.track(t), || {});
            black_box(*value);
            drop(observation);
        });
    });
    group.finish();
}

/// Benchmark writes with a varying number of armed observers
fn benchmark_writes(c: &mut Criterion) {
    let mut group = c.benchmark_group("writes");

    for observers in [0usize, 1, 8, 64] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_observers", observers)),
            &observers,
            |b, &observers| {
                let property = Observable::new(0u64);
                b.iter_custom(|iters| {
                    let mut total = Duration::ZERO;
                    for i in 0..iters {
                        let handles: Vec<_> =
                            (0..observers).map(|_| property.subscribe(|| {})).collect();

                        let start = Instant::now();
                        property.set(black_box(i));
                        total += start.elapsed();

                        drop(handles);
                    }
                    total
                });
            },
        );
    }

    group.finish();
}

/// Benchmark a blocking wait fulfilled by another thread
fn benchmark_wait_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("wait_round_trip");
    group.sample_size(20);

    group.bench_function("cross_thread", |b| {
        let property = Arc::new(Observable::new(0u64));

        b.iter_custom(|iters| {
            let mut total = Duration::ZERO;
            for i in 0..iters {
                let barrier = Arc::new(Barrier::new(2));
                let writer_property = Arc::clone(&property);
                let writer_barrier = Arc::clone(&barrier);

                let writer = thread::spawn(move || {
                    writer_barrier.wait();
                    // Spin until the waiter has registered
                    while writer_property.observer_count() == 0 {
                        std::hint::spin_loop();
                    }
                    writer_property.set(i);
                });

                let start = Instant::now();
                barrier.wait();
                wait_for_change(|p| &**p, &property, Duration::from_secs(5)).unwrap();
                total += start.elapsed();

                writer.join().unwrap();
            }
            total
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_reads,
    benchmark_writes,
    benchmark_wait_round_trip,
);
criterion_main!(benches);
