//! Benchmarks for Accumulator::push
//!
//! Measures lock + append, with an inline flush every `threshold` pushes.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use batch_accumulator::Accumulator;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn bench_push_single_thread(c: &mut Criterion) {
    let acc = Accumulator::new(1024, Duration::from_secs(3600), |batch: Vec<u64>| {
        black_box(batch);
    })
    .unwrap();

    let mut group = c.benchmark_group("accumulator");
    group.throughput(Throughput::Elements(1));
    group.bench_function("push", |b| {
        b.iter(|| acc.push(black_box(42)).unwrap())
    });
    group.finish();

    acc.close().unwrap();
}

fn bench_push_contended(c: &mut Criterion) {
    const THREADS: usize = 4;
    const PER_THREAD: u64 = 10_000;

    let mut group = c.benchmark_group("accumulator");
    group.throughput(Throughput::Elements(THREADS as u64 * PER_THREAD));
    group.sample_size(20);
    group.bench_function("push_4_threads", |b| {
        b.iter(|| {
            let acc = Arc::new(
                Accumulator::new(1024, Duration::from_millis(10), |batch: Vec<u64>| {
                    black_box(batch);
                })
                .unwrap(),
            );
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    let acc = Arc::clone(&acc);
                    thread::spawn(move || {
                        for i in 0..PER_THREAD {
                            acc.push(i).unwrap();
                        }
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }
            acc.close().unwrap();
        })
    });
    group.finish();
}

criterion_group!(benches, bench_push_single_thread, bench_push_contended);
criterion_main!(benches);
