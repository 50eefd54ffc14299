use core::hint::black_box;
use core::num::NonZeroUsize;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use snowmint::{DEFAULT_EPOCH, IdWorker, Issuer, RetryBudget, SystemClock, TimeSource};
use std::{
    sync::{Arc, Barrier},
    thread::scope,
    time::Instant,
};

struct FixedMockTime {
    millis: u64,
}

impl TimeSource for FixedMockTime {
    fn current_millis(&self) -> u64 {
        self.millis
    }
}

// One full millisecond worth of sequence space.
const TOTAL_IDS: usize = 4096;

/// Hot path: the clock never moves, so every mint after the first only bumps
/// the sequence.
fn bench_mint_fixed_clock(c: &mut Criterion) {
    let mut group = c.benchmark_group("mint/fixed_clock");
    group.throughput(Throughput::Elements(TOTAL_IDS as u64));

    group.bench_function(format!("elems/{TOTAL_IDS}"), |b| {
        b.iter_custom(|iters| {
            let start = Instant::now();
            for _ in 0..iters {
                let worker = IdWorker::new(
                    1,
                    1,
                    DEFAULT_EPOCH,
                    FixedMockTime {
                        millis: DEFAULT_EPOCH.as_millis() as u64 + 1,
                    },
                )
                .unwrap();
                for _ in 0..TOTAL_IDS {
                    black_box(worker.mint().unwrap());
                }
            }
            start.elapsed()
        });
    });

    group.finish();
}

/// Realistic path: wall clock, spinning whenever a millisecond fills up.
fn bench_mint_system_clock(c: &mut Criterion) {
    let mut group = c.benchmark_group("mint/system_clock");
    group.throughput(Throughput::Elements(TOTAL_IDS as u64));

    let worker = IdWorker::new(1, 1, DEFAULT_EPOCH, SystemClock).unwrap();
    group.bench_function(format!("elems/{TOTAL_IDS}"), |b| {
        b.iter(|| {
            for _ in 0..TOTAL_IDS {
                loop {
                    match worker.mint() {
                        Ok(id) => {
                            black_box(id);
                            break;
                        }
                        Err(_) => core::hint::spin_loop(),
                    }
                }
            }
        });
    });

    group.finish();
}

fn bench_issue_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("issuer/batch");

    for size in [10usize, 100, 1_000] {
        group.throughput(Throughput::Elements(size as u64));
        let worker = IdWorker::new(1, 1, DEFAULT_EPOCH, SystemClock).unwrap();
        // A generous budget keeps sequence exhaustion from failing the bench.
        let issuer = Issuer::new(worker, RetryBudget::new(1_000_000));
        let count = NonZeroUsize::new(size).unwrap();

        group.bench_function(format!("elems/{size}"), |b| {
            b.iter(|| black_box(issuer.issue_batch(count, None).unwrap()));
        });
    }

    group.finish();
}

/// Contended path: several threads share one worker.
fn bench_mint_contended(c: &mut Criterion) {
    const THREADS: usize = 4;

    let mut group = c.benchmark_group("mint/contended");
    group.throughput(Throughput::Elements((TOTAL_IDS * THREADS) as u64));

    group.bench_function(format!("threads/{THREADS}"), |b| {
        b.iter_custom(|iters| {
            let worker = Arc::new(IdWorker::new(1, 1, DEFAULT_EPOCH, SystemClock).unwrap());
            let barrier = Arc::new(Barrier::new(THREADS + 1));

            let start = scope(|s| {
                for _ in 0..THREADS {
                    let worker = Arc::clone(&worker);
                    let barrier = Arc::clone(&barrier);
                    s.spawn(move || {
                        barrier.wait();
                        for _ in 0..iters as usize * TOTAL_IDS {
                            while worker.mint().is_err() {
                                core::hint::spin_loop();
                            }
                        }
                    });
                }
                barrier.wait();
                Instant::now()
            });

            start.elapsed()
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_mint_fixed_clock,
    bench_mint_system_clock,
    bench_issue_batch,
    bench_mint_contended
);
criterion_main!(benches);
