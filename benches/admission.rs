use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use flood_throttle::{Limiter, Update};
use std::sync::Arc;
use std::time::Duration;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap()
}

fn running_limiter(rt: &tokio::runtime::Runtime, max_count: usize) -> Limiter<Update> {
    let limiter = Limiter::builder()
        .with_window(Duration::from_secs(60))
        .with_punishment(Duration::from_secs(60))
        .with_max_count(max_count)
        .build()
        .unwrap();
    let _guard = rt.enter();
    limiter.start().unwrap();
    limiter
}

/// Benchmark single-threaded admission throughput
fn bench_single_threaded(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("single_threaded");
    group.throughput(Throughput::Elements(1000));

    group.bench_function("admitted", |b| {
        let limiter = running_limiter(&rt, usize::MAX);
        let update = Update::message(-1, 42).with_text("hello");

        b.iter(|| {
            for _ in 0..1000 {
                black_box(limiter.admit(black_box(&update)));
            }
        })
    });

    group.bench_function("already_limited", |b| {
        let limiter = running_limiter(&rt, 1);
        let update = Update::message(-1, 42).with_text("hello");

        b.iter(|| {
            for _ in 0..1000 {
                black_box(limiter.admit(black_box(&update)));
            }
        })
    });

    group.bench_function("pass_through_idle", |b| {
        let limiter: Limiter<Update> = Limiter::new();
        let update = Update::message(-1, 42).with_text("hello");

        b.iter(|| {
            for _ in 0..1000 {
                black_box(limiter.admit(black_box(&update)));
            }
        })
    });

    group.bench_function("with_predicates", |b| {
        let limiter = running_limiter(&rt, usize::MAX);
        limiter.add_condition(|u: &Update| u.chat.is_some());
        limiter.add_exception(|u: &Update| u.text.as_deref() == Some("/help"));
        limiter.add_exception_ids([1, 2, 3]);
        let update = Update::message(-1, 42).with_text("hello");

        b.iter(|| {
            for _ in 0..1000 {
                black_box(limiter.admit(black_box(&update)));
            }
        })
    });

    group.finish();
}

/// Benchmark identity diversity
fn bench_identity_diversity(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("identity_diversity");
    group.throughput(Throughput::Elements(1000));

    for num_identities in [1i64, 10, 1000] {
        group.bench_with_input(
            BenchmarkId::new("identities", num_identities),
            &num_identities,
            |b, &n| {
                let limiter = running_limiter(&rt, usize::MAX);
                let updates: Vec<_> = (0..n)
                    .map(|id| Update::message(-1, id).with_text("hello"))
                    .collect();

                b.iter(|| {
                    for i in 0..1000 {
                        let update = &updates[i % updates.len()];
                        black_box(limiter.admit(black_box(update)));
                    }
                })
            },
        );
    }

    group.finish();
}

/// Benchmark multi-threaded concurrent throughput
fn bench_concurrent(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("concurrent");

    for num_threads in [2, 4, 8] {
        group.throughput(Throughput::Elements(num_threads as u64 * 1000));

        group.bench_with_input(
            BenchmarkId::new("threads", num_threads),
            &num_threads,
            |b, &num_threads| {
                let limiter = Arc::new(running_limiter(&rt, usize::MAX));

                b.iter(|| {
                    let handles: Vec<_> = (0..num_threads)
                        .map(|i| {
                            let limiter = Arc::clone(&limiter);
                            std::thread::spawn(move || {
                                // Separate identities per thread
                                let update = Update::message(-1, i as i64).with_text("hi");
                                for _ in 0..1000 {
                                    black_box(limiter.admit(black_box(&update)));
                                }
                            })
                        })
                        .collect();

                    for handle in handles {
                        handle.join().unwrap();
                    }
                })
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_single_threaded,
    bench_identity_diversity,
    bench_concurrent
);
criterion_main!(benches);
