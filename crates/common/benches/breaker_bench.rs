//! Circuit breaker benchmarks
//!
//! Every cache call takes the breaker lock at least twice (admission and
//! outcome), so these paths sit on the hot path of every cache read.
//!
//! Run with: `cargo bench --bench breaker_bench -p cacheward-common
//! --features runtime`

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cacheward_common::resilience::{BreakerConfig, CacheCircuitBreaker, MockClock};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

// ============================================================================
// Single-threaded paths
// ============================================================================

fn bench_breaker_paths(c: &mut Criterion) {
    let mut group = c.benchmark_group("breaker_paths");

    group.bench_function("closed_allow_and_success", |b| {
        let breaker = CacheCircuitBreaker::with_defaults();
        b.iter(|| {
            black_box(breaker.allow_request());
            breaker.record_success();
        });
    });

    group.bench_function("fail_to_open", |b| {
        b.iter(|| {
            let breaker = BreakerConfig::new()
                .failure_threshold(3)
                .retry_timeout(Duration::from_secs(30))
                .clock(MockClock::new())
                .build()
                .expect("valid breaker config for benchmarks");
            for _ in 0..3 {
                breaker.record_failure();
            }
            black_box(breaker.state());
        });
    });

    group.bench_function("open_rejection", |b| {
        let breaker = CacheCircuitBreaker::with_defaults();
        breaker.force_open();
        b.iter(|| black_box(breaker.allow_request()));
    });

    group.bench_function("metrics_snapshot", |b| {
        let breaker = CacheCircuitBreaker::with_defaults();
        b.iter(|| black_box(breaker.metrics()));
    });

    group.finish();
}

// ============================================================================
// Contention
// ============================================================================

fn bench_breaker_contention(c: &mut Criterion) {
    let mut group = c.benchmark_group("breaker_contention");

    for threads in [2usize, 4, 8] {
        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |b, &threads| {
            let breaker = Arc::new(CacheCircuitBreaker::with_defaults());
            b.iter(|| {
                let handles: Vec<_> = (0..threads)
                    .map(|_| {
                        let breaker = Arc::clone(&breaker);
                        thread::spawn(move || {
                            for _ in 0..100 {
                                if breaker.allow_request() {
                                    breaker.record_success();
                                }
                            }
                        })
                    })
                    .collect();
                for handle in handles {
                    handle.join().expect("benchmark thread panicked");
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_breaker_paths, bench_breaker_contention);
criterion_main!(benches);
