//! Performance benchmarks for the event bus.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use eventbus::{EventBus, ExecutionContext};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Benchmark synchronous post with varying observer fan-out
fn bench_post_fanout(c: &mut Criterion) {
    let mut group = c.benchmark_group("post_fanout");

    for observers in [1, 10, 100, 1000] {
        group.bench_with_input(
            BenchmarkId::new("observers", observers),
            &observers,
            |b, &count| {
                let bus = EventBus::new();
                let hits = Arc::new(AtomicUsize::new(0));
                let subscribers: Vec<_> = (0..count).map(|_| bus.subscriber()).collect();

                for target in &subscribers {
                    let hits = Arc::clone(&hits);
                    bus.subscribe(target, "tick", None, ExecutionContext::CallerThread, move |_| {
                        hits.fetch_add(1, Ordering::Relaxed);
                    })
                    .unwrap();
                }

                let payload = json!({"value": 42});
                b.iter(|| {
                    bus.post(black_box("tick"), None, Some(payload.clone()));
                });
            },
        );
    }

    group.finish();
}

/// Benchmark subscribe followed by unsubscribe_all
fn bench_subscribe_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("subscribe_churn");

    for per_subscriber in [1, 10, 50] {
        group.bench_with_input(
            BenchmarkId::new("subscriptions", per_subscriber),
            &per_subscriber,
            |b, &count| {
                let bus = EventBus::new();
                b.iter(|| {
                    let target = bus.subscriber();
                    for i in 0..count {
                        let name = if i % 2 == 0 { "even" } else { "odd" };
                        bus.subscribe(&target, name, None, ExecutionContext::CallerThread, |_| {})
                            .unwrap();
                    }
                    black_box(bus.release(target));
                });
            },
        );
    }

    group.finish();
}

/// Benchmark deferred posts drained by the main context
fn bench_deferred_drain(c: &mut Criterion) {
    let bus = EventBus::new();
    let target = bus.subscriber();
    bus.subscribe_main_thread(&target, "frame", None, |n| {
        black_box(n);
    })
    .unwrap();

    c.bench_function("deferred_drain_100", |b| {
        b.iter(|| {
            for _ in 0..100 {
                bus.post_deferred("frame", None, None);
            }
            black_box(bus.main_context().run_pending().unwrap());
        });
    });
}

criterion_group!(
    benches,
    bench_post_fanout,
    bench_subscribe_churn,
    bench_deferred_drain
);
criterion_main!(benches);
