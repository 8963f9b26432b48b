use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use evbus::EventBus;
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

fn benchmark_emit_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("emit_fan_out");

    for listeners in [1usize, 8, 64] {
        let bus = EventBus::new();
        let counter = Arc::new(AtomicU64::new(0));
        for _ in 0..listeners {
            let counter = counter.clone();
            bus.subscribe("tick", move |_| {
                counter.fetch_add(1, Ordering::Relaxed);
            });
        }

        group.throughput(Throughput::Elements(listeners as u64));
        group.bench_function(format!("{}_listeners", listeners), |b| {
            b.iter(|| bus.emit(black_box("tick"), json!({"price": 50000.5})));
        });
    }

    group.finish();
}

fn benchmark_emit_unhandled(c: &mut Criterion) {
    let bus = EventBus::new();
    bus.subscribe("other", |_| {});

    c.bench_function("emit_unhandled", |b| {
        b.iter(|| bus.emit(black_box("nobody"), json!(null)));
    });
}

fn benchmark_subscribe_unsubscribe(c: &mut Criterion) {
    let bus = EventBus::new();

    c.bench_function("subscribe_unsubscribe", |b| {
        b.iter(|| {
            let id = bus.subscribe("churn", |_| {});
            bus.unsubscribe(black_box("churn"), id)
        });
    });
}

criterion_group!(
    benches,
    benchmark_emit_fan_out,
    benchmark_emit_unhandled,
    benchmark_subscribe_unsubscribe
);
criterion_main!(benches);
