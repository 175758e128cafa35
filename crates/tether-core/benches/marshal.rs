use std::rc::Rc;
use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tether_core::{Bridge, BridgeConfig, HostValue, Lifecycle, Matrix};
use tether_sdk::ForeignApi;
use tether_testing::SimRuntime;

fn setup() -> Bridge {
    let sim = Rc::new(SimRuntime::new());
    let echo = sim.function("echo", |rt, args| {
        rt.retain(args[0]);
        Some(args[0])
    });
    let count = sim.function("count", |rt, args| {
        let len = rt.items(args[0]).map_or(0, |items| items.len());
        rt.new_scalar(tether_core::Scalar::from_i128(tether_core::NumericKind::Int64, len as i128).ok()?)
    });
    sim.module("bench", vec![("echo", echo), ("count", count)]);
    Bridge::with_api(sim, Arc::new(Lifecycle::new()), BridgeConfig::default())
}

fn square(n: usize) -> HostValue {
    let data: Vec<f64> = (0..n * n).map(|i| i as f64).collect();
    HostValue::Matrix(Matrix::from_f64(n, n, &data).unwrap())
}

fn bench_matrix_round_trip(c: &mut Criterion) {
    let bridge = setup();
    let mut group = c.benchmark_group("matrix_round_trip");

    for n in [4usize, 32, 128] {
        let matrix = square(n);
        group.throughput(Throughput::Elements((n * n) as u64));
        group.bench_with_input(BenchmarkId::new("echo", n), &matrix, |b, m| {
            b.iter(|| bridge.invoke("bench", "echo", black_box(std::slice::from_ref(m))).unwrap());
        });
    }

    group.finish();
}

fn bench_unpack_only(c: &mut Criterion) {
    let bridge = setup();
    let mut group = c.benchmark_group("matrix_unpack");

    for n in [32usize, 128] {
        let matrix = square(n);
        group.throughput(Throughput::Elements((n * n) as u64));
        group.bench_with_input(BenchmarkId::new("count", n), &matrix, |b, m| {
            b.iter(|| bridge.invoke("bench", "count", black_box(std::slice::from_ref(m))).unwrap());
        });
    }

    group.finish();
}

fn bench_string_cell(c: &mut Criterion) {
    let bridge = setup();
    let cell = HostValue::Cell((0..256).map(|i| HostValue::from(format!("item-{}", i))).collect());

    c.bench_function("string_cell_round_trip", |b| {
        b.iter(|| bridge.invoke("bench", "echo", black_box(std::slice::from_ref(&cell))).unwrap());
    });
}

criterion_group!(benches, bench_matrix_round_trip, bench_unpack_only, bench_string_cell);
criterion_main!(benches);
