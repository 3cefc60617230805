//! Dependency resolution performance benchmarks
//!
//! Runs complete resolution passes over in-memory mirrors of different
//! shapes, then measures lock rendering and install ordering on the result.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tokio::runtime::Runtime;

use burrow_benchmarks::{cold_resolver, criterion_config, root_request, serve, synthetic_mirror, GraphShape};
use burrow_lockfile::Lock;

fn runtime() -> Runtime {
    match Runtime::new() {
        Ok(rt) => rt,
        Err(err) => panic!("failed to start benchmark runtime: {err}"),
    }
}

/// Cold resolution: every index page and archive goes through the fetcher
fn bench_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolution");
    group.sample_size(20);
    let rt = runtime();
    let request = root_request();

    let shapes = [
        ("chain", GraphShape::Chain),
        ("layered", GraphShape::Layered { fan_out: 4 }),
    ];

    for (label, shape) in shapes {
        for size in [10, 50, 200] {
            let fetcher = serve(&synthetic_mirror(size, 3, shape));
            group.throughput(Throughput::Elements(size as u64));

            group.bench_with_input(BenchmarkId::new(label, size), &size, |b, _| {
                b.iter(|| {
                    let resolver = cold_resolver(&fetcher, &request);
                    black_box(rt.block_on(resolver.resolve(&request)).map(|r| r.len()))
                });
            });
        }
    }

    group.finish();
}

/// Lock rendering, parsing and ordering for a resolved graph
fn bench_lock_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("lock");
    let rt = runtime();
    let request = root_request();

    for size in [50, 200] {
        let fetcher = serve(&synthetic_mirror(size, 1, GraphShape::Layered { fan_out: 4 }));
        let resolver = cold_resolver(&fetcher, &request);
        let Ok(resolution) = rt.block_on(resolver.resolve(&request)) else {
            continue;
        };
        let lock = resolution.to_lock();
        let Ok(text) = lock.to_toml_string() else {
            continue;
        };

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("render", size), &lock, |b, lock| {
            b.iter(|| black_box(lock.to_toml_string().ok()));
        });
        group.bench_with_input(BenchmarkId::new("parse", size), &text, |b, text| {
            b.iter(|| black_box(Lock::from_toml_str(text).ok()));
        });
        group.bench_with_input(BenchmarkId::new("install_order", size), &lock, |b, lock| {
            b.iter(|| black_box(lock.install_order().map(|order| order.len()).ok()));
        });
        group.bench_with_input(BenchmarkId::new("staleness", size), &lock, |b, lock| {
            b.iter(|| black_box(lock.is_stale(&request)));
        });
    }

    group.finish();
}

criterion_group! {
    name = benches;
    config = criterion_config();
    targets = bench_resolution, bench_lock_operations
}
criterion_main!(benches);
