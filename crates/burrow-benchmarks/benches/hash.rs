//! Fingerprinting performance benchmarks
//!
//! Measures the `sha256:` archive fingerprints recorded in lock files and the
//! project content hash.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use burrow_benchmarks::{criterion_config, synthetic_project};
use burrow_cache::create_tarball;
use burrow_config::ProjectFile;
use burrow_core::utils::{fingerprint, verify_fingerprint};

fn create_test_content(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i * 31 % 251) as u8).collect()
}

fn bench_archive_fingerprint(c: &mut Criterion) {
    let mut group = c.benchmark_group("archive_fingerprint");

    for size in [1024, 102_400, 1_024_000, 10_240_000] {
        let content = create_test_content(size);
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_with_input(BenchmarkId::new("fingerprint", size), &content, |b, content| {
            b.iter(|| black_box(fingerprint(content)));
        });

        let expected = fingerprint(&content);
        group.bench_with_input(BenchmarkId::new("verify", size), &content, |b, content| {
            b.iter(|| black_box(verify_fingerprint("bench", content, &expected).is_ok()));
        });
    }

    group.finish();
}

fn bench_tarball_fingerprint(c: &mut Criterion) {
    let mut group = c.benchmark_group("tarball_fingerprint");

    for size in [10_240, 1_024_000] {
        let payload = create_test_content(size);
        let Ok(archive) = create_tarball(&[
            ("bench/DESCRIPTION", b"Package: bench\nVersion: 1.0\n".as_slice()),
            ("bench/R/code.R", payload.as_slice()),
        ]) else {
            continue;
        };
        group.throughput(Throughput::Bytes(archive.len() as u64));
        group.bench_with_input(BenchmarkId::new("gzipped", size), &archive, |b, archive| {
            b.iter(|| black_box(fingerprint(archive)));
        });
    }

    group.finish();
}

fn bench_content_hash(c: &mut Criterion) {
    let mut group = c.benchmark_group("content_hash");

    for deps in [10, 100, 500] {
        let Ok(project) = ProjectFile::parse(&synthetic_project(deps)) else {
            continue;
        };
        group.throughput(Throughput::Elements(deps as u64));
        group.bench_with_input(BenchmarkId::new("dependencies", deps), &project, |b, project| {
            b.iter(|| black_box(project.content_hash().ok()));
        });
    }

    group.finish();
}

criterion_group! {
    name = benches;
    config = criterion_config();
    targets = bench_archive_fingerprint, bench_tarball_fingerprint, bench_content_hash
}
criterion_main!(benches);
