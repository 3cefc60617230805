//! Common utilities for benchmarks

use std::sync::Arc;

use burrow_cache::{FetchCache, FetchCacheConfig, MemoryFetcher};
use burrow_core::types::{Constraint, RootDependency, RootRequest, SourceSpec};
use burrow_registry::{MirrorBuilder, Pool, PoolConfig};
use burrow_resolver::Resolver;
use criterion::Criterion;
use pprof::criterion::{Output, PProfProfiler};

pub const MIRROR_URL: &str = "https://cran.bench.example";

/// Configure criterion with flamegraph profiling support
pub fn criterion_config() -> Criterion {
    Criterion::default()
        .warm_up_time(std::time::Duration::from_secs(3))
        .measurement_time(std::time::Duration::from_secs(10))
        .sample_size(50)
        .with_profiler(PProfProfiler::new(100, Output::Flamegraph(None)))
}

/// Package name used for the `index`-th synthetic package
pub fn package_name(index: usize) -> String {
    format!("pkg{index}")
}

/// Shape of a synthetic package graph
#[derive(Debug, Clone, Copy)]
pub enum GraphShape {
    /// Each package imports the next one
    Chain,
    /// Each package imports up to `fan_out` later packages, so names are
    /// requested many times
    Layered { fan_out: usize },
}

/// Mirror serving `size` packages, each with `versions` published versions
pub fn synthetic_mirror(size: usize, versions: usize, shape: GraphShape) -> MirrorBuilder {
    let mut mirror = MirrorBuilder::new(MIRROR_URL);
    for index in 0..size {
        let imports: Vec<String> = match shape {
            GraphShape::Chain => (index + 1..size.min(index + 2)).map(package_name).collect(),
            GraphShape::Layered { fan_out } => (index + 1..size.min(index + 1 + fan_out))
                .map(|dep| format!("{} (>= 1.0)", package_name(dep)))
                .collect(),
        };
        let fields = if imports.is_empty() {
            String::new()
        } else {
            format!("Imports: {}", imports.join(", "))
        };
        for minor in 0..versions.max(1) {
            mirror = mirror.package(&package_name(index), &format!("1.{minor}"), &fields);
        }
    }
    mirror
}

/// Fetcher serving `mirror`, shared across iterations
pub fn serve(mirror: &MirrorBuilder) -> Arc<MemoryFetcher> {
    let fetcher = Arc::new(MemoryFetcher::new());
    if let Err(err) = mirror.install(&fetcher) {
        panic!("failed to install benchmark mirror: {err}");
    }
    fetcher
}

/// Request for the first package of a synthetic mirror
pub fn root_request() -> RootRequest {
    RootRequest::new(
        vec![SourceSpec::new("bench", MIRROR_URL)],
        vec![RootDependency::registry(package_name(0), Constraint::any())],
    )
}

/// Resolver over a fresh in-memory cache, so every pass starts cold
pub fn cold_resolver(fetcher: &Arc<MemoryFetcher>, request: &RootRequest) -> Resolver {
    let cache = FetchCache::in_memory(fetcher.clone(), FetchCacheConfig::default());
    let pool = Pool::new(request.sources.clone(), Arc::new(cache), PoolConfig::default());
    Resolver::new(Arc::new(pool))
}

/// Descriptor record with `deps` imports
pub fn synthetic_descriptor(deps: usize) -> String {
    let imports: Vec<String> = (0..deps)
        .map(|i| format!("{} (>= 1.{})", package_name(i), i % 10))
        .collect();
    format!(
        "Package: bench\nVersion: 1.2-3\nTitle: Benchmark Package\nDepends: R (>= 4.0)\n\
         Imports: {}\nSuggests: knitr, rmarkdown\nDescription: A package used to\n    measure the parser.\n",
        imports.join(",\n    ")
    )
}

/// `burrow.toml` with `deps` registry dependencies
pub fn synthetic_project(deps: usize) -> String {
    let mut content = String::from(
        "[project]\nname = \"bench\"\n\n[[source]]\nname = \"bench\"\nurl = \"https://cran.bench.example/\"\n\n[dependencies]\n",
    );
    for i in 0..deps {
        content.push_str(&format!("{} = \">= 1.{}, < 3\"\n", package_name(i), i % 10));
    }
    content
}
