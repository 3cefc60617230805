//! In-memory fetcher for offline mirrors, tests and benchmarks.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::{CacheKey, FetchError, Fetcher};

/// Serves resources from memory and counts every fetch it performs
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    resources: DashMap<CacheKey, Vec<u8>>,
    calls: DashMap<CacheKey, usize>,
    total_calls: AtomicUsize,
    /// Remaining injected failures per key
    failures: DashMap<CacheKey, usize>,
    latency: Option<Duration>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every fetch, widening the window for concurrent callers
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Serve `bytes` for `(source, path)`
    pub fn insert(&self, source: &str, path: &str, bytes: impl Into<Vec<u8>>) {
        self.resources
            .insert(CacheKey::new(source, path), bytes.into());
    }

    /// Fail the next `times` fetches of a key
    pub fn fail_next(&self, key: &CacheKey, times: usize) {
        self.failures.insert(key.clone(), times);
    }

    /// Number of fetches performed for a key
    pub fn calls_for(&self, key: &CacheKey) -> usize {
        self.calls.get(key).map_or(0, |count| *count)
    }

    /// Number of fetches performed overall
    pub fn total_calls(&self) -> usize {
        self.total_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for MemoryFetcher {
    async fn fetch(&self, key: &CacheKey) -> Result<Vec<u8>, FetchError> {
        self.total_calls.fetch_add(1, Ordering::SeqCst);
        *self.calls.entry(key.clone()).or_insert(0) += 1;

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if let Some(mut remaining) = self.failures.get_mut(key) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(FetchError::Failed {
                    url: key.url(),
                    message: "injected failure".to_string(),
                    source: None,
                });
            }
        }

        self.resources
            .get(key)
            .map(|bytes| bytes.clone())
            .ok_or_else(|| FetchError::NotFound { url: key.url() })
    }
}
