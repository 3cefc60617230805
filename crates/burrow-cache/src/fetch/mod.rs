//! Deduplicating fetch cache.
//!
//! Callers for the same key serialize on a per-key async gate: the first one
//! through performs the fetch and stores the bytes, everyone after it finds
//! the stored entry. Fetches for different keys proceed in parallel, bounded
//! by a semaphore.

mod memory;

use async_trait::async_trait;
use burrow_core::error::{BoxedSource, BurrowError};
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, Semaphore};
use tracing::debug;

use crate::store::{CacheEntry, Store};
use crate::CacheResult;

pub use memory::MemoryFetcher;

/// Identity of a remote resource: source base URL plus relative path
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    pub source: String,
    pub path: String,
}

/// How long a stored entry stays valid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Reused until explicitly invalidated (package archives)
    Durable,
    /// Refetched once older than the given age (catalog index pages)
    Fresh(Duration),
}

/// Errors raised while fetching or storing a resource
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Resource not found: {url}")]
    NotFound { url: String },

    #[error("Failed to fetch {url}: {message}")]
    Failed {
        url: String,
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("Cache storage error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::NotFound { .. })
    }
}

impl From<FetchError> for BurrowError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::NotFound { url } => BurrowError::Network {
                message: format!("{url} was not found"),
                source: None,
            },
            FetchError::Failed { .. } => BurrowError::network(err.to_string(), err),
            FetchError::Io { message, source } => BurrowError::io(message, source),
        }
    }
}

/// Network seam used by the cache on a miss
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch the bytes behind a key; `NotFound` for a missing resource
    async fn fetch(&self, key: &CacheKey) -> Result<Vec<u8>, FetchError>;
}

/// Tuning knobs for a [`FetchCache`]
#[derive(Debug, Clone)]
pub struct FetchCacheConfig {
    /// Upper bound on concurrent network fetches
    pub max_concurrent_fetches: usize,
}

impl Default for FetchCacheConfig {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: 8,
        }
    }
}

/// Concurrency-safe cache in front of a [`Fetcher`]
pub struct FetchCache {
    fetcher: Arc<dyn Fetcher>,
    store: Option<Store>,
    memory: DashMap<CacheKey, Arc<[u8]>>,
    gates: DashMap<CacheKey, Arc<Mutex<()>>>,
    permits: Arc<Semaphore>,
}

impl CacheKey {
    pub fn new(source: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            path: path.into(),
        }
    }

    /// Full URL of the resource
    pub fn url(&self) -> String {
        format!(
            "{}/{}",
            self.source.trim_end_matches('/'),
            self.path.trim_start_matches('/')
        )
    }

    /// Stable digest naming the stored entry
    pub fn digest(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.source.as_bytes());
        hasher.update(&[0]);
        hasher.update(self.path.as_bytes());
        hasher.finalize().to_hex().to_string()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url())
    }
}

impl FetchCache {
    /// Cache backed by a durable on-disk store
    pub fn new(fetcher: Arc<dyn Fetcher>, store: Store, config: FetchCacheConfig) -> Self {
        Self::build(fetcher, Some(store), config)
    }

    /// Process-local cache with no durable store
    pub fn in_memory(fetcher: Arc<dyn Fetcher>, config: FetchCacheConfig) -> Self {
        Self::build(fetcher, None, config)
    }

    fn build(fetcher: Arc<dyn Fetcher>, store: Option<Store>, config: FetchCacheConfig) -> Self {
        Self {
            fetcher,
            store,
            memory: DashMap::new(),
            gates: DashMap::new(),
            permits: Arc::new(Semaphore::new(config.max_concurrent_fetches.max(1))),
        }
    }

    /// Get the bytes for a key, fetching at most once across concurrent callers
    pub async fn get(&self, key: &CacheKey, policy: CachePolicy) -> CacheResult<Arc<[u8]>> {
        if let Some(bytes) = self.lookup(key, policy)? {
            return Ok(bytes);
        }

        let gate = self.gates.entry(key.clone()).or_default().clone();
        let _guard = gate.lock().await;

        // Another caller may have filled the entry while we waited
        if let Some(bytes) = self.lookup(key, policy)? {
            return Ok(bytes);
        }

        debug!("fetching {}", key);
        let fetched = {
            let _permit = self.permits.acquire().await.map_err(|e| FetchError::Failed {
                url: key.url(),
                message: "fetch cache is shut down".to_string(),
                source: Some(Box::new(e)),
            })?;
            self.fetcher.fetch(key).await?
        };

        if let Some(store) = &self.store {
            store.put(key, &fetched)?;
        }
        let bytes: Arc<[u8]> = fetched.into();
        self.memory.insert(key.clone(), bytes.clone());
        Ok(bytes)
    }

    fn lookup(&self, key: &CacheKey, policy: CachePolicy) -> CacheResult<Option<Arc<[u8]>>> {
        if let Some(bytes) = self.memory.get(key) {
            return Ok(Some(bytes.clone()));
        }
        let Some(store) = &self.store else {
            return Ok(None);
        };
        match store.get(key, policy)? {
            Some(bytes) => {
                debug!("cache hit for {}", key);
                let bytes: Arc<[u8]> = bytes.into();
                self.memory.insert(key.clone(), bytes.clone());
                Ok(Some(bytes))
            },
            None => Ok(None),
        }
    }

    /// Drop a key so the next access fetches again
    pub fn invalidate(&self, key: &CacheKey) -> CacheResult<()> {
        self.memory.remove(key);
        if let Some(store) = &self.store {
            store.remove(&key.digest())?;
        }
        Ok(())
    }

    /// Entries held by the durable store
    pub fn list(&self) -> Vec<CacheEntry> {
        self.store.as_ref().map(Store::entries).unwrap_or_default()
    }

    /// Remove one stored entry by digest, returning the bytes freed
    pub fn remove(&self, digest: &str) -> CacheResult<Option<u64>> {
        self.memory.retain(|key, _| key.digest() != digest);
        match &self.store {
            Some(store) => store.remove(digest),
            None => Ok(None),
        }
    }

    /// Remove every entry, returning the bytes freed
    pub fn clear(&self) -> CacheResult<u64> {
        self.memory.clear();
        match &self.store {
            Some(store) => store.clear(),
            None => Ok(0),
        }
    }
}

impl fmt::Debug for FetchCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchCache")
            .field("store", &self.store)
            .field("in_memory", &self.memory.len())
            .finish()
    }
}
