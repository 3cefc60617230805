//! Fetch cache and artifact store for Burrow
//!
//! This crate sits between the package pool and the network. Every remote
//! resource is addressed by a `(source, path)` key; the [`FetchCache`]
//! guarantees at most one in-flight fetch per key, keeps successful results
//! in a durable on-disk [`Store`], and never records failures. It also
//! knows how to read package descriptors out of gzipped tarballs.

pub mod fetch;
pub mod store;
pub mod tarball;

// Re-export main types
pub use fetch::{
    CacheKey, CachePolicy, FetchCache, FetchCacheConfig, FetchError, Fetcher, MemoryFetcher,
};
pub use store::{CacheEntry, Store, StoreIndex};
pub use tarball::{create_tarball, extract_descriptor, DESCRIPTOR_FILE};

/// Result type for cache operations
pub type CacheResult<T> = Result<T, FetchError>;
