//! Package sources and the prioritized pool for Burrow
//!
//! This crate turns a list of declared sources into the candidate versions
//! the resolver chooses from. Each source is a CRAN-style repository whose
//! index pages are scanned for package tarballs; the [`Pool`] groups every
//! source's offers into priority tiers and answers selection queries.

pub mod client;
pub mod listing;
pub mod mirror;
pub mod pool;
pub mod source;

// Re-export main types
pub use client::{ClientConfig, HttpFetcher, RetryConfig};
pub use listing::{parse_listing, Listing};
pub use mirror::MirrorBuilder;
pub use pool::{Candidate, Pool, PoolConfig, PoolError, Selection, Tier};
pub use source::{ArchiveFile, ArchiveLayout, Catalog, FlatLayout, SegregatedLayout};

// Source types are shared with the lock model and live in the core crate
pub use burrow_core::types::{LayoutKind, ProxySetting, SourceSpec};

use burrow_core::error::BurrowError;

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, BurrowError>;
