//! JSON index of stored entries.

use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::sync::Mutex;
use std::time::Duration;
use tracing::warn;

use crate::fetch::{CacheKey, FetchError};
use crate::CacheResult;

/// Metadata for a stored entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Digest of the key, also the file name on disk
    pub digest: String,
    /// Source base URL
    pub source: String,
    /// Path relative to the source
    pub path: String,
    /// Size in bytes
    pub size: u64,
    /// When the entry was stored (as timestamp)
    pub stored_at: i64,
}

impl CacheEntry {
    pub fn new(key: &CacheKey, digest: String, size: u64) -> Self {
        Self {
            digest,
            source: key.source.clone(),
            path: key.path.clone(),
            size,
            stored_at: Utc::now().timestamp(),
        }
    }

    /// Get age of entry in seconds
    pub fn age_seconds(&self) -> i64 {
        Utc::now().timestamp() - self.stored_at
    }

    /// Check if the entry is younger than `max_age`
    pub fn is_fresh(&self, max_age: Duration) -> bool {
        let age = self.age_seconds();
        age >= 0 && (age as u64) < max_age.as_secs()
    }

    /// Get stored_at as DateTime
    pub fn stored_at_datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.stored_at, 0).unwrap_or_else(Utc::now)
    }
}

/// Index for managing stored entries
#[derive(Debug)]
pub struct StoreIndex {
    entries: DashMap<String, CacheEntry>,
    index_path: Utf8PathBuf,
    /// Serializes snapshots so the last save always reflects the latest state
    save_lock: Mutex<()>,
}

impl StoreIndex {
    /// Load existing index or create new one
    pub fn load_or_create(index_path: Utf8PathBuf) -> CacheResult<Self> {
        let entries = DashMap::new();

        if index_path.exists() {
            let content = fs::read_to_string(&index_path)
                .map_err(|e| FetchError::io(format!("Failed to read {index_path}"), e))?;
            match serde_json::from_str::<Vec<CacheEntry>>(&content) {
                Ok(loaded) => {
                    for entry in loaded {
                        entries.insert(entry.digest.clone(), entry);
                    }
                },
                // An unreadable index only costs refetches
                Err(e) => warn!("ignoring corrupt cache index {}: {}", index_path, e),
            }
        }

        Ok(Self {
            entries,
            index_path,
            save_lock: Mutex::new(()),
        })
    }

    pub fn insert(&self, entry: CacheEntry) {
        self.entries.insert(entry.digest.clone(), entry);
    }

    pub fn get(&self, digest: &str) -> Option<CacheEntry> {
        self.entries.get(digest).map(|entry| entry.clone())
    }

    pub fn remove(&self, digest: &str) -> Option<CacheEntry> {
        self.entries.remove(digest).map(|(_, entry)| entry)
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Snapshot of all entries, ordered by digest
    pub fn entries(&self) -> Vec<CacheEntry> {
        let mut entries: Vec<CacheEntry> = self
            .entries
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        entries.sort_by(|a, b| a.digest.cmp(&b.digest));
        entries
    }

    /// Save index to disk atomically
    pub fn save(&self) -> CacheResult<()> {
        let _guard = self
            .save_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let content = serde_json::to_string_pretty(&self.entries()).map_err(|e| {
            FetchError::io(
                "Failed to serialize cache index",
                std::io::Error::new(std::io::ErrorKind::Other, e),
            )
        })?;

        let dir = match self.index_path.parent() {
            Some(parent) => parent.to_path_buf(),
            None => Utf8PathBuf::from("."),
        };
        super::write_atomic(&dir, &self.index_path, content.as_bytes())
    }
}
