//! Durable on-disk store for fetched resources.
//!
//! Entries live under `<root>/store/<digest[0..2]>/<digest>` where the
//! digest names a `(source, path)` key. Every write goes through a temporary
//! file in the destination directory followed by a rename, so readers never
//! observe a partial entry.

mod index;

use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::io::Write;
use tracing::warn;

use crate::fetch::{CacheKey, CachePolicy, FetchError};
use crate::CacheResult;

pub use index::{CacheEntry, StoreIndex};

/// Durable store of fetched bytes
#[derive(Debug)]
pub struct Store {
    /// Root directory of the cache (~/.burrow/cache)
    root_path: Utf8PathBuf,
    index: StoreIndex,
}

impl Store {
    /// Open the store at `root_path`, creating it if needed
    pub fn open<P: AsRef<Utf8Path>>(root_path: P) -> CacheResult<Self> {
        let root_path = root_path.as_ref().to_path_buf();
        fs::create_dir_all(root_path.join("store"))
            .map_err(|e| FetchError::io(format!("Failed to create cache directory {root_path}"), e))?;

        let index = StoreIndex::load_or_create(root_path.join("index.json"))?;
        Ok(Self { root_path, index })
    }

    /// Get the root path of the store
    pub fn root_path(&self) -> &Utf8Path {
        &self.root_path
    }

    fn entry_path(&self, digest: &str) -> Utf8PathBuf {
        let prefix = digest.get(..2).unwrap_or(digest);
        self.root_path.join("store").join(prefix).join(digest)
    }

    /// Read an entry if present and still valid under `policy`
    pub fn get(&self, key: &CacheKey, policy: CachePolicy) -> CacheResult<Option<Vec<u8>>> {
        let digest = key.digest();
        let Some(entry) = self.index.get(&digest) else {
            return Ok(None);
        };
        if let CachePolicy::Fresh(max_age) = policy {
            if !entry.is_fresh(max_age) {
                return Ok(None);
            }
        }

        match fs::read(self.entry_path(&digest)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Index and disk disagree; treat as a miss and let the fetch repair it
                warn!("cache entry for {} is missing on disk", key);
                self.index.remove(&digest);
                Ok(None)
            },
            Err(e) => Err(FetchError::io(format!("Failed to read cache entry for {key}"), e)),
        }
    }

    /// Write an entry atomically and record it in the index
    pub fn put(&self, key: &CacheKey, bytes: &[u8]) -> CacheResult<CacheEntry> {
        let digest = key.digest();
        let path = self.entry_path(&digest);
        let Some(parent) = path.parent() else {
            return Err(FetchError::io(
                format!("Invalid cache path {path}"),
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "no parent directory"),
            ));
        };
        write_atomic(parent, &path, bytes)?;

        let entry = CacheEntry::new(key, digest, bytes.len() as u64);
        self.index.insert(entry.clone());
        self.index.save()?;
        Ok(entry)
    }

    /// Remove an entry by digest, returning the bytes freed
    pub fn remove(&self, digest: &str) -> CacheResult<Option<u64>> {
        let Some(entry) = self.index.remove(digest) else {
            return Ok(None);
        };
        let path = self.entry_path(digest);
        if let Err(e) = fs::remove_file(&path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                return Err(FetchError::io(format!("Failed to remove {path}"), e));
            }
        }
        if let Some(parent) = path.parent() {
            let _ = fs::remove_dir(parent); // only succeeds once empty
        }
        self.index.save()?;
        Ok(Some(entry.size))
    }

    /// Remove every entry, returning the bytes freed
    pub fn clear(&self) -> CacheResult<u64> {
        let freed = self.index.entries().iter().map(|entry| entry.size).sum();
        let store_dir = self.root_path.join("store");
        if store_dir.exists() {
            fs::remove_dir_all(&store_dir)
                .map_err(|e| FetchError::io(format!("Failed to clear {store_dir}"), e))?;
        }
        fs::create_dir_all(&store_dir)
            .map_err(|e| FetchError::io(format!("Failed to recreate {store_dir}"), e))?;
        self.index.clear();
        self.index.save()?;
        Ok(freed)
    }

    /// All recorded entries, ordered by digest
    pub fn entries(&self) -> Vec<CacheEntry> {
        self.index.entries()
    }
}

/// Write `bytes` to `path` through a temporary file in `dir`
pub(crate) fn write_atomic(dir: &Utf8Path, path: &Utf8Path, bytes: &[u8]) -> CacheResult<()> {
    fs::create_dir_all(dir).map_err(|e| FetchError::io(format!("Failed to create {dir}"), e))?;
    let mut file = tempfile::NamedTempFile::new_in(dir)
        .map_err(|e| FetchError::io(format!("Failed to create temporary file in {dir}"), e))?;
    file.write_all(bytes)
        .map_err(|e| FetchError::io(format!("Failed to write {path}"), e))?;
    file.persist(path)
        .map_err(|e| FetchError::io(format!("Failed to persist {path}"), e.error))?;
    Ok(())
}
