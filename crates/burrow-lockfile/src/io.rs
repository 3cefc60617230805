//! Reading and writing lock files.

use camino::Utf8Path;
use std::fs;
use std::io::Write;
use tracing::debug;

use crate::{Lock, LockError, LockResult};

/// Default lock file name
pub const LOCK_FILE_NAME: &str = "burrow.lock";

impl Lock {
    /// Write the lock to `path`, replacing any existing file atomically
    pub fn save(&self, path: &Utf8Path) -> LockResult<()> {
        let text = self.to_toml_string()?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_str().is_empty() => parent,
            _ => Utf8Path::new("."),
        };

        let mut file = tempfile::NamedTempFile::new_in(dir)
            .map_err(|e| LockError::io(format!("Failed to create temporary file in {dir}"), e))?;
        file.write_all(text.as_bytes())
            .map_err(|e| LockError::io(format!("Failed to write {path}"), e))?;
        file.persist(path)
            .map_err(|e| LockError::io(format!("Failed to persist {path}"), e.error))?;

        debug!("Wrote lock with {} packages to {}", self.packages.len(), path);
        Ok(())
    }

    /// Read the lock at `path`
    pub fn load(path: &Utf8Path) -> LockResult<Lock> {
        let text = fs::read_to_string(path)
            .map_err(|e| LockError::io(format!("Failed to read {path}"), e))?;
        Lock::from_toml_str(&text)
    }

    /// Read the lock at `path`, or `None` when there is no file
    pub fn load_if_exists(path: &Utf8Path) -> LockResult<Option<Lock>> {
        match fs::read_to_string(path) {
            Ok(text) => Lock::from_toml_str(&text).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(LockError::io(format!("Failed to read {path}"), e)),
        }
    }
}
