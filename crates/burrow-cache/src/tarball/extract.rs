//! Descriptor extraction from package archives.

use flate2::read::GzDecoder;
use std::io::Read;
use tar::Archive;

use crate::fetch::FetchError;
use crate::CacheResult;

/// File name of the descriptor record inside an archive
pub const DESCRIPTOR_FILE: &str = "DESCRIPTION";

/// Read the descriptor record out of a gzipped tarball.
///
/// Archives may carry several files named `DESCRIPTION` (vendored sources,
/// test fixtures); the one with the shortest path is the package's own.
/// Returns `Ok(None)` when the archive holds no descriptor at all.
pub fn extract_descriptor(archive_bytes: &[u8]) -> CacheResult<Option<String>> {
    let mut archive = Archive::new(GzDecoder::new(archive_bytes));
    let mut best: Option<(usize, String, Vec<u8>)> = None;

    let entries = archive
        .entries()
        .map_err(|e| FetchError::io("Failed to read archive", e))?;
    for entry_result in entries {
        let mut entry = entry_result.map_err(|e| FetchError::io("Corrupt archive entry", e))?;
        if !entry.header().entry_type().is_file() {
            continue;
        }

        let path = entry
            .path()
            .map_err(|e| FetchError::io("Invalid archive path", e))?
            .to_string_lossy()
            .into_owned();
        let is_descriptor = path
            .rsplit('/')
            .next()
            .is_some_and(|name| name == DESCRIPTOR_FILE);
        if !is_descriptor {
            continue;
        }

        let depth = path.matches('/').count();
        let shorter = match &best {
            Some((best_depth, best_path, _)) => (depth, &path) < (*best_depth, best_path),
            None => true,
        };
        if shorter {
            let mut content = Vec::new();
            entry
                .read_to_end(&mut content)
                .map_err(|e| FetchError::io(format!("Failed to read {path}"), e))?;
            best = Some((depth, path, content));
        }
    }

    // Descriptor records are not always UTF-8 (Latin-1 maintainer names)
    Ok(best.map(|(_, _, content)| String::from_utf8_lossy(&content).into_owned()))
}
