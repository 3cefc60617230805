//! Per-source view of available package versions.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use burrow_cache::{CacheKey, CachePolicy, FetchCache, FetchError};
use burrow_core::types::{LayoutKind, SourceSpec, Version};

use super::layout::{detect_layout, layout_for, undeclared_tarball_dirs};
use crate::listing::{parse_filename, parse_listing, Listing};

/// Directory listing the current version of every package
pub const CONTRIB_PATH: &str = "src/contrib/";

/// One tarball offered by a source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveFile {
    pub name: String,
    pub version: Version,
    pub filename: String,
    /// Path relative to the source root
    pub path: String,
}

/// Lazily populated catalog of one source
pub struct Catalog {
    spec: SourceSpec,
    cache: Arc<FetchCache>,
    index_ttl: Duration,
    active: OnceCell<HashMap<String, Vec<ArchiveFile>>>,
    detected_layout: OnceLock<LayoutKind>,
}

impl ArchiveFile {
    fn from_listing(filename: &str, dir: &str) -> Option<Self> {
        let (name, version) = parse_filename(filename)?;
        Some(Self {
            name,
            version,
            filename: filename.to_string(),
            path: format!("{dir}{filename}"),
        })
    }
}

impl Catalog {
    pub fn new(spec: SourceSpec, cache: Arc<FetchCache>, index_ttl: Duration) -> Self {
        Self {
            spec,
            cache,
            index_ttl,
            active: OnceCell::new(),
            detected_layout: OnceLock::new(),
        }
    }

    pub fn spec(&self) -> &SourceSpec {
        &self.spec
    }

    /// Declared layout, or the first one seen in an archive listing
    pub fn layout(&self) -> Option<LayoutKind> {
        self.spec.layout.or_else(|| self.detected_layout.get().copied())
    }

    /// Cache key of a resource under this source
    pub fn key(&self, path: &str) -> CacheKey {
        CacheKey::new(self.spec.url.clone(), path)
    }

    async fn listing(&self, path: &str) -> Result<Listing, FetchError> {
        let policy = CachePolicy::Fresh(self.index_ttl);
        match self.cache.get(&self.key(path), policy).await {
            Ok(bytes) => Ok(parse_listing(&String::from_utf8_lossy(&bytes))),
            Err(e) if e.is_not_found() => {
                debug!("{} has no listing at {}", self.spec.name, path);
                Ok(Listing::default())
            },
            Err(e) => Err(e),
        }
    }

    async fn active(&self) -> Result<&HashMap<String, Vec<ArchiveFile>>, FetchError> {
        self.active
            .get_or_try_init(|| async {
                let listing = self.listing(CONTRIB_PATH).await?;
                let mut by_name: HashMap<String, Vec<ArchiveFile>> = HashMap::new();
                for filename in &listing.tarballs {
                    if let Some(file) = ArchiveFile::from_listing(filename, CONTRIB_PATH) {
                        by_name.entry(file.name.clone()).or_default().push(file);
                    }
                }
                info!(
                    "{} lists {} current packages",
                    self.spec.name,
                    by_name.len()
                );
                Ok(by_name)
            })
            .await
    }

    /// Every version of `name` this source offers, current ones first.
    /// Duplicate file names keep their first occurrence.
    pub async fn versions(&self, name: &str) -> Result<Vec<ArchiveFile>, FetchError> {
        let mut files = self.active().await?.get(name).cloned().unwrap_or_default();

        let archive_dir = format!("{CONTRIB_PATH}Archive/{name}/");
        let top = self.listing(&archive_dir).await?;

        for dir in self.tarball_dirs(&archive_dir, &top) {
            let listing = if dir == archive_dir {
                top.clone()
            } else {
                self.listing(&dir).await?
            };
            for filename in &listing.tarballs {
                let Some(file) = ArchiveFile::from_listing(filename, &dir) else {
                    continue;
                };
                if file.name == name && !files.iter().any(|f| f.filename == file.filename) {
                    files.push(file);
                }
            }
        }

        Ok(files)
    }

    /// Directories holding archived tarballs. A declared layout is
    /// followed as is; otherwise each package is read under both layouts.
    fn tarball_dirs(&self, archive_dir: &str, listing: &Listing) -> Vec<String> {
        if let Some(kind) = self.spec.layout {
            return layout_for(kind).tarball_dirs(archive_dir, listing);
        }
        if let Some(detected) = detect_layout(listing) {
            if self.detected_layout.set(detected).is_ok() {
                debug!("{} uses the {:?} archive layout", self.spec.name, detected);
            }
        }
        undeclared_tarball_dirs(archive_dir, listing)
    }
}

impl fmt::Debug for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Catalog")
            .field("source", &self.spec.name)
            .field("layout", &self.layout())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burrow_cache::{FetchCacheConfig, MemoryFetcher};

    const URL: &str = "https://cran.example.org";

    fn page(links: &[&str]) -> String {
        links
            .iter()
            .map(|link| format!("<a href=\"{link}\">{link}</a>\n"))
            .collect()
    }

    fn catalog(fetcher: MemoryFetcher, layout: Option<LayoutKind>) -> Catalog {
        let mut spec = SourceSpec::new("cran", URL);
        spec.layout = layout;
        let cache = FetchCache::in_memory(Arc::new(fetcher), FetchCacheConfig::default());
        Catalog::new(spec, Arc::new(cache), Duration::from_secs(3600))
    }

    fn versions(files: &[ArchiveFile]) -> Vec<String> {
        files.iter().map(|f| f.version.to_string()).collect()
    }

    #[tokio::test]
    async fn test_flat_archive() {
        let fetcher = MemoryFetcher::new();
        fetcher.insert(URL, "src/contrib/", page(&["abind_1.4-5.tar.gz", "zoo_1.8.tar.gz"]));
        fetcher.insert(
            URL,
            "src/contrib/Archive/abind/",
            page(&["abind_1.4-3.tar.gz", "abind_1.4-5.tar.gz"]),
        );

        let catalog = catalog(fetcher, None);
        let files = catalog.versions("abind").await.unwrap();
        assert_eq!(versions(&files), vec!["1.4-5", "1.4-3"]);
        assert_eq!(files[0].path, "src/contrib/abind_1.4-5.tar.gz");
        assert_eq!(files[1].path, "src/contrib/Archive/abind/abind_1.4-3.tar.gz");
        assert_eq!(catalog.layout(), Some(LayoutKind::Flat));
    }

    #[tokio::test]
    async fn test_segregated_archive() {
        let fetcher = MemoryFetcher::new();
        fetcher.insert(URL, "src/contrib/", page(&["abind_1.4-5.tar.gz"]));
        fetcher.insert(URL, "src/contrib/Archive/abind/", page(&["1.4-3/", "1.4-4/"]));
        fetcher.insert(URL, "src/contrib/Archive/abind/1.4-3/", page(&["abind_1.4-3.tar.gz"]));
        fetcher.insert(URL, "src/contrib/Archive/abind/1.4-4/", page(&["abind_1.4-4.tar.gz"]));

        let catalog = catalog(fetcher, None);
        let files = catalog.versions("abind").await.unwrap();
        assert_eq!(versions(&files), vec!["1.4-5", "1.4-3", "1.4-4"]);
        assert_eq!(files[2].path, "src/contrib/Archive/abind/1.4-4/abind_1.4-4.tar.gz");
        assert_eq!(catalog.layout(), Some(LayoutKind::Segregated));
    }

    #[tokio::test]
    async fn test_declared_layout_is_followed() {
        let fetcher = MemoryFetcher::new();
        fetcher.insert(URL, "src/contrib/", page(&[]));
        // Tarballs in the top directory are ignored when the layout says otherwise
        fetcher.insert(
            URL,
            "src/contrib/Archive/abind/",
            page(&["abind_1.0.tar.gz", "1.1/"]),
        );
        fetcher.insert(URL, "src/contrib/Archive/abind/1.1/", page(&["abind_1.1.tar.gz"]));

        let catalog = catalog(fetcher, Some(LayoutKind::Segregated));
        let files = catalog.versions("abind").await.unwrap();
        assert_eq!(versions(&files), vec!["1.1"]);
    }

    #[tokio::test]
    async fn test_undeclared_layout_read_per_package() {
        let fetcher = MemoryFetcher::new();
        fetcher.insert(
            URL,
            "src/contrib/",
            page(&["abind_1.4-5.tar.gz", "zoo_1.8.tar.gz"]),
        );
        fetcher.insert(URL, "src/contrib/Archive/abind/", page(&["abind_1.4-3.tar.gz"]));
        fetcher.insert(URL, "src/contrib/Archive/zoo/", page(&["1.7/", "1.8/"]));
        fetcher.insert(URL, "src/contrib/Archive/zoo/1.7/", page(&["zoo_1.7.tar.gz"]));
        fetcher.insert(URL, "src/contrib/Archive/zoo/1.8/", page(&["zoo_1.8.tar.gz"]));

        let catalog = catalog(fetcher, None);
        let abind = catalog.versions("abind").await.unwrap();
        assert_eq!(versions(&abind), vec!["1.4-5", "1.4-3"]);

        // A flat neighbour does not hide version directories
        let zoo = catalog.versions("zoo").await.unwrap();
        assert_eq!(versions(&zoo), vec!["1.8", "1.7"]);
        assert_eq!(zoo[0].path, "src/contrib/zoo_1.8.tar.gz");
        assert_eq!(zoo[1].path, "src/contrib/Archive/zoo/1.7/zoo_1.7.tar.gz");
        assert_eq!(catalog.layout(), Some(LayoutKind::Flat));
    }

    #[tokio::test]
    async fn test_mixed_archive_directory_keeps_first_copy() {
        let fetcher = MemoryFetcher::new();
        fetcher.insert(URL, "src/contrib/", page(&[]));
        fetcher.insert(
            URL,
            "src/contrib/Archive/abind/",
            page(&["abind_1.0.tar.gz", "1.0/", "1.1/"]),
        );
        fetcher.insert(URL, "src/contrib/Archive/abind/1.0/", page(&["abind_1.0.tar.gz"]));
        fetcher.insert(URL, "src/contrib/Archive/abind/1.1/", page(&["abind_1.1.tar.gz"]));

        let catalog = catalog(fetcher, None);
        let files = catalog.versions("abind").await.unwrap();
        assert_eq!(versions(&files), vec!["1.0", "1.1"]);
        assert_eq!(files[0].path, "src/contrib/Archive/abind/abind_1.0.tar.gz");
    }

    #[tokio::test]
    async fn test_missing_pages_mean_no_versions() {
        let catalog = catalog(MemoryFetcher::new(), None);
        assert!(catalog.versions("abind").await.unwrap().is_empty());
        assert_eq!(catalog.layout(), None);
    }

    #[tokio::test]
    async fn test_failed_listing_is_an_error() {
        let fetcher = MemoryFetcher::new();
        fetcher.insert(URL, "src/contrib/", page(&[]));
        fetcher.fail_next(&CacheKey::new(URL, "src/contrib/"), 1);

        let catalog = catalog(fetcher, None);
        assert!(catalog.versions("abind").await.is_err());
        // Failure is not remembered
        assert!(catalog.versions("abind").await.is_ok());
    }
}
