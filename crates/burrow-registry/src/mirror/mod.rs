//! In-memory source mirrors.
//!
//! Lays packages out exactly like a CRAN-style repository (index pages,
//! archive directories, tarballs) and serves them from a [`MemoryFetcher`].
//! Used for offline operation, tests and benchmarks.

use std::collections::BTreeMap;

use burrow_cache::{create_tarball, CacheResult, MemoryFetcher};
use burrow_core::types::{LayoutKind, Version};

use crate::listing::tarball_filename;
use crate::source::CONTRIB_PATH;

/// What a published archive contains
#[derive(Debug, Clone)]
enum Contents {
    /// Descriptor assembled from name, version and extra fields
    Fields(String),
    /// Descriptor text exactly as given
    Raw(String),
    /// No descriptor at all
    Empty,
}

/// Builder for one mirrored source
#[derive(Debug, Clone)]
pub struct MirrorBuilder {
    url: String,
    layout: LayoutKind,
    packages: BTreeMap<String, Vec<(Version, Contents)>>,
}

impl MirrorBuilder {
    /// Mirror rooted at `url` with the flat archive layout
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            layout: LayoutKind::Flat,
            packages: BTreeMap::new(),
        }
    }

    pub fn layout(mut self, layout: LayoutKind) -> Self {
        self.layout = layout;
        self
    }

    /// Publish `name` at `version`; `fields` are extra descriptor lines such
    /// as `Imports: b (>= 1.0)`
    pub fn package(self, name: &str, version: &str, fields: &str) -> Self {
        self.publish(name, version, Contents::Fields(fields.to_string()))
    }

    /// Publish an archive whose descriptor is exactly `text`
    pub fn raw_package(self, name: &str, version: &str, text: &str) -> Self {
        self.publish(name, version, Contents::Raw(text.to_string()))
    }

    /// Publish an archive without a descriptor
    pub fn package_without_descriptor(self, name: &str, version: &str) -> Self {
        self.publish(name, version, Contents::Empty)
    }

    fn publish(mut self, name: &str, version: &str, contents: Contents) -> Self {
        // Fixture versions are literals; an invalid one is skipped rather than published
        if let Ok(version) = Version::parse(version) {
            self.packages
                .entry(name.to_string())
                .or_default()
                .push((version, contents));
        }
        self
    }

    /// Archive path of a published version
    pub fn archive_path(&self, name: &str, version: &Version) -> String {
        let filename = tarball_filename(name, version);
        let is_current = self
            .packages
            .get(name)
            .and_then(|versions| versions.iter().map(|(v, _)| v).max())
            .is_some_and(|latest| latest == version);
        if is_current {
            format!("{CONTRIB_PATH}{filename}")
        } else {
            match self.layout {
                LayoutKind::Flat => format!("{CONTRIB_PATH}Archive/{name}/{filename}"),
                LayoutKind::Segregated => {
                    format!("{CONTRIB_PATH}Archive/{name}/{version}/{filename}")
                },
            }
        }
    }

    /// Serve the mirror's pages and archives from `fetcher`
    pub fn install(&self, fetcher: &MemoryFetcher) -> CacheResult<()> {
        let mut current = Vec::new();

        for (name, versions) in &self.packages {
            let Some(latest) = versions.iter().map(|(v, _)| v).max() else {
                continue;
            };
            let mut archived = Vec::new();
            let mut version_dirs = Vec::new();

            for (version, contents) in versions {
                let filename = tarball_filename(name, version);
                let descriptor_path = format!("{name}/DESCRIPTION");
                let archive = match contents {
                    Contents::Fields(fields) => {
                        let text = format!("Package: {name}\nVersion: {version}\n{fields}\n");
                        create_tarball(&[(descriptor_path.as_str(), text.as_bytes())])?
                    },
                    Contents::Raw(text) => {
                        create_tarball(&[(descriptor_path.as_str(), text.as_bytes())])?
                    },
                    Contents::Empty => {
                        let readme = format!("{name}/README");
                        create_tarball(&[(readme.as_str(), b"no descriptor".as_slice())])?
                    },
                };
                fetcher.insert(&self.url, &self.archive_path(name, version), archive);

                if version == latest {
                    current.push(filename);
                } else if self.layout == LayoutKind::Segregated {
                    let dir = format!("{version}/");
                    fetcher.insert(
                        &self.url,
                        &format!("{CONTRIB_PATH}Archive/{name}/{dir}"),
                        render_page(&[filename]),
                    );
                    version_dirs.push(dir);
                } else {
                    archived.push(filename);
                }
            }

            let archive_page = match self.layout {
                LayoutKind::Flat => archived,
                LayoutKind::Segregated => version_dirs,
            };
            if !archive_page.is_empty() {
                fetcher.insert(
                    &self.url,
                    &format!("{CONTRIB_PATH}Archive/{name}/"),
                    render_page(&archive_page),
                );
            }
        }

        current.push("PACKAGES.gz".to_string());
        fetcher.insert(&self.url, CONTRIB_PATH, render_page(&current));
        Ok(())
    }
}

fn render_page(links: &[String]) -> String {
    let mut page = String::from("<html><body><pre>\n");
    for link in links {
        page.push_str(&format!("<a href=\"{link}\">{link}</a>\n"));
    }
    page.push_str("</pre></body></html>\n");
    page
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::parse_listing;
    use burrow_cache::{CacheKey, Fetcher};

    const URL: &str = "https://mirror.example.org";

    async fn page(fetcher: &MemoryFetcher, path: &str) -> crate::listing::Listing {
        let bytes = fetcher.fetch(&CacheKey::new(URL, path)).await.unwrap();
        parse_listing(&String::from_utf8(bytes).unwrap())
    }

    #[tokio::test]
    async fn test_flat_mirror_pages() {
        let fetcher = MemoryFetcher::new();
        MirrorBuilder::new(URL)
            .package("a", "1.0", "")
            .package("a", "2.0", "")
            .install(&fetcher)
            .unwrap();

        assert_eq!(page(&fetcher, "src/contrib/").await.tarballs, vec!["a_2.0.tar.gz"]);
        assert_eq!(
            page(&fetcher, "src/contrib/Archive/a/").await.tarballs,
            vec!["a_1.0.tar.gz"]
        );
    }

    #[tokio::test]
    async fn test_segregated_mirror_pages() {
        let fetcher = MemoryFetcher::new();
        let mirror = MirrorBuilder::new(URL)
            .layout(LayoutKind::Segregated)
            .package("a", "1.0", "")
            .package("a", "2.0", "");
        mirror.install(&fetcher).unwrap();

        assert_eq!(page(&fetcher, "src/contrib/Archive/a/").await.directories, vec!["1.0/"]);
        let old = Version::parse("1.0").unwrap();
        assert_eq!(mirror.archive_path("a", &old), "src/contrib/Archive/a/1.0/a_1.0.tar.gz");
    }
}
