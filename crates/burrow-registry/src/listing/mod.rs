//! Index page parsing.
//!
//! Sources publish plain HTML directory listings. A tarball link is an
//! anchor whose target ends in `gz` and whose text repeats the target (the
//! `PACKAGES.gz` index is skipped); a directory link is a relative target
//! ending in `/`. Everything else on the page is ignored.

use regex::Regex;
use std::sync::OnceLock;

use burrow_core::types::Version;

/// Links found on one index page, in page order without duplicates
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    pub tarballs: Vec<String>,
    pub directories: Vec<String>,
}

fn anchor_pattern() -> &'static Regex {
    static ANCHOR: OnceLock<Regex> = OnceLock::new();
    ANCHOR.get_or_init(|| {
        Regex::new(r#"(?is)<a\s[^>]*?href\s*=\s*["']([^"']*)["'][^>]*>(.*?)</a>"#)
            .expect("anchor pattern is a valid regex")
    })
}

/// Parse an HTML index page into its tarball and directory links
pub fn parse_listing(html: &str) -> Listing {
    let mut listing = Listing::default();

    for captures in anchor_pattern().captures_iter(html) {
        let href = captures[1].trim();
        let text = captures[2].trim();

        if is_tarball(href, text) {
            if !listing.tarballs.iter().any(|t| t == href) {
                listing.tarballs.push(href.to_string());
            }
        } else if is_directory(href) && !listing.directories.iter().any(|d| d == href) {
            listing.directories.push(href.to_string());
        }
    }

    listing
}

fn is_tarball(href: &str, text: &str) -> bool {
    href.ends_with("gz") && href == text && href != "PACKAGES.gz"
}

fn is_directory(href: &str) -> bool {
    let Some(inner) = href.strip_suffix('/') else {
        return false;
    };
    !inner.is_empty()
        && !inner.contains(['/', '?', ':'])
        && inner != "."
        && inner != ".."
}

/// Split `name_version.tar.gz` into its package name and version
pub fn parse_filename(filename: &str) -> Option<(String, Version)> {
    let stem = filename.strip_suffix(".tar.gz")?;
    let (name, version) = stem.split_once('_')?;
    if name.is_empty() {
        return None;
    }
    let version = Version::parse(version).ok()?;
    Some((name.to_string(), version))
}

/// Tarball file name for a package version
pub fn tarball_filename(name: &str, version: &Version) -> String {
    format!("{}_{}.tar.gz", name, version)
}
