//! Archive layouts.

use burrow_core::types::LayoutKind;

use crate::listing::Listing;

/// Where a source keeps the tarballs of superseded versions
pub trait ArchiveLayout: Send + Sync {
    fn kind(&self) -> LayoutKind;

    /// Directories (relative to the source root) holding a package's archived
    /// tarballs, given the listing of its archive directory
    fn tarball_dirs(&self, archive_dir: &str, listing: &Listing) -> Vec<String>;
}

/// Tarballs sit directly in `Archive/<name>/` (CRAN and its mirrors)
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatLayout;

/// Each version has its own `Archive/<name>/<version>/` directory
/// (Artifactory-style repositories)
#[derive(Debug, Clone, Copy, Default)]
pub struct SegregatedLayout;

impl ArchiveLayout for FlatLayout {
    fn kind(&self) -> LayoutKind {
        LayoutKind::Flat
    }

    fn tarball_dirs(&self, archive_dir: &str, _listing: &Listing) -> Vec<String> {
        vec![archive_dir.to_string()]
    }
}

impl ArchiveLayout for SegregatedLayout {
    fn kind(&self) -> LayoutKind {
        LayoutKind::Segregated
    }

    fn tarball_dirs(&self, archive_dir: &str, listing: &Listing) -> Vec<String> {
        listing
            .directories
            .iter()
            .map(|dir| format!("{archive_dir}{dir}"))
            .collect()
    }
}

/// Layout implementation for a layout kind
pub fn layout_for(kind: LayoutKind) -> &'static dyn ArchiveLayout {
    match kind {
        LayoutKind::Flat => &FlatLayout,
        LayoutKind::Segregated => &SegregatedLayout,
    }
}

/// Infer the layout from a package's archive listing. Empty listings say
/// nothing; tarballs mean flat; only subdirectories mean segregated.
pub fn detect_layout(listing: &Listing) -> Option<LayoutKind> {
    if !listing.tarballs.is_empty() {
        Some(LayoutKind::Flat)
    } else if !listing.directories.is_empty() {
        Some(LayoutKind::Segregated)
    } else {
        None
    }
}

/// Directories to read when the source declares no layout. A package may
/// keep tarballs directly in its archive directory, in version
/// subdirectories, or both; flat tarballs come first.
pub fn undeclared_tarball_dirs(archive_dir: &str, listing: &Listing) -> Vec<String> {
    let mut dirs = Vec::new();
    if !listing.tarballs.is_empty() {
        dirs.extend(FlatLayout.tarball_dirs(archive_dir, listing));
    }
    dirs.extend(SegregatedLayout.tarball_dirs(archive_dir, listing));
    dirs
}
