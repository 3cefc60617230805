//! Package sources.
//!
//! A [`Catalog`] answers "which versions of this package does one source
//! offer". Current versions are listed on the source's `src/contrib/` page;
//! superseded ones live under `src/contrib/Archive/<name>/`, arranged by one
//! of the [`ArchiveLayout`] implementations.

mod catalog;
mod layout;

pub use catalog::{ArchiveFile, Catalog, CONTRIB_PATH};
pub use layout::{
    detect_layout, layout_for, undeclared_tarball_dirs, ArchiveLayout, FlatLayout, SegregatedLayout,
};
