//! Gzipped tarball utilities
//!
//! Package archives are `.tar.gz` files holding one top-level directory.
//! Resolution only needs the descriptor record inside; creation is used to
//! build archives for local mirrors and fixtures.

pub mod create;
pub mod extract;

// Re-export main functions
pub use create::create_tarball;
pub use extract::{extract_descriptor, DESCRIPTOR_FILE};
