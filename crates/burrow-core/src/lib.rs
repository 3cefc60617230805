//! # burrow-core
//!
//! Core types and utilities shared across all Burrow crates.
//!
//! This crate provides:
//! - Version and Constraint types (the version-constraint algebra)
//! - Source and root-request types describing a resolution pass
//! - Descriptor parsing for package metadata records
//! - BurrowError enum for unified error handling
//! - Content fingerprint helpers
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `types`: Core data types (Version, Constraint, Dependency, etc.)
//! - `descriptor`: Package descriptor records and their parser
//! - `error`: Error types and result aliases
//! - `utils`: Utility functions and helpers

pub mod descriptor;
pub mod error;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use descriptor::{Descriptor, DescriptorError};
pub use error::{BurrowError, BurrowResult};
pub use types::{
    Category, Clause, Constraint, Dependency, DependencyKind, LayoutKind, Op, ProxySetting,
    Requirement, RootDependency, RootRequest, SourceSpec, VcsReference, Version, VersionError,
    RUNTIME_PACKAGE,
};
