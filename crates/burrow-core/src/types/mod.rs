//! Core data types for Burrow package management.
//!
//! This module provides the fundamental types used throughout Burrow:
//! - Version numbers and their ordering
//! - Version constraints (conjunctions of comparison clauses)
//! - Dependency specifications and project categories
//! - Sources and root requests, the inputs of a resolution pass

pub mod constraint;
pub mod dependency;
pub mod request;
pub mod version;

// Re-export all public types
pub use constraint::{Clause, Constraint, Op};
pub use dependency::{Category, Dependency, DependencyKind, RUNTIME_PACKAGE};
pub use request::{
    LayoutKind, ProxySetting, Requirement, RootDependency, RootRequest, SourceSpec, VcsReference,
};
pub use version::{Version, VersionError};
