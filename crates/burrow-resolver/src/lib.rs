//! Dependency resolution engine for Burrow
//!
//! The resolver binds a project's root dependencies first, then walks their
//! dependencies depth first, binding each package name exactly once. Later requests for a bound name only
//! validate the existing choice; there is no backtracking. A conflict, a
//! missing match or a dependency cycle aborts the whole pass, so a lock is
//! only ever produced from a complete walk.

pub mod graph;
pub mod report;
pub mod resolve;
pub mod vcs;

// Re-export main types
pub use graph::{DependencyGraph, PackageNode};
pub use report::{render_marker, Marker, RecordingReporter, Reporter, SilentReporter};
pub use resolve::{
    is_core_package, NodeOrigin, Resolution, ResolveError, ResolvedNode, Resolver, ResolverConfig,
    CORE_PACKAGES, PROJECT_REQUESTER,
};
pub use vcs::{Checkout, GitCommand, StaticVcs, VcsError, VcsProvider};

/// Result type for resolver operations
pub type ResolveResult<T> = Result<T, ResolveError>;
