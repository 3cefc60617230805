//! Lock file model for Burrow
//!
//! A lock pins every package of a resolved graph to an exact version and
//! origin. This crate owns its TOML representation, decides whether a lock
//! still matches a project's root request, repairs archive fingerprints, and
//! derives a dependencies-first install order.

pub mod error;
pub mod model;
pub mod order;
pub mod repair;
pub mod stale;

mod io;

// Re-export main types
pub use error::LockError;
pub use model::{
    Lock, LockMetadata, LockedPackage, LockedRoot, LockedSource, PackageOrigin, LOCK_FORMAT_VERSION,
};
pub use io::LOCK_FILE_NAME;
pub use repair::ArtifactFingerprinter;

/// Result type for lock operations
pub type LockResult<T> = Result<T, LockError>;
