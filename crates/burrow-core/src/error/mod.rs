//! Error types and result aliases for Burrow operations.
//!
//! Each library crate defines its own `thiserror` enum close to the code that
//! raises it (`VersionError`, `DescriptorError`, `FetchError`, `PoolError`,
//! `ResolveError`, `LockError`). They all convert into [`BurrowError`], the
//! unified type the command line reports with an actionable suggestion.

use thiserror::Error;

use crate::descriptor::DescriptorError;
use crate::types::VersionError;

/// Boxed source error carried across crate boundaries.
pub type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// Unified error type for all Burrow operations
#[derive(Error, Debug)]
pub enum BurrowError {
    // Project and configuration errors
    #[error("Failed to parse burrow.toml: {message}")]
    ProjectParse { message: String },

    #[error("Configuration field '{field}' is invalid: {reason}")]
    ConfigValidation { field: String, reason: String },

    // Input syntax errors
    #[error(transparent)]
    Version(#[from] VersionError),

    #[error("Malformed descriptor for package '{package}': {source}")]
    MalformedDescriptor {
        package: String,
        #[source]
        source: DescriptorError,
    },

    // Pool errors
    #[error("Package '{name}' not found in any source")]
    PackageNotFound { name: String },

    #[error("No version of '{package}' satisfies '{constraint}' ({detail})")]
    NoMatch {
        package: String,
        constraint: String,
        detail: String,
    },

    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    // Resolution errors
    #[error(
        "Version conflict on '{package}': {selected_by} selected {chosen}, but {required_by} requires '{constraint}'"
    )]
    VersionConflict {
        package: String,
        chosen: String,
        constraint: String,
        selected_by: String,
        required_by: String,
    },

    #[error("Circular dependency detected: {cycle}")]
    CircularDependency { cycle: String },

    #[error("Package '{package}' is requested from conflicting origins: {detail}")]
    OriginConflict { package: String, detail: String },

    #[error("Version control error for {url}: {message}")]
    Vcs { url: String, message: String },

    // Lock errors
    #[error("Invalid lock file: {message}")]
    Lock {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("Lock file is out of date: {reason}")]
    StaleLock { reason: String },

    #[error("Integrity check failed for {package}: expected {expected}, got {actual}")]
    IntegrityFailure {
        package: String,
        expected: String,
        actual: String,
    },

    // IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for Burrow operations
pub type BurrowResult<T> = Result<T, BurrowError>;

impl BurrowError {
    /// Create a network error from any error type
    pub fn network<E>(message: String, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Network {
            message,
            source: Some(Box::new(source)),
        }
    }

    /// Create an IO error from std::io::Error
    pub fn io(message: String, source: std::io::Error) -> Self {
        Self::Io { message, source }
    }

    /// Check if this error is recoverable.
    ///
    /// Recoverable errors leave no trace in any cache, so the next run
    /// retries the same work from scratch.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, BurrowError::Network { .. } | BurrowError::Io { .. })
    }

    /// Get a user-friendly suggestion for fixing this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            BurrowError::PackageNotFound { .. } => {
                Some("Check the package name spelling and the sources declared in burrow.toml")
            },
            BurrowError::NoMatch { .. } => Some(
                "Relax the constraint, or lower the priority of the source that shadows the package",
            ),
            BurrowError::Network { .. } => Some("Check your internet connection and try again"),
            BurrowError::VersionConflict { .. } => Some(
                "Adjust the constraints so both requesters accept one version; burrow never backtracks",
            ),
            BurrowError::CircularDependency { .. } => {
                Some("Remove circular dependencies by restructuring your packages")
            },
            BurrowError::OriginConflict { .. } => {
                Some("Declare the package from a single origin (a source or a repository, not both)")
            },
            BurrowError::StaleLock { .. } => {
                Some("Run 'burrow lock' to refresh the lock file, or drop --frozen")
            },
            BurrowError::IntegrityFailure { .. } => {
                Some("Run 'burrow lock --fix-hashes' if the archive was republished upstream")
            },
            BurrowError::Lock { .. } => Some("Regenerate the lock file with 'burrow lock --overwrite'"),
            _ => None,
        }
    }
}
