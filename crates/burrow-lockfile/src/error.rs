//! Lock file errors.

use burrow_core::error::BurrowError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LockError {
    #[error("Malformed lock file: {message}")]
    Malformed { message: String },

    #[error("Unsupported lock format version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("Lock contains a dependency cycle: {cycle}")]
    Cycle { cycle: String },

    #[error("Failed to fingerprint '{package}': {source}")]
    Fingerprint {
        package: String,
        #[source]
        source: Box<BurrowError>,
    },

    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

impl LockError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }
}

impl From<LockError> for BurrowError {
    fn from(err: LockError) -> Self {
        match err {
            LockError::Cycle { cycle } => BurrowError::CircularDependency { cycle },
            LockError::Io { message, source } => BurrowError::io(message, source),
            LockError::Fingerprint { source, .. } => *source,
            other => BurrowError::Lock {
                message: other.to_string(),
                source: Some(Box::new(other)),
            },
        }
    }
}
