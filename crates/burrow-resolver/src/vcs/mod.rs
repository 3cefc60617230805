//! Version-control origins.
//!
//! A repository dependency is resolved by checking it out, recording the
//! commit it landed on and reading the package descriptor at its root. The
//! resolver only sees the [`VcsProvider`] trait; [`GitCommand`] shells out to
//! `git`, [`StaticVcs`] serves canned checkouts for offline use and tests.

mod git;
mod fixed;

use async_trait::async_trait;
use thiserror::Error;

use burrow_core::descriptor::{Descriptor, DescriptorError};
use burrow_core::error::BurrowError;
use burrow_core::types::VcsReference;

pub use fixed::StaticVcs;
pub use git::GitCommand;

/// Result of checking out a repository
#[derive(Debug, Clone)]
pub struct Checkout {
    /// Full commit id the checkout landed on
    pub commit: String,
    pub descriptor: Descriptor,
}

#[derive(Error, Debug)]
pub enum VcsError {
    #[error("{url}: {message}")]
    Command { url: String, message: String },

    #[error("{url} has no package descriptor at its root")]
    MissingDescriptor { url: String },

    #[error("{url} has a malformed descriptor: {error}")]
    Descriptor {
        url: String,
        #[source]
        error: DescriptorError,
    },

    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

impl From<VcsError> for BurrowError {
    fn from(err: VcsError) -> Self {
        match err {
            VcsError::Command { url, message } => BurrowError::Vcs { url, message },
            VcsError::MissingDescriptor { url } => BurrowError::Vcs {
                message: "no package descriptor at the repository root".to_string(),
                url,
            },
            VcsError::Descriptor { url, error } => BurrowError::MalformedDescriptor {
                package: url,
                source: error,
            },
            VcsError::Io { message, source } => BurrowError::io(message, source),
        }
    }
}

/// Checks out repository dependencies
#[async_trait]
pub trait VcsProvider: Send + Sync {
    /// Shallow checkout of `url` at `reference`
    async fn checkout(&self, url: &str, reference: &VcsReference) -> Result<Checkout, VcsError>;
}

/// Label shown for a repository origin, e.g. `git@main` or `git@HEAD`
pub fn reference_label(reference: &VcsReference) -> String {
    format!("git@{}", reference.as_ref_name().unwrap_or("HEAD"))
}
