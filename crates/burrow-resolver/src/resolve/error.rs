//! Resolution errors.

use thiserror::Error;

use burrow_core::descriptor::DescriptorError;
use burrow_core::error::BurrowError;
use burrow_core::types::Constraint;
use burrow_registry::PoolError;

use crate::graph::DependencyGraph;
use crate::vcs::VcsError;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error(
        "Version conflict on '{package}': {selected_by} selected {chosen}, but {required_by} requires '{constraint}'"
    )]
    Conflict {
        package: String,
        /// Label of the bound version
        chosen: String,
        /// The constraint the bound version fails
        constraint: Constraint,
        /// Requester that caused the binding
        selected_by: String,
        /// Requester whose constraint failed
        required_by: String,
    },

    #[error(
        "No version of '{package}' required by {required_by} satisfies '{constraint}' in priority tier {priority} (sources: {})",
        .sources.join(", ")
    )]
    NoMatch {
        package: String,
        constraint: Constraint,
        required_by: String,
        priority: i32,
        sources: Vec<String>,
    },

    #[error("Package '{package}' required by {required_by} is not offered by any source")]
    NotFound { package: String, required_by: String },

    #[error("Circular dependency detected: {}", DependencyGraph::format_cycle(.cycle))]
    Cycle { cycle: Vec<String> },

    #[error("Package '{package}' is requested from conflicting origins: {detail}")]
    OriginConflict { package: String, detail: String },

    #[error("Malformed descriptor for '{package}' ({origin}): {error}")]
    MalformedDescriptor {
        package: String,
        origin: String,
        #[source]
        error: DescriptorError,
    },

    #[error("Failed to check out '{package}': {error}")]
    Vcs {
        package: String,
        #[source]
        error: VcsError,
    },

    #[error(transparent)]
    Pool(PoolError),
}

impl ResolveError {
    /// Attach the requester to a pool failure
    pub(crate) fn from_pool(err: PoolError, required_by: &str) -> Self {
        match err {
            PoolError::NotFound { name } => ResolveError::NotFound {
                package: name,
                required_by: required_by.to_string(),
            },
            PoolError::NoMatch {
                name,
                constraint,
                priority,
                sources,
            } => ResolveError::NoMatch {
                package: name,
                constraint,
                required_by: required_by.to_string(),
                priority,
                sources,
            },
            PoolError::MalformedDescriptor {
                name,
                version,
                origin,
                error,
            } => ResolveError::MalformedDescriptor {
                package: name,
                origin: format!("{version} from {origin}"),
                error,
            },
            other => ResolveError::Pool(other),
        }
    }
}

impl From<ResolveError> for BurrowError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::Conflict {
                package,
                chosen,
                constraint,
                selected_by,
                required_by,
            } => BurrowError::VersionConflict {
                package,
                chosen,
                constraint: constraint.to_string(),
                selected_by,
                required_by,
            },
            ResolveError::NoMatch {
                package,
                constraint,
                required_by,
                priority,
                sources,
            } => BurrowError::NoMatch {
                package,
                constraint: constraint.to_string(),
                detail: format!(
                    "required by {}; searched priority tier {} from {}",
                    required_by,
                    priority,
                    sources.join(", ")
                ),
            },
            ResolveError::NotFound { package, .. } => BurrowError::PackageNotFound { name: package },
            ResolveError::Cycle { cycle } => BurrowError::CircularDependency {
                cycle: DependencyGraph::format_cycle(&cycle),
            },
            ResolveError::OriginConflict { package, detail } => {
                BurrowError::OriginConflict { package, detail }
            },
            ResolveError::MalformedDescriptor { package, error, .. } => {
                BurrowError::MalformedDescriptor {
                    package,
                    source: error,
                }
            },
            ResolveError::Vcs { error, .. } => error.into(),
            ResolveError::Pool(e) => e.into(),
        }
    }
}
