//! Deciding whether a lock still answers a project's root request.
//!
//! A lock is stale when the declared sources changed (name, URL or
//! priority, in order), when the root dependencies changed, or when a
//! locked package no longer satisfies its root requirement.

use burrow_core::types::{Requirement, RootRequest};

use crate::{Lock, LockedRoot, LockedSource, PackageOrigin};

impl Lock {
    /// Reason the lock no longer matches `request`, or `None` if it is current
    pub fn staleness(&self, request: &RootRequest) -> Option<String> {
        let sources: Vec<LockedSource> = request.sources.iter().map(LockedSource::from).collect();
        if sources != self.sources {
            return Some("declared sources changed".to_string());
        }

        let mut roots: Vec<LockedRoot> = request.dependencies.iter().map(LockedRoot::from).collect();
        roots.sort_by(|a, b| a.name.cmp(&b.name));
        if roots != self.roots {
            return Some("root dependencies changed".to_string());
        }

        for root in &request.dependencies {
            let Some(package) = self.package(&root.name) else {
                return Some(format!("'{}' is not locked", root.name));
            };
            match (&root.requirement, &package.origin) {
                (_, PackageOrigin::Core) => {},
                (Requirement::Registry(constraint), _) => match &package.version {
                    Some(version) if constraint.allows(version) => {},
                    Some(version) => {
                        return Some(format!(
                            "locked {} {} does not satisfy '{}'",
                            package.name, version, constraint
                        ))
                    },
                    None => return Some(format!("'{}' has no locked version", package.name)),
                },
                (Requirement::Registry(_), PackageOrigin::Vcs { .. }) => {
                    return Some(format!("'{}' is no longer a repository dependency", root.name))
                },
                (Requirement::Vcs { url, .. }, PackageOrigin::Vcs { url: locked, .. }) => {
                    if url != locked {
                        return Some(format!("'{}' now points at {}", root.name, url));
                    }
                },
                (Requirement::Vcs { .. }, _) => {
                    return Some(format!("'{}' is now a repository dependency", root.name))
                },
            }
        }

        None
    }

    pub fn is_stale(&self, request: &RootRequest) -> bool {
        self.staleness(request).is_some()
    }
}
