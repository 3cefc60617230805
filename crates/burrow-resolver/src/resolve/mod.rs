//! Depth-first resolution walk.
//!
//! The project's own dependencies are bound first, in declaration order, so
//! a constraint written in the project file holds against anything a
//! dependency asks for later. Then each root's dependencies are walked depth
//! first.
//!
//! Each package name moves through three states: unvisited, in progress
//! (on the current recursion path) and bound. An unvisited name is bound by
//! selecting from the pool (or checking out a repository, or recognising a
//! core package) and then its dependencies are walked. A bound name met again
//! is only validated against the new constraint: a fit produces a reused
//! marker and no further work, a misfit is a conflict. Meeting a name that
//! is still in progress is a cycle.
//!
//! The walk runs on one task and owns all of its state. Only catalog
//! warm-up for a node's children runs in parallel, and selection order does
//! not depend on which warm-up finishes first.

mod bundled;
mod error;
mod resolution;

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use burrow_core::types::{Constraint, Requirement, RootRequest, Version, RUNTIME_PACKAGE};
use burrow_lockfile::{Lock, PackageOrigin};
use burrow_registry::{Pool, Selection};

use crate::report::{Marker, Reporter, SilentReporter};
use crate::vcs::{GitCommand, VcsProvider};
use crate::ResolveResult;

pub use bundled::{is_core_package, CORE_PACKAGES};
pub use error::ResolveError;
pub use resolution::{NodeOrigin, Resolution, ResolvedNode};

/// Requester name used for the project's own dependencies
pub const PROJECT_REQUESTER: &str = "the project";

const RUNTIME_REQUESTER: &str = "the configured runtime";
const PREVIOUS_LOCK_REQUESTER: &str = "the previous lock";

/// Resolver tuning
#[derive(Debug, Clone, Default)]
pub struct ResolverConfig {
    /// Runtime version to validate `R` constraints against; unchecked when unset
    pub runtime_version: Option<Version>,
}

/// Dependency resolver over a source pool
pub struct Resolver {
    pool: Arc<Pool>,
    vcs: Arc<dyn VcsProvider>,
    reporter: Arc<dyn Reporter>,
    config: ResolverConfig,
    /// Lock whose non-root versions are preferred (conservative mode)
    previous: Option<Lock>,
}

/// A bound name and who bound it
struct Binding {
    node: ResolvedNode,
    selected_by: String,
}

type BoxedWalk<'a> = Pin<Box<dyn Future<Output = ResolveResult<()>> + Send + 'a>>;

/// State of one resolution pass
struct Walk<'r> {
    resolver: &'r Resolver,
    bindings: HashMap<String, Binding>,
    /// Names in progress, outermost first
    path: Vec<String>,
    /// Preferred (source, version) per name from a previous lock
    seeds: HashMap<String, (String, Version)>,
}

impl Resolver {
    /// Create a resolver using `git` for repository dependencies
    pub fn new(pool: Arc<Pool>) -> Self {
        Self {
            pool,
            vcs: Arc::new(GitCommand::new()),
            reporter: Arc::new(SilentReporter),
            config: ResolverConfig::default(),
            previous: None,
        }
    }

    pub fn with_vcs(mut self, vcs: Arc<dyn VcsProvider>) -> Self {
        self.vcs = vcs;
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    /// Prefer the versions pinned by `previous` for every non-root package
    pub fn conservative(mut self, previous: Lock) -> Self {
        self.previous = Some(previous);
        self
    }

    pub fn pool(&self) -> &Arc<Pool> {
        &self.pool
    }

    /// Resolve `request` into a complete set of bindings
    pub async fn resolve(&self, request: &RootRequest) -> ResolveResult<Resolution> {
        let start = std::time::Instant::now();
        let mut walk = Walk {
            resolver: self,
            bindings: HashMap::new(),
            path: Vec::new(),
            seeds: self.seeds(request),
        };

        let registry_roots = request
            .dependencies
            .iter()
            .filter(|dep| dep.constraint().is_some())
            .map(|dep| dep.name.as_str());
        walk.prefetch(registry_roots).await;
        for root in &request.dependencies {
            walk.bind_root(&root.name, &root.requirement).await?;
        }
        for root in &request.dependencies {
            walk.descend_root(&root.name).await?;
        }

        let nodes: BTreeMap<String, ResolvedNode> = walk
            .bindings
            .into_iter()
            .map(|(name, binding)| (name, binding.node))
            .collect();
        let resolution = Resolution::assemble(request, nodes, self.previous.is_some())
            .map_err(|cycle| ResolveError::Cycle { cycle })?;

        info!(
            "Resolved {} packages in {}ms",
            resolution.len(),
            start.elapsed().as_millis()
        );
        Ok(resolution)
    }

    fn seeds(&self, request: &RootRequest) -> HashMap<String, (String, Version)> {
        let Some(previous) = &self.previous else {
            return HashMap::new();
        };
        previous
            .packages()
            .iter()
            // Roots are always selected afresh so project edits take effect
            .filter(|package| request.dependency(&package.name).is_none())
            .filter_map(|package| match (&package.origin, &package.version) {
                (PackageOrigin::Source { source, .. }, Some(version)) => {
                    Some((package.name.clone(), (source.clone(), version.clone())))
                },
                _ => None,
            })
            .collect()
    }
}

impl<'r> Walk<'r> {
    /// Bind a project dependency without walking its dependencies
    async fn bind_root(&mut self, name: &str, requirement: &Requirement) -> ResolveResult<()> {
        if let Some(binding) = self.bindings.get(name) {
            return self.validate(binding, requirement, PROJECT_REQUESTER);
        }
        let (node, selected_by) = self.bind(name, requirement, PROJECT_REQUESTER).await?;
        self.bindings
            .insert(name.to_string(), Binding { node, selected_by });
        Ok(())
    }

    /// Report a bound root and walk its dependencies
    async fn descend_root(&mut self, name: &str) -> ResolveResult<()> {
        let Some(binding) = self.bindings.get(name) else {
            return Ok(());
        };
        let node = &binding.node;
        if !matches!(node.origin, NodeOrigin::Core { .. }) {
            let label = node.origin.label();
            self.resolver
                .reporter
                .marker(0, &Marker::Fresh { name, label: &label });
        }
        let children = node.children.clone();
        self.walk_children(name, &children, 1).await
    }

    async fn walk_children(
        &mut self,
        parent: &str,
        children: &[(String, Constraint)],
        depth: usize,
    ) -> ResolveResult<()> {
        if children.is_empty() {
            return Ok(());
        }
        self.path.push(parent.to_string());
        self.prefetch(children.iter().map(|(child, _)| child.as_str()))
            .await;
        for (child, constraint) in children {
            let requirement = Requirement::Registry(constraint.clone());
            self.visit(child, &requirement, parent, depth).await?;
        }
        self.path.pop();
        Ok(())
    }

    fn visit<'a>(
        &'a mut self,
        name: &'a str,
        requirement: &'a Requirement,
        requester: &'a str,
        depth: usize,
    ) -> BoxedWalk<'a> {
        Box::pin(async move {
            if let Some(position) = self.path.iter().position(|entry| entry == name) {
                let mut cycle = self.path[position..].to_vec();
                cycle.push(name.to_string());
                return Err(ResolveError::Cycle { cycle });
            }

            if let Some(binding) = self.bindings.get(name) {
                self.validate(binding, requirement, requester)?;
                debug!("{} already bound, reusing for {}", name, requester);
                if !matches!(binding.node.origin, NodeOrigin::Core { .. }) {
                    self.resolver
                        .reporter
                        .marker(depth, &Marker::Reused { name });
                }
                return Ok(());
            }

            let (node, selected_by) = self.bind(name, requirement, requester).await?;
            if !matches!(node.origin, NodeOrigin::Core { .. }) {
                let label = node.origin.label();
                self.resolver.reporter.marker(
                    depth,
                    &Marker::Fresh {
                        name,
                        label: &label,
                    },
                );
            }
            let children = node.children.clone();
            self.bindings
                .insert(name.to_string(), Binding { node, selected_by });

            self.walk_children(name, &children, depth + 1).await
        })
    }

    /// Check a new request against an existing binding
    fn validate(&self, binding: &Binding, requirement: &Requirement, requester: &str) -> ResolveResult<()> {
        let node = &binding.node;
        let conflict = |constraint: &Constraint, chosen: String| ResolveError::Conflict {
            package: node.name.clone(),
            chosen,
            constraint: constraint.clone(),
            selected_by: binding.selected_by.clone(),
            required_by: requester.to_string(),
        };

        match (&node.origin, requirement) {
            (NodeOrigin::Pool { candidate }, Requirement::Registry(constraint)) => {
                if constraint.allows(&candidate.version) {
                    Ok(())
                } else {
                    Err(conflict(constraint, candidate.version.to_string()))
                }
            },
            (NodeOrigin::Core { version }, Requirement::Registry(constraint)) => match version {
                Some(version) if !constraint.allows(version) => {
                    Err(conflict(constraint, version.to_string()))
                },
                _ => Ok(()),
            },
            (
                NodeOrigin::Vcs {
                    url, reference, ..
                },
                Requirement::Vcs {
                    url: wanted_url,
                    reference: wanted_reference,
                },
            ) if url == wanted_url && reference == wanted_reference => Ok(()),
            (origin, requirement) => Err(ResolveError::OriginConflict {
                package: node.name.clone(),
                detail: format!(
                    "{} bound it to {}, but {} asks for {}",
                    binding.selected_by,
                    describe_origin(origin),
                    requester,
                    describe_requirement(requirement)
                ),
            }),
        }
    }

    /// Bind an unvisited name; returns the node and who is recorded as selecting it
    async fn bind(
        &self,
        name: &str,
        requirement: &Requirement,
        requester: &str,
    ) -> ResolveResult<(ResolvedNode, String)> {
        if is_core_package(name) {
            return self.bind_core(name, requirement, requester);
        }
        match requirement {
            Requirement::Registry(constraint) => self.bind_from_pool(name, constraint, requester).await,
            Requirement::Vcs { url, reference } => {
                info!("Resolving {} from {} ({})", name, url, reference);
                let checkout = self
                    .resolver
                    .vcs
                    .checkout(url, reference)
                    .await
                    .map_err(|error| ResolveError::Vcs {
                        package: name.to_string(),
                        error,
                    })?;
                let descriptor = checkout.descriptor;
                let mut node = ResolvedNode::new(
                    name,
                    NodeOrigin::Vcs {
                        url: url.clone(),
                        reference: reference.clone(),
                        commit: checkout.commit,
                    },
                );
                node.runtime = descriptor.runtime_constraint().cloned();
                node.children = descriptor
                    .requirements()
                    .map(|dep| (dep.name.clone(), dep.constraint.clone()))
                    .collect();
                Ok((node, requester.to_string()))
            },
        }
    }

    fn bind_core(
        &self,
        name: &str,
        requirement: &Requirement,
        requester: &str,
    ) -> ResolveResult<(ResolvedNode, String)> {
        let version = if name == RUNTIME_PACKAGE {
            self.resolver.config.runtime_version.clone()
        } else {
            None
        };
        let selected_by = if version.is_some() {
            RUNTIME_REQUESTER
        } else {
            requester
        };
        let binding = Binding {
            node: ResolvedNode::new(name, NodeOrigin::Core { version }),
            selected_by: selected_by.to_string(),
        };
        self.validate(&binding, requirement, requester)?;
        debug!("{} is a core package", name);
        Ok((binding.node, binding.selected_by))
    }

    async fn bind_from_pool(
        &self,
        name: &str,
        constraint: &Constraint,
        requester: &str,
    ) -> ResolveResult<(ResolvedNode, String)> {
        let pool = &self.resolver.pool;

        let (selection, seeded) = match self.seeded(name).await? {
            Some(selection) => {
                debug!("{} keeps {} from the previous lock", name, selection.candidate.version);
                (selection, true)
            },
            None => {
                let selection = pool
                    .highest_version_satisfying(name, constraint)
                    .await
                    .map_err(|e| ResolveError::from_pool(e, requester))?;
                (selection, false)
            },
        };

        let Selection {
            candidate,
            descriptor,
        } = selection;
        let fingerprint = pool
            .fingerprint(&candidate)
            .await
            .map_err(|e| ResolveError::from_pool(e, requester))?;

        let mut node = ResolvedNode::new(name, NodeOrigin::Pool { candidate });
        node.fingerprint = Some(fingerprint);
        node.runtime = descriptor.runtime_constraint().cloned();
        node.children = descriptor
            .requirements()
            .map(|dep| (dep.name.clone(), dep.constraint.clone()))
            .collect();

        if !seeded {
            return Ok((node, requester.to_string()));
        }

        // A seeded version is bound first and then held to the constraint
        // like any later request
        let binding = Binding {
            node,
            selected_by: PREVIOUS_LOCK_REQUESTER.to_string(),
        };
        self.validate(&binding, &Requirement::Registry(constraint.clone()), requester)?;
        Ok((binding.node, binding.selected_by))
    }

    /// The previous lock's pick for `name`, if its authoritative tier still
    /// offers it
    async fn seeded(&self, name: &str) -> ResolveResult<Option<Selection>> {
        let Some((source, version)) = self.seeds.get(name) else {
            return Ok(None);
        };
        let pool = &self.resolver.pool;
        let found = pool
            .find_authoritative(name, version, source)
            .await
            .map_err(|e| ResolveError::from_pool(e, PREVIOUS_LOCK_REQUESTER))?;
        let Some(candidate) = found else {
            warn!(
                "{} {} from {} is no longer offered by the highest-priority source carrying it",
                name, version, source
            );
            return Ok(None);
        };
        let descriptor = pool
            .descriptor(&candidate)
            .await
            .map_err(|e| ResolveError::from_pool(e, PREVIOUS_LOCK_REQUESTER))?;
        Ok(descriptor.map(|descriptor| Selection {
            candidate,
            descriptor,
        }))
    }

    /// Warm catalog tiers for `names` in parallel. Failures are left for the
    /// sequential selection to report.
    async fn prefetch<'n>(&self, names: impl Iterator<Item = &'n str>) {
        let mut tasks = JoinSet::new();
        for name in names {
            if is_core_package(name) || self.bindings.contains_key(name) {
                continue;
            }
            let pool = self.resolver.pool.clone();
            let name = name.to_string();
            tasks.spawn(async move {
                let result = pool.tiers(&name).await;
                (name, result.err())
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, Some(e))) => debug!("Prefetch of {} failed: {}", name, e),
                Ok(_) => {},
                Err(e) => warn!("Prefetch task failed: {}", e),
            }
        }
    }
}

fn describe_origin(origin: &NodeOrigin) -> String {
    match origin {
        NodeOrigin::Pool { candidate } => format!("{} from source {}", candidate.version, candidate.source),
        NodeOrigin::Vcs { url, reference, .. } => format!("repository {url} ({reference})"),
        NodeOrigin::Core { .. } => "the runtime's core packages".to_string(),
    }
}

fn describe_requirement(requirement: &Requirement) -> String {
    match requirement {
        Requirement::Registry(constraint) => format!("'{constraint}' from the package sources"),
        Requirement::Vcs { url, reference } => format!("repository {url} ({reference})"),
    }
}
