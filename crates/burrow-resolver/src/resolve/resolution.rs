//! Output of a successful resolution pass.

use std::collections::{BTreeMap, BTreeSet};

use burrow_core::types::{Category, Constraint, RootRequest, VcsReference, Version};
use burrow_lockfile::{Lock, LockedPackage};
use burrow_registry::Candidate;

use crate::graph::{DependencyGraph, PackageNode};
use crate::vcs::reference_label;

/// Where a bound package comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeOrigin {
    /// Selected from the source pool
    Pool { candidate: Candidate },
    /// Checked out from a repository
    Vcs {
        url: String,
        reference: VcsReference,
        commit: String,
    },
    /// Bundled with the runtime
    Core { version: Option<Version> },
}

/// One bound package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedNode {
    pub name: String,
    pub origin: NodeOrigin,
    pub fingerprint: Option<String>,
    /// Runtime constraint declared by the package
    pub runtime: Option<Constraint>,
    pub categories: BTreeSet<Category>,
    /// Required dependencies with the constraint this package puts on each
    pub children: Vec<(String, Constraint)>,
}

impl NodeOrigin {
    pub fn version(&self) -> Option<&Version> {
        match self {
            NodeOrigin::Pool { candidate } => Some(&candidate.version),
            NodeOrigin::Vcs { .. } => None,
            NodeOrigin::Core { version } => version.as_ref(),
        }
    }

    /// Label used in progress markers and conflict reports
    pub fn label(&self) -> String {
        match self {
            NodeOrigin::Pool { candidate } => candidate.version.to_string(),
            NodeOrigin::Vcs { reference, .. } => reference_label(reference),
            NodeOrigin::Core { version: Some(version) } => version.to_string(),
            NodeOrigin::Core { version: None } => "core".to_string(),
        }
    }
}

impl ResolvedNode {
    pub(crate) fn new(name: &str, origin: NodeOrigin) -> Self {
        Self {
            name: name.to_string(),
            origin,
            fingerprint: None,
            runtime: None,
            categories: BTreeSet::new(),
            children: Vec::new(),
        }
    }

    fn to_locked(&self) -> LockedPackage {
        let package = match &self.origin {
            NodeOrigin::Pool { candidate } => LockedPackage::from_source(
                &self.name,
                candidate.version.clone(),
                &candidate.source,
                &candidate.path,
            ),
            NodeOrigin::Vcs {
                url,
                reference,
                commit,
            } => LockedPackage::from_vcs(&self.name, url, reference.clone(), commit),
            NodeOrigin::Core { version } => LockedPackage::core(&self.name, version.clone()),
        };
        let package = package
            .with_runtime(self.runtime.clone())
            .with_categories(self.categories.iter().copied())
            .with_dependencies(self.children.iter().map(|(name, _)| name.clone()));
        match &self.fingerprint {
            Some(fingerprint) => package.with_fingerprint(fingerprint.clone()),
            None => package,
        }
    }
}

/// Every package bound by one resolution pass
#[derive(Debug)]
pub struct Resolution {
    request: RootRequest,
    nodes: BTreeMap<String, ResolvedNode>,
    conservative: bool,
}

impl Resolution {
    /// Assemble the result of a completed walk. Categories flow from each
    /// root to everything reachable from it.
    pub(crate) fn assemble(
        request: &RootRequest,
        mut nodes: BTreeMap<String, ResolvedNode>,
        conservative: bool,
    ) -> Result<Self, Vec<String>> {
        let mut graph = DependencyGraph::new();
        for node in nodes.values() {
            graph.add_package(PackageNode::new(&node.name, node.origin.label()));
        }
        for node in nodes.values() {
            for (child, constraint) in &node.children {
                // Every child was bound by the walk
                let _ = graph.add_dependency(&node.name, child, constraint.clone());
            }
        }
        graph.detect_cycles()?;

        for root in &request.dependencies {
            for name in graph.reachable_from(&root.name) {
                if let Some(node) = nodes.get_mut(&name) {
                    node.categories.extend(root.categories.iter().copied());
                }
            }
        }

        Ok(Self {
            request: request.clone(),
            nodes,
            conservative,
        })
    }

    /// Bound packages by name
    pub fn nodes(&self) -> impl Iterator<Item = &ResolvedNode> {
        self.nodes.values()
    }

    pub fn node(&self, name: &str) -> Option<&ResolvedNode> {
        self.nodes.get(name)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Lock pinning every bound package
    pub fn to_lock(&self) -> Lock {
        let packages = self.nodes.values().map(ResolvedNode::to_locked).collect();
        Lock::new(&self.request, packages, self.conservative)
    }
}

impl From<Resolution> for Lock {
    fn from(resolution: Resolution) -> Self {
        resolution.to_lock()
    }
}
