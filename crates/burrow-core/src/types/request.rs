//! Project-level inputs to a resolution pass.
//!
//! A [`RootRequest`] is everything a lock depends on: the ordered list of
//! package sources and the project's root dependencies. Lock files keep a
//! snapshot of it to detect staleness.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::{Category, Constraint};

/// How a source's HTTP traffic is proxied
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum ProxySetting {
    /// Use the proxy from the environment, if any
    #[default]
    Inherit,
    /// Connect directly, ignoring environment proxies
    Disabled,
    /// Use this proxy URL
    Url(String),
}

/// How a source lays out archived (superseded) package versions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutKind {
    /// Tarballs sit directly in the package's archive directory
    Flat,
    /// One subdirectory per version, each holding its tarball
    Segregated,
}

/// A remote package repository
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceSpec {
    pub name: String,
    pub url: String,
    /// Higher wins; sources sharing a priority form one tier
    pub priority: i32,
    pub proxy: ProxySetting,
    /// Declared archive layout; detected per package when absent
    pub layout: Option<LayoutKind>,
}

/// Branch, tag or revision to check out from a repository
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VcsReference {
    DefaultBranch,
    Branch(String),
    Tag(String),
    Rev(String),
}

/// What a root dependency asks for
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Requirement {
    /// Any version from the source pool satisfying the constraint
    Registry(Constraint),
    /// A checkout of a version-control repository
    Vcs { url: String, reference: VcsReference },
}

/// A dependency declared by the project itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootDependency {
    pub name: String,
    pub requirement: Requirement,
    pub categories: BTreeSet<Category>,
}

/// Everything a resolution pass starts from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RootRequest {
    pub sources: Vec<SourceSpec>,
    pub dependencies: Vec<RootDependency>,
}

impl SourceSpec {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            priority: 0,
            proxy: ProxySetting::Inherit,
            layout: None,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_layout(mut self, layout: LayoutKind) -> Self {
        self.layout = Some(layout);
        self
    }

    pub fn with_proxy(mut self, proxy: ProxySetting) -> Self {
        self.proxy = proxy;
        self
    }
}

impl VcsReference {
    /// Value to pass to a checkout, if any
    pub fn as_ref_name(&self) -> Option<&str> {
        match self {
            VcsReference::DefaultBranch => None,
            VcsReference::Branch(name) | VcsReference::Tag(name) | VcsReference::Rev(name) => {
                Some(name)
            },
        }
    }
}

impl fmt::Display for VcsReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VcsReference::DefaultBranch => f.write_str("default branch"),
            VcsReference::Branch(name) => write!(f, "branch {name}"),
            VcsReference::Tag(name) => write!(f, "tag {name}"),
            VcsReference::Rev(name) => write!(f, "rev {name}"),
        }
    }
}

impl RootDependency {
    /// Registry dependency in the `main` category
    pub fn registry(name: impl Into<String>, constraint: Constraint) -> Self {
        Self {
            name: name.into(),
            requirement: Requirement::Registry(constraint),
            categories: BTreeSet::from([Category::Main]),
        }
    }

    /// Repository dependency in the `main` category
    pub fn vcs(name: impl Into<String>, url: impl Into<String>, reference: VcsReference) -> Self {
        Self {
            name: name.into(),
            requirement: Requirement::Vcs {
                url: url.into(),
                reference,
            },
            categories: BTreeSet::from([Category::Main]),
        }
    }

    pub fn in_categories(mut self, categories: impl IntoIterator<Item = Category>) -> Self {
        self.categories = categories.into_iter().collect();
        self
    }

    /// Registry constraint, or `None` for repository dependencies
    pub fn constraint(&self) -> Option<&Constraint> {
        match &self.requirement {
            Requirement::Registry(constraint) => Some(constraint),
            Requirement::Vcs { .. } => None,
        }
    }
}

impl RootRequest {
    pub fn new(sources: Vec<SourceSpec>, dependencies: Vec<RootDependency>) -> Self {
        Self {
            sources,
            dependencies,
        }
    }

    pub fn dependency(&self, name: &str) -> Option<&RootDependency> {
        self.dependencies.iter().find(|dep| dep.name == name)
    }
}
