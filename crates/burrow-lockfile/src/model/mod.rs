//! Lock file data model and its TOML form.
//!
//! ```toml
//! [metadata]
//! version = 2
//! conservative = false
//!
//! [[source]]
//! name = "cran"
//! url = "https://cloud.r-project.org"
//! priority = 0
//!
//! [[root]]
//! name = "dplyr"
//! constraint = ">= 1.0"
//! categories = ["main"]
//!
//! [[package]]
//! name = "dplyr"
//! version = "1.1.4"
//! origin = "source"
//! source = "cran"
//! path = "src/contrib/dplyr_1.1.4.tar.gz"
//! fingerprint = "sha256:..."
//! categories = ["main"]
//! dependencies = ["R", "cli"]
//! ```
//!
//! Serialization is deterministic: packages and roots are sorted by name and
//! every list is sorted, so identical locks render to identical bytes.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

use burrow_core::types::{
    Category, Constraint, Requirement, RootDependency, RootRequest, SourceSpec, VcsReference,
    Version,
};

use crate::{LockError, LockResult};

/// Current lock format version
pub const LOCK_FORMAT_VERSION: u32 = 2;

/// A complete lock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lock {
    pub metadata: LockMetadata,
    /// Sources in declaration order
    pub sources: Vec<LockedSource>,
    /// Root dependencies the lock was produced for, sorted by name
    pub roots: Vec<LockedRoot>,
    pub(crate) packages: Vec<LockedPackage>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockMetadata {
    pub version: u32,
    /// Whether the lock was produced preferring a previous lock's versions
    pub conservative: bool,
    /// Digest of the project file the lock was produced from
    pub content_hash: Option<String>,
}

/// Snapshot of one declared source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedSource {
    pub name: String,
    pub url: String,
    pub priority: i32,
}

/// Snapshot of one root dependency
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockedRoot {
    pub name: String,
    pub requirement: Requirement,
    pub categories: BTreeSet<Category>,
}

/// Where a locked package comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageOrigin {
    /// An archive offered by a declared source
    Source { source: String, path: String },
    /// A version-control checkout
    Vcs {
        url: String,
        reference: VcsReference,
        commit: String,
    },
    /// Bundled with the runtime
    Core,
}

/// One pinned package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockedPackage {
    pub name: String,
    /// Set for source packages; repository packages are pinned by commit
    pub version: Option<Version>,
    pub origin: PackageOrigin,
    pub fingerprint: Option<String>,
    /// Runtime version constraint declared by the package
    pub runtime: Option<Constraint>,
    pub categories: BTreeSet<Category>,
    /// Names of direct dependencies
    pub dependencies: BTreeSet<String>,
}

impl From<&SourceSpec> for LockedSource {
    fn from(spec: &SourceSpec) -> Self {
        Self {
            name: spec.name.clone(),
            url: spec.url.clone(),
            priority: spec.priority,
        }
    }
}

impl From<&RootDependency> for LockedRoot {
    fn from(dep: &RootDependency) -> Self {
        Self {
            name: dep.name.clone(),
            requirement: dep.requirement.clone(),
            categories: dep.categories.clone(),
        }
    }
}

impl LockedPackage {
    fn with_origin(name: impl Into<String>, version: Option<Version>, origin: PackageOrigin) -> Self {
        Self {
            name: name.into(),
            version,
            origin,
            fingerprint: None,
            runtime: None,
            categories: BTreeSet::new(),
            dependencies: BTreeSet::new(),
        }
    }

    /// Package from a declared source
    pub fn from_source(name: impl Into<String>, version: Version, source: &str, path: &str) -> Self {
        Self::with_origin(
            name,
            Some(version),
            PackageOrigin::Source {
                source: source.to_string(),
                path: path.to_string(),
            },
        )
    }

    /// Package checked out from a repository
    pub fn from_vcs(name: impl Into<String>, url: &str, reference: VcsReference, commit: &str) -> Self {
        Self::with_origin(
            name,
            None,
            PackageOrigin::Vcs {
                url: url.to_string(),
                reference,
                commit: commit.to_string(),
            },
        )
    }

    /// Package bundled with the runtime
    pub fn core(name: impl Into<String>, version: Option<Version>) -> Self {
        Self::with_origin(name, version, PackageOrigin::Core)
    }

    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_categories(mut self, categories: impl IntoIterator<Item = Category>) -> Self {
        self.categories = categories.into_iter().collect();
        self
    }

    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.fingerprint = Some(fingerprint.into());
        self
    }

    pub fn with_runtime(mut self, runtime: Option<Constraint>) -> Self {
        self.runtime = runtime;
        self
    }

    pub fn is_core(&self) -> bool {
        self.origin == PackageOrigin::Core
    }

    /// Source name for source packages
    pub fn source(&self) -> Option<&str> {
        match &self.origin {
            PackageOrigin::Source { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl Lock {
    /// Build a lock for `request` from resolved packages
    pub fn new(request: &RootRequest, packages: Vec<LockedPackage>, conservative: bool) -> Self {
        let mut roots: Vec<LockedRoot> = request.dependencies.iter().map(LockedRoot::from).collect();
        roots.sort_by(|a, b| a.name.cmp(&b.name));
        let mut packages = packages;
        packages.sort_by(|a, b| a.name.cmp(&b.name));

        Self {
            metadata: LockMetadata {
                version: LOCK_FORMAT_VERSION,
                conservative,
                content_hash: None,
            },
            sources: request.sources.iter().map(LockedSource::from).collect(),
            roots,
            packages,
        }
    }

    /// Record the digest of the project file
    pub fn with_content_hash(mut self, content_hash: impl Into<String>) -> Self {
        self.metadata.content_hash = Some(content_hash.into());
        self
    }

    /// Packages sorted by name
    pub fn packages(&self) -> &[LockedPackage] {
        &self.packages
    }

    pub fn package(&self, name: &str) -> Option<&LockedPackage> {
        self.packages
            .binary_search_by(|p| p.name.as_str().cmp(name))
            .ok()
            .map(|index| &self.packages[index])
    }

    /// Render the lock as TOML
    pub fn to_toml_string(&self) -> LockResult<String> {
        let raw = RawLock {
            metadata: RawMetadata {
                version: self.metadata.version,
                conservative: self.metadata.conservative,
                content_hash: self.metadata.content_hash.clone(),
            },
            sources: self.sources.clone(),
            roots: self.roots.iter().map(RawRoot::from).collect(),
            packages: self.packages.iter().map(RawPackage::from).collect(),
        };
        toml::to_string(&raw).map_err(|e| LockError::malformed(format!("cannot serialize lock: {e}")))
    }

    /// Parse a lock from TOML
    pub fn from_toml_str(text: &str) -> LockResult<Lock> {
        let raw: RawLock = toml::from_str(text).map_err(|e| LockError::malformed(e.to_string()))?;
        if raw.metadata.version != LOCK_FORMAT_VERSION {
            return Err(LockError::UnsupportedVersion {
                found: raw.metadata.version,
                expected: LOCK_FORMAT_VERSION,
            });
        }

        let mut roots = raw
            .roots
            .into_iter()
            .map(LockedRoot::try_from)
            .collect::<LockResult<Vec<_>>>()?;
        roots.sort_by(|a, b| a.name.cmp(&b.name));

        let mut packages = raw
            .packages
            .into_iter()
            .map(LockedPackage::try_from)
            .collect::<LockResult<Vec<_>>>()?;
        packages.sort_by(|a, b| a.name.cmp(&b.name));

        let mut seen = HashSet::new();
        for package in &packages {
            if !seen.insert(package.name.as_str()) {
                return Err(LockError::malformed(format!(
                    "package '{}' is locked more than once",
                    package.name
                )));
            }
        }

        Ok(Lock {
            metadata: LockMetadata {
                version: raw.metadata.version,
                conservative: raw.metadata.conservative,
                content_hash: raw.metadata.content_hash,
            },
            sources: raw.sources,
            roots,
            packages,
        })
    }
}

// TOML shapes. Optional fields are skipped when empty so the rendered file
// only carries what each entry needs.

#[derive(Serialize, Deserialize)]
struct RawLock {
    metadata: RawMetadata,
    #[serde(default, rename = "source")]
    sources: Vec<LockedSource>,
    #[serde(default, rename = "root")]
    roots: Vec<RawRoot>,
    #[serde(default, rename = "package")]
    packages: Vec<RawPackage>,
}

#[derive(Serialize, Deserialize)]
struct RawMetadata {
    version: u32,
    #[serde(default)]
    conservative: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content_hash: Option<String>,
}

#[derive(Default)]
struct RawReference {
    branch: Option<String>,
    tag: Option<String>,
    rev: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct RawRoot {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    constraint: Option<Constraint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    git: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rev: Option<String>,
    #[serde(default)]
    categories: Vec<Category>,
}

#[derive(Serialize, Deserialize)]
struct RawPackage {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    version: Option<Version>,
    origin: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    git: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rev: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    commit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fingerprint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    runtime: Option<Constraint>,
    #[serde(default)]
    categories: Vec<Category>,
    #[serde(default)]
    dependencies: Vec<String>,
}

impl From<&VcsReference> for RawReference {
    fn from(reference: &VcsReference) -> Self {
        let mut raw = RawReference::default();
        match reference {
            VcsReference::DefaultBranch => {},
            VcsReference::Branch(name) => raw.branch = Some(name.clone()),
            VcsReference::Tag(name) => raw.tag = Some(name.clone()),
            VcsReference::Rev(name) => raw.rev = Some(name.clone()),
        }
        raw
    }
}

impl RawReference {
    fn into_reference(self, owner: &str) -> LockResult<VcsReference> {
        match (self.branch, self.tag, self.rev) {
            (None, None, None) => Ok(VcsReference::DefaultBranch),
            (Some(branch), None, None) => Ok(VcsReference::Branch(branch)),
            (None, Some(tag), None) => Ok(VcsReference::Tag(tag)),
            (None, None, Some(rev)) => Ok(VcsReference::Rev(rev)),
            _ => Err(LockError::malformed(format!(
                "'{owner}' names more than one of branch, tag and rev"
            ))),
        }
    }
}

impl From<&LockedRoot> for RawRoot {
    fn from(root: &LockedRoot) -> Self {
        let (constraint, git, reference) = match &root.requirement {
            Requirement::Registry(constraint) => (Some(constraint.clone()), None, RawReference::default()),
            Requirement::Vcs { url, reference } => (None, Some(url.clone()), reference.into()),
        };
        Self {
            name: root.name.clone(),
            constraint,
            git,
            branch: reference.branch,
            tag: reference.tag,
            rev: reference.rev,
            categories: root.categories.iter().copied().collect(),
        }
    }
}

impl TryFrom<RawRoot> for LockedRoot {
    type Error = LockError;

    fn try_from(raw: RawRoot) -> LockResult<Self> {
        let requirement = match (raw.constraint, raw.git) {
            (Some(constraint), None) => Requirement::Registry(constraint),
            (None, Some(url)) => Requirement::Vcs {
                url,
                reference: RawReference {
                    branch: raw.branch,
                    tag: raw.tag,
                    rev: raw.rev,
                }
                .into_reference(&raw.name)?,
            },
            _ => {
                return Err(LockError::malformed(format!(
                    "root '{}' needs exactly one of constraint or git",
                    raw.name
                )))
            },
        };
        Ok(Self {
            name: raw.name,
            requirement,
            categories: raw.categories.into_iter().collect(),
        })
    }
}

impl From<&LockedPackage> for RawPackage {
    fn from(package: &LockedPackage) -> Self {
        let mut raw = RawPackage {
            name: package.name.clone(),
            version: package.version.clone(),
            origin: String::new(),
            source: None,
            path: None,
            git: None,
            branch: None,
            tag: None,
            rev: None,
            commit: None,
            fingerprint: package.fingerprint.clone(),
            runtime: package.runtime.clone(),
            categories: package.categories.iter().copied().collect(),
            dependencies: package.dependencies.iter().cloned().collect(),
        };
        match &package.origin {
            PackageOrigin::Source { source, path } => {
                raw.origin = "source".to_string();
                raw.source = Some(source.clone());
                raw.path = Some(path.clone());
            },
            PackageOrigin::Vcs {
                url,
                reference,
                commit,
            } => {
                raw.origin = "vcs".to_string();
                let reference = RawReference::from(reference);
                raw.git = Some(url.clone());
                raw.branch = reference.branch;
                raw.tag = reference.tag;
                raw.rev = reference.rev;
                raw.commit = Some(commit.clone());
            },
            PackageOrigin::Core => raw.origin = "core".to_string(),
        }
        raw
    }
}

impl TryFrom<RawPackage> for LockedPackage {
    type Error = LockError;

    fn try_from(raw: RawPackage) -> LockResult<Self> {
        let missing = |field: &str| {
            LockError::malformed(format!("package '{}' is missing '{}'", raw.name, field))
        };

        let origin = match raw.origin.as_str() {
            "source" => PackageOrigin::Source {
                source: raw.source.clone().ok_or_else(|| missing("source"))?,
                path: raw.path.clone().ok_or_else(|| missing("path"))?,
            },
            "vcs" => PackageOrigin::Vcs {
                url: raw.git.clone().ok_or_else(|| missing("git"))?,
                reference: RawReference {
                    branch: raw.branch.clone(),
                    tag: raw.tag.clone(),
                    rev: raw.rev.clone(),
                }
                .into_reference(&raw.name)?,
                commit: raw.commit.clone().ok_or_else(|| missing("commit"))?,
            },
            "core" => PackageOrigin::Core,
            other => {
                return Err(LockError::malformed(format!(
                    "package '{}' has unknown origin '{}'",
                    raw.name, other
                )))
            },
        };
        if matches!(origin, PackageOrigin::Source { .. }) && raw.version.is_none() {
            return Err(missing("version"));
        }

        Ok(Self {
            name: raw.name,
            version: raw.version,
            origin,
            fingerprint: raw.fingerprint,
            runtime: raw.runtime,
            categories: raw.categories.into_iter().collect(),
            dependencies: raw.dependencies.into_iter().collect(),
        })
    }
}

#[cfg(test)]
mod tests;
