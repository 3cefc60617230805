//! The `burrow.toml` project file.
//!
//! A project file names the project, lists the package sources in the order
//! they are consulted and declares root dependencies in three categories:
//!
//! ```toml
//! [project]
//! name = "analysis"
//!
//! [[source]]
//! name = "internal"
//! url = "https://cran.internal/"
//! priority = 1
//! proxy = false
//!
//! [dependencies]
//! dplyr = ">= 1.0"
//! mypkg = { git = "https://git.example.com/mypkg.git", branch = "main" }
//!
//! [dev-dependencies]
//! testthat = "*"
//! ```
//!
//! Dependency tables keep their declaration order, which is the order the
//! resolver walks the roots in.

use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use burrow_core::error::BurrowError;
use burrow_core::types::{
    Category, Constraint, LayoutKind, ProxySetting, Requirement, RootDependency, RootRequest,
    SourceSpec, VcsReference,
};

use crate::ConfigResult;

/// File name of the project file
pub const PROJECT_FILE_NAME: &str = "burrow.toml";

/// Source used when a project declares none
pub const DEFAULT_SOURCE_NAME: &str = "CRAN";
pub const DEFAULT_SOURCE_URL: &str = "https://cloud.r-project.org/";

/// Parsed `burrow.toml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProjectFile {
    pub project: ProjectSection,

    #[serde(default, rename = "source", skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<SourceEntry>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub dependencies: IndexMap<String, DependencySpec>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub dev_dependencies: IndexMap<String, DependencySpec>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub doc_dependencies: IndexMap<String, DependencySpec>,
}

/// The `[project]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSection {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One `[[source]]` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceEntry {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub priority: i32,
    /// `false` disables proxies, a string names one, absent inherits
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<ProxyValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<LayoutKind>,
}

/// Raw `proxy` value of a source entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProxyValue {
    Enabled(bool),
    Url(String),
}

/// Dependency specification in a dependency table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DependencySpec {
    /// Version constraint string (e.g. ">= 1.0, < 2")
    Simple(String),
    /// Detailed dependency specification
    Detailed {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        version: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        git: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        branch: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tag: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rev: Option<String>,
    },
}

impl SourceEntry {
    pub fn to_spec(&self) -> SourceSpec {
        let proxy = match &self.proxy {
            None | Some(ProxyValue::Enabled(true)) => ProxySetting::Inherit,
            Some(ProxyValue::Enabled(false)) => ProxySetting::Disabled,
            Some(ProxyValue::Url(url)) => ProxySetting::Url(url.clone()),
        };
        SourceSpec {
            name: self.name.clone(),
            url: self.url.clone(),
            priority: self.priority,
            proxy,
            layout: self.layout,
        }
    }

    fn default_source() -> Self {
        Self {
            name: DEFAULT_SOURCE_NAME.to_string(),
            url: DEFAULT_SOURCE_URL.to_string(),
            priority: 0,
            proxy: None,
            layout: None,
        }
    }
}

impl DependencySpec {
    /// Turn the specification into a resolver requirement
    pub fn requirement(&self, field: &str) -> ConfigResult<Requirement> {
        match self {
            DependencySpec::Simple(text) => parse_constraint(field, text).map(Requirement::Registry),
            DependencySpec::Detailed {
                version,
                git,
                branch,
                tag,
                rev,
            } => {
                let refs = [branch.is_some(), tag.is_some(), rev.is_some()]
                    .iter()
                    .filter(|&&set| set)
                    .count();

                match (version, git) {
                    (Some(_), Some(_)) => Err(invalid(
                        field,
                        "can only specify one of 'version' or 'git'",
                    )),
                    (None, None) => Err(invalid(field, "must specify either 'version' or 'git'")),
                    (Some(text), None) => {
                        if refs > 0 {
                            return Err(invalid(
                                field,
                                "'branch', 'tag' and 'rev' are only valid with 'git'",
                            ));
                        }
                        parse_constraint(field, text).map(Requirement::Registry)
                    },
                    (None, Some(url)) => {
                        if url.trim().is_empty() {
                            return Err(invalid(field, "'git' must not be empty"));
                        }
                        if refs > 1 {
                            return Err(invalid(
                                field,
                                "can only specify one of 'branch', 'tag' or 'rev'",
                            ));
                        }
                        let reference = match (branch, tag, rev) {
                            (Some(name), _, _) => VcsReference::Branch(name.clone()),
                            (_, Some(name), _) => VcsReference::Tag(name.clone()),
                            (_, _, Some(name)) => VcsReference::Rev(name.clone()),
                            _ => VcsReference::DefaultBranch,
                        };
                        Ok(Requirement::Vcs {
                            url: url.clone(),
                            reference,
                        })
                    },
                }
            },
        }
    }

    /// Check if this is a git dependency
    pub fn is_git(&self) -> bool {
        matches!(self, DependencySpec::Detailed { git: Some(_), .. })
    }
}

impl ProjectFile {
    /// Parse and validate project file content
    pub fn parse(content: &str) -> ConfigResult<Self> {
        let project: ProjectFile = toml::from_str(content).map_err(|e| BurrowError::ProjectParse {
            message: e.to_string(),
        })?;
        project.validate()?;
        Ok(project)
    }

    /// Serialize back to TOML
    pub fn to_toml_string(&self) -> ConfigResult<String> {
        toml::to_string_pretty(self).map_err(|e| BurrowError::ProjectParse {
            message: format!("serialization failed: {e}"),
        })
    }

    /// Validate configuration completeness
    pub fn validate(&self) -> ConfigResult<()> {
        if self.project.name.trim().is_empty() {
            return Err(invalid("project.name", "is required"));
        }

        let mut seen = BTreeSet::new();
        for (index, source) in self.sources.iter().enumerate() {
            let field = format!("source[{index}]");
            if source.name.trim().is_empty() {
                return Err(invalid(&field, "name must not be empty"));
            }
            if !source.url.contains("://") {
                return Err(invalid(
                    &field,
                    &format!("url '{}' is not an absolute URL", source.url),
                ));
            }
            if !seen.insert(source.name.as_str()) {
                return Err(invalid(
                    &field,
                    &format!("source name '{}' is declared more than once", source.name),
                ));
            }
        }

        for (category, table) in self.tables() {
            for (name, spec) in table {
                let field = format!("{}.{name}", table_key(category));
                if !is_valid_package_name(name) {
                    return Err(invalid(
                        &field,
                        "package names start with a letter and contain only letters, digits and dots",
                    ));
                }
                spec.requirement(&field)?;
            }
        }

        // Category merging rejects a name declared with two requirements
        self.root_request().map(|_| ())
    }

    /// Sources in declaration order, or the default source when none are declared
    pub fn source_entries(&self) -> Vec<SourceEntry> {
        if self.sources.is_empty() {
            vec![SourceEntry::default_source()]
        } else {
            self.sources.clone()
        }
    }

    pub fn source_specs(&self) -> Vec<SourceSpec> {
        self.source_entries().iter().map(SourceEntry::to_spec).collect()
    }

    /// Build the resolver input.
    ///
    /// A package declared in several tables becomes one root carrying every
    /// category it appears in, positioned at its first declaration.
    pub fn root_request(&self) -> ConfigResult<RootRequest> {
        let mut roots: IndexMap<String, RootDependency> = IndexMap::new();

        for (category, table) in self.tables() {
            for (name, spec) in table {
                let field = format!("{}.{name}", table_key(category));
                let requirement = spec.requirement(&field)?;

                match roots.get_mut(name) {
                    Some(existing) if existing.requirement == requirement => {
                        existing.categories.insert(category);
                    },
                    Some(existing) => {
                        let earlier = existing
                            .categories
                            .iter()
                            .map(|c| table_key(*c))
                            .collect::<Vec<_>>()
                            .join(", ");
                        return Err(invalid(
                            &field,
                            &format!("conflicts with the declaration in {earlier}"),
                        ));
                    },
                    None => {
                        roots.insert(
                            name.clone(),
                            RootDependency {
                                name: name.clone(),
                                requirement,
                                categories: BTreeSet::from([category]),
                            },
                        );
                    },
                }
            }
        }

        Ok(RootRequest::new(self.source_specs(), roots.into_values().collect()))
    }

    /// Hash of the content a lock depends on.
    ///
    /// Sources and dependency tables are rendered as JSON with sorted keys,
    /// so reordering declarations does not change the hash while editing a
    /// constraint does.
    pub fn content_hash(&self) -> ConfigResult<String> {
        let mut content: BTreeMap<&str, serde_json::Value> = BTreeMap::new();
        content.insert("source", to_json(&self.source_entries())?);
        for (category, table) in self.tables() {
            if table.is_empty() {
                continue;
            }
            let sorted: BTreeMap<&String, &DependencySpec> = table.iter().collect();
            content.insert(table_key(category), to_json(&sorted)?);
        }

        let canonical = to_json(&content)?.to_string();
        Ok(hex::encode(Sha256::digest(canonical.as_bytes())))
    }

    fn tables(&self) -> [(Category, &IndexMap<String, DependencySpec>); 3] {
        [
            (Category::Main, &self.dependencies),
            (Category::Dev, &self.dev_dependencies),
            (Category::Doc, &self.doc_dependencies),
        ]
    }
}

/// Load and parse a project file
pub async fn load_from_file(path: &Utf8Path) -> ConfigResult<ProjectFile> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| BurrowError::io(format!("Failed to read {path}"), e))?;

    debug!("Loaded project file {}", path);
    ProjectFile::parse(&content).map_err(|e| match e {
        BurrowError::ProjectParse { message } => BurrowError::ProjectParse {
            message: format!("In file {path}: {message}"),
        },
        BurrowError::ConfigValidation { field, reason } => BurrowError::ConfigValidation {
            field,
            reason: format!("{reason} (in {path})"),
        },
        other => other,
    })
}

/// Find the project file in `start` or its nearest ancestor
pub fn find_project_file(start: &Utf8Path) -> Option<Utf8PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(PROJECT_FILE_NAME))
        .find(|candidate| candidate.is_file())
}

fn table_key(category: Category) -> &'static str {
    match category {
        Category::Main => "dependencies",
        Category::Dev => "dev-dependencies",
        Category::Doc => "doc-dependencies",
    }
}

fn parse_constraint(field: &str, text: &str) -> ConfigResult<Constraint> {
    Constraint::parse(text).map_err(|e| invalid(field, &e.to_string()))
}

fn to_json<T: Serialize>(value: &T) -> ConfigResult<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| BurrowError::ProjectParse {
        message: format!("cannot render project content: {e}"),
    })
}

fn invalid(field: &str, reason: &str) -> BurrowError {
    BurrowError::ConfigValidation {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

/// Check a package name: a letter, then letters, digits or dots, no trailing dot
fn is_valid_package_name(name: &str) -> bool {
    let mut chars = name.chars();
    let starts_with_letter = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
    starts_with_letter
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '.')
        && !name.ends_with('.')
}

#[cfg(test)]
mod tests;
