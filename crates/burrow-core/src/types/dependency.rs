//! Dependency specification types.
//!
//! Defines the edges of the package graph as read from descriptor records
//! and project files, plus the categories a project groups them under.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::Constraint;

/// Reserved pseudo-package carrying the runtime version constraint
pub const RUNTIME_PACKAGE: &str = "R";

/// Dependency specification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub name: String,
    pub constraint: Constraint,
    pub kind: DependencyKind,
}

/// Type of dependency
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DependencyKind {
    /// Needed at run time; walked by the resolver
    Requires,
    /// Suggested only; recorded but never walked
    Suggests,
}

/// Project-level grouping of root dependencies
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Main,
    Dev,
    Doc,
}

impl Dependency {
    /// Create a runtime dependency
    pub fn new(name: impl Into<String>, constraint: Constraint) -> Self {
        Self {
            name: name.into(),
            constraint,
            kind: DependencyKind::Requires,
        }
    }

    /// Create a suggested dependency
    pub fn suggested(name: impl Into<String>, constraint: Constraint) -> Self {
        Self {
            name: name.into(),
            constraint,
            kind: DependencyKind::Suggests,
        }
    }

    /// Check if the resolver should walk this edge
    pub fn is_required(&self) -> bool {
        self.kind == DependencyKind::Requires
    }

    /// Check if this names the runtime pseudo-package
    pub fn is_runtime(&self) -> bool {
        self.name == RUNTIME_PACKAGE
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.constraint.is_any() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{} ({})", self.name, self.constraint)
        }
    }
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Main, Category::Dev, Category::Doc];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Main => "main",
            Category::Dev => "dev",
            Category::Doc => "doc",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "main" => Ok(Category::Main),
            "dev" => Ok(Category::Dev),
            "doc" => Ok(Category::Doc),
            other => Err(format!("unknown category '{other}' (expected main, dev or doc)")),
        }
    }
}
