//! Package descriptor records.
//!
//! Every package archive carries a plain-text `DESCRIPTION` record of
//! `Key: value` lines. This module turns one into a [`Descriptor`]: the
//! package identity, its runtime dependencies and the free-text fields kept
//! for display.

mod parse;

use std::collections::BTreeMap;
use thiserror::Error;

use crate::types::{Constraint, Dependency, Version, VersionError, RUNTIME_PACKAGE};

/// Parsed package descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    pub name: String,
    pub version: Version,
    /// Dependencies in order of first appearance, runtime pseudo-package included
    pub dependencies: Vec<Dependency>,
    fields: BTreeMap<String, String>,
}

/// Structural errors in a descriptor record
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("descriptor is empty")]
    Empty,

    #[error("line {line}: expected 'Key: value', found '{content}'")]
    MissingColon { line: usize, content: String },

    #[error("line {line}: continuation line before any field")]
    OrphanContinuation { line: usize },

    #[error("missing required field '{field}'")]
    MissingField { field: &'static str },

    #[error("invalid version: {0}")]
    InvalidVersion(#[source] VersionError),

    #[error("invalid dependency entry '{entry}' in {field}: {reason}")]
    InvalidDependency {
        field: String,
        entry: String,
        reason: String,
    },
}

impl Descriptor {
    /// Parse a descriptor record
    pub fn parse(text: &str) -> Result<Self, DescriptorError> {
        parse::parse(text)
    }

    /// Look up a raw field value by case-insensitive key
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(&key.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn title(&self) -> Option<&str> {
        self.field("title")
    }

    pub fn description(&self) -> Option<&str> {
        self.field("description")
    }

    /// Dependencies the resolver walks (runtime pseudo-package included)
    pub fn requirements(&self) -> impl Iterator<Item = &Dependency> {
        self.dependencies.iter().filter(|dep| dep.is_required())
    }

    /// Constraint on the runtime version, if the record declares one
    pub fn runtime_constraint(&self) -> Option<&Constraint> {
        self.dependencies
            .iter()
            .find(|dep| dep.name == RUNTIME_PACKAGE)
            .map(|dep| &dep.constraint)
    }
}
