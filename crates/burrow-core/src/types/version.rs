//! Package version numbers.
//!
//! Versions in this ecosystem are dot- or dash-separated numeric components
//! (`1.2.3`, `0.9-14`, `2.0`) with an optional trailing pre-release tag. The
//! original text is preserved for display, so `1.2-3` prints as written.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use thiserror::Error;

/// Package version: numeric components plus an optional pre-release tag
#[derive(Debug, Clone)]
pub struct Version {
    components: Vec<u64>,
    prerelease: Option<String>,
    text: String,
}

/// Version and constraint parsing errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("Malformed version '{input}': {reason}")]
    MalformedVersion { input: String, reason: String },

    #[error("Malformed constraint '{input}': {reason}")]
    MalformedConstraint { input: String, reason: String },
}

impl VersionError {
    fn version(input: &str, reason: impl Into<String>) -> Self {
        VersionError::MalformedVersion {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

impl Version {
    /// Parse a version string
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        input.parse()
    }

    /// Build a version from numeric components, rendered dot-separated
    pub fn from_components(components: Vec<u64>) -> Self {
        let text = components
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(".");
        Self {
            components,
            prerelease: None,
            text,
        }
    }

    /// Numeric components as written (no implicit trailing zeros)
    pub fn components(&self) -> &[u64] {
        &self.components
    }

    /// Pre-release tag, if any
    pub fn prerelease(&self) -> Option<&str> {
        self.prerelease.as_deref()
    }

    /// Check if this is a prerelease version
    pub fn is_prerelease(&self) -> bool {
        self.prerelease.is_some()
    }

    /// Original text of the version
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Components with trailing zeros removed; `2`, `2.0` and `2.0.0` share one key
    fn significant(&self) -> &[u64] {
        let end = self
            .components
            .iter()
            .rposition(|&c| c != 0)
            .map_or(0, |i| i + 1);
        &self.components[..end]
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        if input.is_empty() {
            return Err(VersionError::version(s, "empty version"));
        }

        let mut components = Vec::new();
        let mut prerelease = None;
        let mut offset = 0;

        for token in input.split(['.', '-']) {
            if token.is_empty() {
                return Err(VersionError::version(input, "empty component"));
            }
            if token.bytes().all(|b| b.is_ascii_digit()) {
                let value = token
                    .parse::<u64>()
                    .map_err(|_| VersionError::version(input, "numeric component overflows"))?;
                components.push(value);
                offset += token.len() + 1;
                continue;
            }

            // The first non-numeric component starts the pre-release tag
            if components.is_empty() {
                return Err(VersionError::version(input, "no leading numeric component"));
            }
            let tag = &input[offset..];
            if !tag
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_')
            {
                return Err(VersionError::version(input, "invalid pre-release tag"));
            }
            prerelease = Some(tag.to_string());
            break;
        }

        Ok(Version {
            components,
            prerelease,
            text: input.to_string(),
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.significant().hash(state);
        self.prerelease.hash(state);
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.components.len().max(other.components.len());
        for i in 0..len {
            let a = self.components.get(i).copied().unwrap_or(0);
            let b = other.components.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }

        match (&self.prerelease, &other.prerelease) {
            (None, None) => Ordering::Equal,
            (Some(_), None) => Ordering::Less, // prerelease < normal
            (None, Some(_)) => Ordering::Greater, // normal > prerelease
            (Some(a), Some(b)) => a.cmp(b),    // lexical comparison
        }
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.text)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn version_text() -> impl Strategy<Value = String> {
        (
            prop::collection::vec(0u64..50, 1..5),
            prop::option::of("[a-z]{1,4}[0-9]?"),
        )
            .prop_map(|(components, pre)| {
                let mut text = components
                    .iter()
                    .map(u64::to_string)
                    .collect::<Vec<_>>()
                    .join(".");
                if let Some(pre) = pre {
                    text.push('-');
                    text.push_str(&pre);
                }
                text
            })
    }

    proptest! {
        #[test]
        fn version_text_round_trip(text in version_text()) {
            let parsed = Version::parse(&text).unwrap();
            prop_assert_eq!(parsed.to_string(), text);
        }

        #[test]
        fn version_ordering_is_total(a in version_text(), b in version_text()) {
            let a = Version::parse(&a).unwrap();
            let b = Version::parse(&b).unwrap();
            prop_assert_eq!(a.cmp(&b), b.cmp(&a).reverse());
            prop_assert_eq!(a == b, a.cmp(&b) == Ordering::Equal);
        }

        #[test]
        fn version_comparison_transitivity(
            a in version_text(),
            b in version_text(),
            c in version_text(),
        ) {
            let a = Version::parse(&a).unwrap();
            let b = Version::parse(&b).unwrap();
            let c = Version::parse(&c).unwrap();

            if a < b && b < c {
                prop_assert!(a < c, "Transitivity violated: {} < {} < {} but {} >= {}", a, b, c, a, c);
            }
        }

        #[test]
        fn parse_never_panics(input in ".{0,16}") {
            let _ = Version::parse(&input);
        }
    }
}
