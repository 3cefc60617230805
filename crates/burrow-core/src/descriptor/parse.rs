//! Line-oriented parser for descriptor records.

use std::collections::BTreeMap;

use super::{Descriptor, DescriptorError};
use crate::types::{Constraint, Dependency, DependencyKind, Version};

/// Keys whose values list runtime dependencies
const REQUIRES_KEYS: [&str; 3] = ["depends", "imports", "linkingto"];
const SUGGESTS_KEY: &str = "suggests";

pub(super) fn parse(text: &str) -> Result<Descriptor, DescriptorError> {
    if text.trim().is_empty() {
        return Err(DescriptorError::Empty);
    }

    let fields = collect_fields(text)?;

    let name = fields
        .get("package")
        .filter(|value| !value.is_empty())
        .cloned()
        .ok_or(DescriptorError::MissingField { field: "Package" })?;
    let version = fields
        .get("version")
        .filter(|value| !value.is_empty())
        .ok_or(DescriptorError::MissingField { field: "Version" })
        .and_then(|value| Version::parse(value).map_err(DescriptorError::InvalidVersion))?;

    let mut dependencies: Vec<Dependency> = Vec::new();
    let sections = REQUIRES_KEYS
        .iter()
        .map(|key| (*key, DependencyKind::Requires))
        .chain(std::iter::once((SUGGESTS_KEY, DependencyKind::Suggests)));

    for (key, kind) in sections {
        let Some(value) = fields.get(key) else {
            continue;
        };
        for (dep_name, constraint) in parse_dependency_list(key, value)? {
            match dependencies.iter_mut().find(|dep| dep.name == dep_name) {
                Some(existing) => {
                    existing.constraint = existing.constraint.intersect(&constraint);
                    existing.kind = existing.kind.min(kind);
                },
                None => dependencies.push(Dependency {
                    name: dep_name,
                    constraint,
                    kind,
                }),
            }
        }
    }

    Ok(Descriptor {
        name,
        version,
        dependencies,
        fields,
    })
}

/// Collect `Key: value` pairs keyed by lowercased key. Continuation lines
/// join the previous value with one space; dependency keys fold repeated
/// occurrences together while other keys keep their first value.
fn collect_fields(text: &str) -> Result<BTreeMap<String, String>, DescriptorError> {
    let mut entries: Vec<(String, String)> = Vec::new();

    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim_end();
        if line.trim().is_empty() {
            continue;
        }

        if raw.starts_with(char::is_whitespace) {
            let Some((_, value)) = entries.last_mut() else {
                return Err(DescriptorError::OrphanContinuation { line: index + 1 });
            };
            if !value.is_empty() {
                value.push(' ');
            }
            value.push_str(line.trim_start());
            continue;
        }

        match line.split_once(':') {
            Some((key, value)) if !key.trim().is_empty() => {
                entries.push((key.trim().to_ascii_lowercase(), value.trim().to_string()));
            },
            _ => {
                return Err(DescriptorError::MissingColon {
                    line: index + 1,
                    content: line.to_string(),
                })
            },
        }
    }

    let mut fields: BTreeMap<String, String> = BTreeMap::new();
    for (key, value) in entries {
        let is_dependency_key = key == SUGGESTS_KEY || REQUIRES_KEYS.contains(&key.as_str());
        match fields.get_mut(&key) {
            Some(existing) if is_dependency_key => {
                if !value.is_empty() {
                    if !existing.is_empty() {
                        existing.push_str(", ");
                    }
                    existing.push_str(&value);
                }
            },
            Some(_) => {},
            None => {
                fields.insert(key, value);
            },
        }
    }
    Ok(fields)
}

/// Split a dependency field into `(name, constraint)` pairs. Commas inside
/// parentheses belong to the constraint, not the list.
fn parse_dependency_list(
    field: &str,
    value: &str,
) -> Result<Vec<(String, Constraint)>, DescriptorError> {
    let mut entries = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, ch) in value.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                entries.push(&value[start..i]);
                start = i + 1;
            },
            _ => {},
        }
    }
    entries.push(&value[start..]);

    entries
        .into_iter()
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| parse_dependency_entry(field, entry))
        .collect()
}

fn parse_dependency_entry(field: &str, entry: &str) -> Result<(String, Constraint), DescriptorError> {
    let invalid = |reason: &str| DescriptorError::InvalidDependency {
        field: field.to_string(),
        entry: entry.to_string(),
        reason: reason.to_string(),
    };

    let (name, constraint) = match entry.find('(') {
        Some(open) => {
            let rest = &entry[open + 1..];
            let close = rest.rfind(')').ok_or_else(|| invalid("unclosed parenthesis"))?;
            if !rest[close + 1..].trim().is_empty() {
                return Err(invalid("unexpected text after constraint"));
            }
            let constraint = Constraint::parse(&rest[..close])
                .map_err(|e| invalid(&e.to_string()))?;
            (entry[..open].trim(), constraint)
        },
        None => (entry, Constraint::any()),
    };

    let valid_name = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_');
    if !valid_name {
        return Err(invalid("invalid package name"));
    }

    Ok((name.to_string(), constraint))
}
