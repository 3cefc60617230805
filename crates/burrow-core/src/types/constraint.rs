//! Version constraints.
//!
//! A constraint is a conjunction of clauses such as `>= 1.2, < 2.0`. The
//! tilde operator and the wildcard are compiled away at parse time, so a
//! parsed constraint only ever holds the five plain comparison operators.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use super::version::{Version, VersionError};

/// Comparison operator of a single clause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Exact,     // == 1.0
    Greater,   // > 1.0
    GreaterEq, // >= 1.0
    Less,      // < 1.0
    LessEq,    // <= 1.0
}

/// One `op version` pair
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Clause {
    pub op: Op,
    pub version: Version,
}

/// Conjunction of clauses; no clauses means any version
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Constraint {
    clauses: Vec<Clause>,
}

impl Op {
    fn as_str(self) -> &'static str {
        match self {
            Op::Exact => "==",
            Op::Greater => ">",
            Op::GreaterEq => ">=",
            Op::Less => "<",
            Op::LessEq => "<=",
        }
    }
}

impl Clause {
    pub fn new(op: Op, version: Version) -> Self {
        Self { op, version }
    }

    /// Check whether a version satisfies this clause
    pub fn allows(&self, version: &Version) -> bool {
        match self.op {
            Op::Exact => version == &self.version,
            Op::Greater => version > &self.version,
            Op::GreaterEq => version >= &self.version,
            Op::Less => version < &self.version,
            Op::LessEq => version <= &self.version,
        }
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.op.as_str(), self.version)
    }
}

impl Constraint {
    /// The always-true constraint (`*`)
    pub fn any() -> Self {
        Self::default()
    }

    /// Constraint pinning one exact version
    pub fn exact(version: Version) -> Self {
        Self {
            clauses: vec![Clause::new(Op::Exact, version)],
        }
    }

    /// Parse a constraint string
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let trimmed = input.trim();
        let mut constraint = Constraint::any();
        if trimmed.is_empty() {
            return Ok(constraint);
        }

        for part in trimmed.split(',') {
            let part = part.trim();
            if part.is_empty() {
                return Err(malformed(input, "empty clause"));
            }
            if part == "*" {
                continue;
            }

            let (op, rest) = split_operator(part);
            let version = Version::parse(rest).map_err(|e| match e {
                VersionError::MalformedVersion { reason, .. } => malformed(input, &reason),
                other => other,
            })?;

            match op {
                Some(op) => constraint.push(Clause::new(op, version)),
                None => {
                    let upper = tilde_upper_bound(&version);
                    constraint.push(Clause::new(Op::GreaterEq, version));
                    constraint.push(Clause::new(Op::Less, upper));
                },
            }
        }

        Ok(constraint)
    }

    /// Check if a version satisfies every clause
    pub fn allows(&self, version: &Version) -> bool {
        self.clauses.iter().all(|clause| clause.allows(version))
    }

    /// Check if this constraint accepts every version
    pub fn is_any(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// Conjunction of two constraints, dropping duplicate clauses
    pub fn intersect(&self, other: &Constraint) -> Constraint {
        let mut merged = self.clone();
        for clause in &other.clauses {
            merged.push(clause.clone());
        }
        merged
    }

    fn push(&mut self, clause: Clause) {
        if !self.clauses.contains(&clause) {
            self.clauses.push(clause);
        }
    }
}

fn malformed(input: &str, reason: &str) -> VersionError {
    VersionError::MalformedConstraint {
        input: input.to_string(),
        reason: reason.to_string(),
    }
}

/// Split the operator prefix; `None` stands for the tilde operator.
fn split_operator(part: &str) -> (Option<Op>, &str) {
    const OPERATORS: [(&str, Option<Op>); 8] = [
        (">=", Some(Op::GreaterEq)),
        ("<=", Some(Op::LessEq)),
        ("==", Some(Op::Exact)),
        ("~=", None),
        ("=", Some(Op::Exact)),
        (">", Some(Op::Greater)),
        ("<", Some(Op::Less)),
        ("~", None),
    ];

    for (prefix, op) in OPERATORS {
        if let Some(rest) = part.strip_prefix(prefix) {
            return (op, rest.trim_start());
        }
    }
    (Some(Op::Exact), part)
}

/// Exclusive upper bound of `~version`: drop the last given component and
/// bump the one before it (`~1.2.3` -> `1.3.0`, `~1.2` -> `2.0.0`). A single
/// component bumps itself (`~1` -> `2.0.0`).
fn tilde_upper_bound(version: &Version) -> Version {
    let given = version.components();
    let mut bumped: Vec<u64> = if given.len() > 1 {
        given[..given.len() - 1].to_vec()
    } else {
        given.to_vec()
    };
    if let Some(last) = bumped.last_mut() {
        *last = last.saturating_add(1);
    }
    while bumped.len() < 3 {
        bumped.push(0);
    }
    Version::from_components(bumped)
}

impl FromStr for Constraint {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Constraint::parse(s)
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.clauses.is_empty() {
            return f.write_str("*");
        }
        for (i, clause) in self.clauses.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", clause)?;
        }
        Ok(())
    }
}

impl Serialize for Constraint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Constraint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Constraint::parse(&text).map_err(serde::de::Error::custom)
    }
}
