//! Resolved dependency graph using petgraph
//!
//! Built once a walk completes: one node per bound package name, one edge
//! per declared dependency. Used to re-check the result for cycles and to
//! find everything reachable from a root.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Bfs, EdgeRef};
use std::collections::{BTreeSet, HashMap, HashSet};

use burrow_core::types::Constraint;

/// Node in the dependency graph representing a bound package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageNode {
    pub name: String,
    /// Version label (a version, a repository reference or `core`)
    pub label: String,
}

/// Dependency graph keyed by package name
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// Edges point from a package to its dependencies
    graph: DiGraph<PackageNode, Constraint>,
    /// Map from package name to NodeIndex for fast lookups
    node_map: HashMap<String, NodeIndex>,
}

impl DependencyGraph {
    /// Create a new empty dependency graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a package node, returning the existing index for a known name
    pub fn add_package(&mut self, package: PackageNode) -> NodeIndex {
        if let Some(existing) = self.node_map.get(&package.name) {
            return *existing;
        }
        let name = package.name.clone();
        let index = self.graph.add_node(package);
        self.node_map.insert(name, index);
        index
    }

    /// Add dependency edge between two known packages
    pub fn add_dependency(&mut self, from: &str, to: &str, constraint: Constraint) -> Result<(), String> {
        let from_index = *self
            .node_map
            .get(from)
            .ok_or_else(|| format!("Package not found: {from}"))?;
        let to_index = *self
            .node_map
            .get(to)
            .ok_or_else(|| format!("Package not found: {to}"))?;
        self.graph.add_edge(from_index, to_index, constraint);
        Ok(())
    }

    /// Names reachable from `name`, itself included
    pub fn reachable_from(&self, name: &str) -> BTreeSet<String> {
        let Some(start) = self.node_map.get(name) else {
            return BTreeSet::new();
        };
        let mut reachable = BTreeSet::new();
        let mut bfs = Bfs::new(&self.graph, *start);
        while let Some(index) = bfs.next(&self.graph) {
            if let Some(node) = self.graph.node_weight(index) {
                reachable.insert(node.name.clone());
            }
        }
        reachable
    }

    /// Detect cycles in the dependency graph
    pub fn detect_cycles(&self) -> Result<(), Vec<String>> {
        use petgraph::algo::toposort;

        match toposort(&self.graph, None) {
            Ok(_) => Ok(()),
            Err(cycle_node) => Err(self.extract_cycle_path(cycle_node.node_id())),
        }
    }

    /// Walk dependency edges from a node known to sit on a cycle until a
    /// node repeats; the closed path from that node is the cycle
    fn extract_cycle_path(&self, start_node: NodeIndex) -> Vec<String> {
        let mut visited = HashSet::new();
        let mut path: Vec<NodeIndex> = Vec::new();
        let mut current = start_node;

        loop {
            if !visited.insert(current) {
                let cycle_start = path.iter().position(|index| *index == current).unwrap_or(0);
                let mut cycle: Vec<String> = path[cycle_start..]
                    .iter()
                    .filter_map(|index| self.graph.node_weight(*index))
                    .map(|node| node.name.clone())
                    .collect();
                if let Some(node) = self.graph.node_weight(current) {
                    cycle.push(node.name.clone());
                }
                return cycle;
            }
            path.push(current);

            // Prefer an edge that stays on a cycle
            let next = self
                .graph
                .edges(current)
                .map(|edge| edge.target())
                .find(|target| petgraph::algo::has_path_connecting(&self.graph, *target, current, None));
            match next {
                Some(target) => current = target,
                None => break,
            }
        }

        path.iter()
            .filter_map(|index| self.graph.node_weight(*index))
            .map(|node| node.name.clone())
            .collect()
    }

    /// Format a closed cycle path as "a -> b -> c -> a"
    pub fn format_cycle(cycle: &[String]) -> String {
        if cycle.is_empty() {
            return "No cycle".to_string();
        }
        cycle.join(" -> ")
    }
}

impl PackageNode {
    pub fn new(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(edges: &[(&str, &str)]) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for (from, to) in edges {
            graph.add_package(PackageNode::new(*from, "1.0"));
            graph.add_package(PackageNode::new(*to, "1.0"));
        }
        for (from, to) in edges {
            graph.add_dependency(from, to, Constraint::any()).unwrap();
        }
        graph
    }

    #[test]
    fn test_add_package_is_idempotent() {
        let mut graph = DependencyGraph::new();
        let first = graph.add_package(PackageNode::new("dplyr", "1.1.4"));
        let second = graph.add_package(PackageNode::new("dplyr", "1.1.4"));
        assert_eq!(first, second);
        assert_eq!(graph.reachable_from("dplyr").len(), 1);
    }

    #[test]
    fn test_add_dependency_missing_package() {
        let mut graph = DependencyGraph::new();
        graph.add_package(PackageNode::new("app", "1.0"));
        let result = graph.add_dependency("app", "ghost", Constraint::any());
        assert!(result.unwrap_err().contains("Package not found"));
        assert_eq!(graph.reachable_from("app").len(), 1);
    }

    #[test]
    fn test_no_cycle() {
        let graph = graph(&[("a", "b"), ("b", "c"), ("a", "c")]);
        assert!(graph.detect_cycles().is_ok());
    }

    #[test]
    fn test_cycle_path() {
        let graph = graph(&[("a", "b"), ("b", "c"), ("c", "a"), ("c", "d")]);
        let cycle = graph.detect_cycles().unwrap_err();
        assert_eq!(cycle.first(), cycle.last());
        assert_eq!(cycle.len(), 4);
        let formatted = DependencyGraph::format_cycle(&cycle);
        for name in ["a", "b", "c"] {
            assert!(formatted.contains(name), "{formatted}");
        }
        assert!(!formatted.contains('d'));
    }

    #[test]
    fn test_reachable_from_root() {
        let graph = graph(&[("app", "dplyr"), ("dplyr", "rlang"), ("other", "rlang")]);
        let reachable: Vec<_> = graph.reachable_from("app").into_iter().collect();
        assert_eq!(reachable, vec!["app", "dplyr", "rlang"]);
        assert!(graph.reachable_from("ghost").is_empty());
    }

    #[test]
    fn test_format_empty_cycle() {
        assert_eq!(DependencyGraph::format_cycle(&[]), "No cycle");
    }
}
