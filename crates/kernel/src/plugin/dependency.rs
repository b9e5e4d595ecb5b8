//! Plugin dependency closure.
//!
//! Computes everything reachable from a seed set by following declared
//! dependencies, either towards what a plugin needs or towards what needs
//! it. The dependency graph is allowed to contain cycles.

use std::collections::{HashMap, VecDeque};

use super::catalog::Catalog;
use super::set::PluginSet;

/// Which way to follow dependency edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// `P -> D` for each dependency `D` of `P`: what the seeds need.
    Dependencies,
    /// `D -> P`: what needs the seeds.
    Dependents,
}

/// Transitive closure of `seeds` over the catalog's dependency graph.
///
/// Seeds are always part of the result. Names that are referenced but not in
/// the catalog are still returned; callers decide whether that is an error.
pub fn closure(direction: Direction, seeds: &PluginSet, catalog: &Catalog) -> PluginSet {
    let edges = adjacency(direction, catalog);

    let mut visited = PluginSet::new();
    let mut queue: VecDeque<&str> = seeds.iter().collect();

    while let Some(name) = queue.pop_front() {
        if !visited.insert(name) {
            continue;
        }
        if let Some(next) = edges.get(name) {
            queue.extend(next.iter().copied().filter(|n| !visited.contains(n)));
        }
    }

    visited
}

fn adjacency(direction: Direction, catalog: &Catalog) -> HashMap<&str, Vec<&str>> {
    let mut edges: HashMap<&str, Vec<&str>> = HashMap::new();

    for info in catalog.iter() {
        for dep in &info.dependencies {
            match direction {
                Direction::Dependencies => edges.entry(&info.name).or_default().push(dep),
                Direction::Dependents => edges.entry(dep).or_default().push(&info.name),
            }
        }
    }

    edges
}
