//! Reverse reference graph across the open solution.
//!
//! For every project P that supports references and every project Q that P
//! references, the graph records the inverted edge Q→P, answering "who
//! depends on Q". The graph is rebuilt from the full project set on every
//! query and is explicitly *not* maintained incrementally: reference edits
//! inside a project are not events the solution core observes, so a stored
//! graph would go silently stale. Staleness between two calls is accepted
//! and documented instead.

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use crate::solution::project::{fold_name, ProjectHandle};

/// Snapshot of the solution's reverse reference edges.
pub(crate) struct DependentsGraph {
    graph: DiGraph<String, ()>,
    nodes: HashMap<String, NodeIndex>,
    handles: HashMap<String, ProjectHandle>,
}

impl DependentsGraph {
    /// Builds the reverse graph from the full current project set.
    pub(crate) fn build(projects: &[ProjectHandle]) -> Self {
        let mut built = Self {
            graph: DiGraph::new(),
            nodes: HashMap::new(),
            handles: HashMap::new(),
        };

        for project in projects {
            let key = fold_name(project.unique_name());
            built.handles.insert(key.clone(), project.clone());
            built.node(key);
        }

        for project in projects {
            if !project.supports_references() {
                continue;
            }
            let dependent = built.node(fold_name(project.unique_name()));
            for referenced in project.referenced_projects() {
                let referenced_node = built.node(fold_name(&referenced.unique_name()));
                built.graph.update_edge(referenced_node, dependent, ());
            }
        }

        built
    }

    /// Interns `key` as a graph node, returning its index. Creates the node
    /// (labeled with `key`) and records it in `nodes` on first sight;
    /// returns the existing index on repeat.
    fn node(&mut self, key: String) -> NodeIndex {
        if let Some(&index) = self.nodes.get(&key) {
            return index;
        }
        let index = self.graph.add_node(key.clone());
        self.nodes.insert(key, index);
        index
    }

    /// Projects that hold a reference to `project`, in the order the walk
    /// recorded them. Empty when nothing depends on it or the project is
    /// unknown to this snapshot.
    pub(crate) fn dependents_of(&self, project: &ProjectHandle) -> Vec<ProjectHandle> {
        let Some(&index) = self.nodes.get(&fold_name(project.unique_name())) else {
            return Vec::new();
        };

        let mut dependents: Vec<ProjectHandle> = self
            .graph
            .neighbors_directed(index, Direction::Outgoing)
            .filter_map(|neighbor| self.handles.get(&self.graph[neighbor]).cloned())
            .collect();
        // petgraph iterates neighbors newest-first; restore walk order.
        dependents.reverse();
        dependents
    }
}
