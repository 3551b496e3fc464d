//! Path: a sequence of alternating nodes and edges.

use serde::{Deserialize, Serialize};

use super::{Direction, Edge, NodeId, Weight};

/// A path in the graph: node -[edge]-> node -[edge]-> node ...
///
/// `directions[i]` records whether `edges[i]` was followed with
/// (`Forward`) or against (`Reverse`) its stored direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Path {
    /// Nodes along the path. Always has one more element than `edges`.
    pub nodes: Vec<NodeId>,
    pub edges: Vec<Edge>,
    pub directions: Vec<Direction>,
    pub total_weight: Weight,
}

impl Path {
    pub fn single(node: NodeId) -> Self {
        Self {
            nodes: vec![node],
            edges: Vec::new(),
            directions: Vec::new(),
            total_weight: 0,
        }
    }

    /// Number of hops.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn end(&self) -> &NodeId {
        self.nodes.last().expect("Path always has at least one node")
    }

    /// Extend the path by one hop.
    pub fn append(&mut self, edge: Edge, direction: Direction, weight: Weight, node: NodeId) {
        self.edges.push(edge);
        self.directions.push(direction);
        self.total_weight += weight;
        self.nodes.push(node);
    }

    /// No node appears twice.
    pub fn is_simple(&self) -> bool {
        let mut seen = hashbrown::HashSet::with_capacity(self.nodes.len());
        self.nodes.iter().all(|n| seen.insert(n))
    }
}
