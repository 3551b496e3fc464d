//! Cycle detection by DFS with a recursion stack, plus the traversal
//! complexity pre-check.

use std::sync::Arc;

use hashbrown::HashSet;
use serde::Serialize;

use crate::accessor::GraphAccessor;
use crate::graph::{GraphModel, Hop};
use crate::model::*;
use crate::Result;

use super::{Bounded, Budget, TruncationReason};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cycle {
    /// Closed walk: first and last element are the same node.
    pub nodes: Vec<NodeId>,
    pub length: usize,
}

struct Frame {
    node: NodeId,
    /// Edge used to enter `node`, never followed straight back.
    entered_by: Option<Arc<Edge>>,
    hops: Vec<Hop>,
    next: usize,
}

/// Cycles reachable from `start`, each at most `max_length` hops. Every
/// node is expanded once; an edge back onto the stack reports a cycle.
pub async fn detect_cycles<A: GraphAccessor>(
    model: &mut GraphModel<A>,
    start: &NodeId,
    max_length: u32,
    max_cycles: usize,
    budget: &Budget,
) -> Result<Bounded<Vec<Cycle>>> {
    let max_length = max_length as usize;
    let mut cycles = Vec::new();
    let mut reason = None;
    if max_length == 0 || max_cycles == 0 {
        return Ok(Bounded::complete(cycles));
    }

    let mut expanded: HashSet<NodeId> = HashSet::new();
    expanded.insert(start.clone());
    let mut stack = vec![Frame {
        node: start.clone(),
        entered_by: None,
        hops: model.hops(start).await?,
        next: 0,
    }];

    'search: while let Some(frame) = stack.last_mut() {
        let Some(hop) = frame.hops.get(frame.next).cloned() else {
            stack.pop();
            if stack.is_empty() {
                break;
            }
            if let Some(r) = budget.interrupted(expanded.len()) {
                reason = Some(r);
                break;
            }
            continue;
        };
        frame.next += 1;
        if frame.entered_by.as_deref() == Some(hop.edge.as_ref()) {
            continue;
        }

        if let Some(pos) = stack.iter().position(|f| f.node == hop.neighbor) {
            let length = stack.len() - pos;
            if length <= max_length {
                let mut nodes: Vec<NodeId> = stack[pos..].iter().map(|f| f.node.clone()).collect();
                nodes.push(hop.neighbor.clone());
                cycles.push(Cycle { nodes, length });
                if cycles.len() >= max_cycles {
                    reason = Some(TruncationReason::PathLimit);
                    break 'search;
                }
            }
            continue;
        }
        if expanded.contains(&hop.neighbor) || stack.len() >= max_length {
            continue;
        }
        if let Some(r) = budget.exhausted(expanded.len()) {
            reason = Some(r);
            break;
        }

        let hops = model.hops(&hop.neighbor).await?;
        expanded.insert(hop.neighbor.clone());
        stack.push(Frame { node: hop.neighbor, entered_by: Some(hop.edge), hops, next: 0 });
    }

    cycles.sort_by(|a, b| (a.length, &a.nodes).cmp(&(b.length, &b.nodes)));
    Ok(Bounded::cut(cycles, reason))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplexityEstimate {
    pub neighbor_count: usize,
    pub degree: u32,
    /// `k^degree`, saturating.
    pub estimated_nodes: u64,
    pub max_nodes_visited: usize,
    pub within_budget: bool,
}

/// Advisory size estimate for a traversal of `degree` from `start`.
pub async fn estimate_complexity<A: GraphAccessor>(
    model: &mut GraphModel<A>,
    start: &NodeId,
    degree: u32,
    max_nodes_visited: usize,
) -> Result<ComplexityEstimate> {
    let k = model.hops(start).await?.len();
    let estimated_nodes = (k as u64).saturating_pow(degree);
    Ok(ComplexityEstimate {
        neighbor_count: k,
        degree,
        estimated_nodes,
        max_nodes_visited,
        within_budget: estimated_nodes <= max_nodes_visited as u64,
    })
}
