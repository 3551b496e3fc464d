//! Shortest path: hop-count BFS with deterministic tie-breaks, or Dijkstra
//! over derived edge weights.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use hashbrown::HashMap;
use serde::Serialize;

use crate::accessor::GraphAccessor;
use crate::graph::{GraphModel, Hop};
use crate::model::*;
use crate::Result;

use super::{Bounded, Budget};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortestPath {
    pub path: Option<Path>,
    /// No path within the hop bound. Not an error, and never set when the
    /// search was cut short.
    pub unreachable: bool,
}

impl ShortestPath {
    fn found(path: Path) -> Self {
        Self { path: Some(path), unreachable: false }
    }

    fn none() -> Self {
        Self { path: None, unreachable: true }
    }

    /// Budget ran out before `to` was found; reachability is unknown.
    fn unknown() -> Self {
        Self { path: None, unreachable: false }
    }
}

fn extend(path: &Path, hop: &Hop) -> Path {
    let mut next = path.clone();
    next.append(hop.edge.as_ref().clone(), hop.direction, hop.weight, hop.neighbor.clone());
    next
}

/// Tie-break order among equal-hop candidates: weight sum, then node id
/// sequence.
fn better(candidate: &Path, current: &Path) -> bool {
    (candidate.total_weight, &candidate.nodes) < (current.total_weight, &current.nodes)
}

pub async fn shortest_path<A: GraphAccessor>(
    model: &mut GraphModel<A>,
    from: &NodeId,
    to: &NodeId,
    max_hops: u32,
    weighted: bool,
    budget: &Budget,
) -> Result<Bounded<ShortestPath>> {
    if from == to {
        return Ok(Bounded::complete(ShortestPath::found(Path::single(from.clone()))));
    }
    if weighted {
        dijkstra(model, from, to, max_hops, budget).await
    } else {
        fewest_hops(model, from, to, max_hops, budget).await
    }
}

/// Level-synchronous BFS. The level that discovers `to` is finished before
/// stopping so every equal-hop candidate is compared.
async fn fewest_hops<A: GraphAccessor>(
    model: &mut GraphModel<A>,
    from: &NodeId,
    to: &NodeId,
    max_hops: u32,
    budget: &Budget,
) -> Result<Bounded<ShortestPath>> {
    // Best path to each settled node. Keeping the best prefix per node is
    // enough: a path's rank is decided by its prefix once the last hop is
    // fixed.
    let mut settled: HashMap<NodeId, Path> = HashMap::new();
    settled.insert(from.clone(), Path::single(from.clone()));
    let mut frontier = vec![from.clone()];

    for _ in 0..max_hops {
        if frontier.is_empty() {
            break;
        }
        if let Some(reason) = budget.interrupted(settled.len()) {
            return Ok(Bounded::cut(ShortestPath::unknown(), Some(reason)));
        }
        model.ensure_loaded_batch(&frontier).await?;
        let graph = model.graph();

        let mut level: HashMap<NodeId, Path> = HashMap::new();
        let mut reason = None;
        'level: for node in &frontier {
            let Some(prefix) = settled.get(node) else { continue };
            for hop in graph.hops(node) {
                if settled.contains_key(&hop.neighbor) {
                    continue;
                }
                if !level.contains_key(&hop.neighbor) {
                    if let Some(r) = budget.exhausted(settled.len() + level.len()) {
                        reason = Some(r);
                        break 'level;
                    }
                }
                let candidate = extend(prefix, hop);
                match level.get(&hop.neighbor) {
                    Some(current) if !better(&candidate, current) => {}
                    _ => {
                        level.insert(hop.neighbor.clone(), candidate);
                    }
                }
            }
        }

        if let Some(path) = level.remove(to) {
            // With a cut level, an equal-hop candidate may have been skipped.
            return Ok(Bounded::cut(ShortestPath::found(path), reason));
        }
        if reason.is_some() {
            return Ok(Bounded::cut(ShortestPath::unknown(), reason));
        }
        let mut next: Vec<NodeId> = level.keys().cloned().collect();
        next.sort();
        settled.extend(level);
        frontier = next;
    }

    Ok(Bounded::complete(ShortestPath::none()))
}

/// Dijkstra keyed by (weight, hops, node id). Without a hop bound a node
/// would settle once; with one, a later pop is still useful if it arrives
/// in fewer hops, so each node remembers the fewest hops it was popped at.
async fn dijkstra<A: GraphAccessor>(
    model: &mut GraphModel<A>,
    from: &NodeId,
    to: &NodeId,
    max_hops: u32,
    budget: &Budget,
) -> Result<Bounded<ShortestPath>> {
    let max_hops = max_hops as usize;
    let mut arena: Vec<Path> = vec![Path::single(from.clone())];
    let mut heap = BinaryHeap::new();
    heap.push(Reverse((0 as Weight, 0usize, from.clone(), 0usize)));
    let mut fewest_hops: HashMap<NodeId, usize> = HashMap::new();

    while let Some(Reverse((_, hops, node, slot))) = heap.pop() {
        if fewest_hops.get(&node).is_some_and(|&h| h <= hops) {
            continue;
        }
        fewest_hops.insert(node.clone(), hops);

        if node == *to {
            let path = std::mem::replace(&mut arena[slot], Path::single(node));
            return Ok(Bounded::complete(ShortestPath::found(path)));
        }
        if hops >= max_hops {
            continue;
        }
        if let Some(reason) = budget.interrupted(fewest_hops.len()) {
            return Ok(Bounded::cut(ShortestPath::unknown(), Some(reason)));
        }

        for hop in model.hops(&node).await? {
            if fewest_hops.get(&hop.neighbor).is_some_and(|&h| h <= hops + 1) {
                continue;
            }
            let next = extend(&arena[slot], &hop);
            let cost = next.total_weight;
            arena.push(next);
            heap.push(Reverse((cost, hops + 1, hop.neighbor, arena.len() - 1)));
        }
    }

    Ok(Bounded::complete(ShortestPath::none()))
}
