//! Level-synchronous BFS: N-degree traversal, connected entities and
//! common connections.

use hashbrown::{HashMap, HashSet};
use serde::Serialize;
use smallvec::SmallVec;

use crate::accessor::GraphAccessor;
use crate::graph::GraphModel;
use crate::model::*;
use crate::Result;

use super::{Bounded, Budget, TruncationReason};

/// A node discovered by a traversal, at its minimum degree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReachedNode {
    pub id: NodeId,
    pub kind: DossierType,
    pub label: String,
    pub degree: u32,
    /// First-reaching parent (smallest id on the previous level).
    pub parent: NodeId,
    /// Every admissible edge between `parent` and this node.
    pub via: SmallVec<[Edge; 2]>,
    /// Node ids from start to this node, both inclusive.
    pub path: Vec<NodeId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraverseOptions {
    pub max_degree: u32,
    /// Report only nodes of these kinds. Traversal still passes through
    /// every kind.
    pub node_types: Option<Vec<DossierType>>,
}

/// Raw BFS visit before node records are resolved.
struct Visit {
    id: NodeId,
    degree: u32,
    parent: NodeId,
    via: SmallVec<[Edge; 2]>,
}

/// BFS core. Returns visits in (degree, id) order plus the path of every
/// visited node.
async fn explore<A: GraphAccessor>(
    model: &mut GraphModel<A>,
    start: &NodeId,
    max_degree: u32,
    budget: &Budget,
) -> Result<(Vec<Visit>, HashMap<NodeId, Vec<NodeId>>, Option<TruncationReason>)> {
    let mut paths: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
    paths.insert(start.clone(), vec![start.clone()]);
    let mut frontier = vec![start.clone()];
    let mut visits = Vec::new();
    let mut reason = None;

    for degree in 1..=max_degree {
        if frontier.is_empty() {
            break;
        }
        if let Some(r) = budget.interrupted(paths.len()) {
            reason = Some(r);
            break;
        }
        model.ensure_loaded_batch(&frontier).await?;
        let graph = model.graph();

        let mut next = Vec::new();
        'level: for parent in &frontier {
            for hop in graph.hops(parent) {
                if paths.contains_key(&hop.neighbor) {
                    continue;
                }
                if let Some(r) = budget.exhausted(paths.len()) {
                    reason = Some(r);
                    break 'level;
                }
                let via = graph
                    .steps(parent)
                    .iter()
                    .filter(|s| s.neighbor == hop.neighbor)
                    .map(|s| s.edge.as_ref().clone())
                    .collect();
                let mut path = paths.get(parent).cloned().unwrap_or_default();
                path.push(hop.neighbor.clone());
                paths.insert(hop.neighbor.clone(), path);
                visits.push(Visit {
                    id: hop.neighbor.clone(),
                    degree,
                    parent: parent.clone(),
                    via,
                });
                next.push(hop.neighbor.clone());
            }
        }
        next.sort();
        frontier = next;
        if reason.is_some() {
            break;
        }
    }

    visits.sort_by(|a, b| (a.degree, &a.id).cmp(&(b.degree, &b.id)));
    Ok((visits, paths, reason))
}

/// N-degree traversal from `start`. Results sorted by (degree, id); the
/// start node is never reported.
pub async fn traverse<A: GraphAccessor>(
    model: &mut GraphModel<A>,
    start: &NodeId,
    opts: &TraverseOptions,
    budget: &Budget,
) -> Result<Bounded<Vec<ReachedNode>>> {
    let (visits, mut paths, reason) = explore(model, start, opts.max_degree, budget).await?;

    let ids: Vec<NodeId> = visits.iter().map(|v| v.id.clone()).collect();
    model.resolve_nodes(&ids).await?;
    let graph = model.graph();

    let reached = visits
        .into_iter()
        .filter_map(|v| {
            // Dangling edge targets have no record and are dropped here.
            let node = graph.node(&v.id)?;
            if let Some(kinds) = &opts.node_types {
                if !kinds.contains(&node.kind) {
                    return None;
                }
            }
            Some(ReachedNode {
                kind: node.kind,
                label: node.label.clone(),
                path: paths.remove(&v.id).unwrap_or_default(),
                id: v.id,
                degree: v.degree,
                parent: v.parent,
                via: v.via,
            })
        })
        .collect();

    Ok(Bounded::cut(reached, reason))
}

/// Nodes at a degree in `[min_degree, max_degree]`, at most `limit`.
pub async fn connected_entities<A: GraphAccessor>(
    model: &mut GraphModel<A>,
    start: &NodeId,
    min_degree: u32,
    opts: &TraverseOptions,
    limit: Option<usize>,
    budget: &Budget,
) -> Result<Bounded<Vec<ReachedNode>>> {
    let Bounded { value, mut reason } = traverse(model, start, opts, budget).await?;
    let min_degree = min_degree.max(1);
    let mut entities: Vec<ReachedNode> =
        value.into_iter().filter(|n| n.degree >= min_degree).collect();

    if let Some(limit) = limit {
        if entities.len() > limit {
            entities.truncate(limit);
            reason = reason.or(Some(TruncationReason::ResultLimit));
        }
    }
    Ok(Bounded::cut(entities, reason))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonConnection {
    pub id: NodeId,
    pub kind: DossierType,
    pub label: String,
    pub degree_from_a: u32,
    pub degree_from_b: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonConnections {
    pub connections: Vec<CommonConnection>,
    /// No node is within `degree` of both. Never set when the search was
    /// cut short.
    pub unreachable: bool,
}

/// Intersection of what `a` and `b` reach within `degree`, excluding the
/// two themselves. Sorted by (degree sum, id).
pub async fn common_connections<A: GraphAccessor>(
    model: &mut GraphModel<A>,
    a: &NodeId,
    b: &NodeId,
    degree: u32,
    budget: &Budget,
) -> Result<Bounded<CommonConnections>> {
    let opts = TraverseOptions { max_degree: degree, node_types: None };
    let from_a = traverse(model, a, &opts, budget).await?;
    let from_b = traverse(model, b, &opts, budget).await?;
    let reason = from_a.reason.or(from_b.reason);

    let degrees_b: HashMap<&NodeId, u32> =
        from_b.value.iter().map(|n| (&n.id, n.degree)).collect();
    let endpoints: HashSet<&NodeId> = [a, b].into_iter().collect();

    let mut connections: Vec<CommonConnection> = from_a
        .value
        .iter()
        .filter(|n| !endpoints.contains(&n.id))
        .filter_map(|n| {
            let db = *degrees_b.get(&n.id)?;
            Some(CommonConnection {
                id: n.id.clone(),
                kind: n.kind,
                label: n.label.clone(),
                degree_from_a: n.degree,
                degree_from_b: db,
            })
        })
        .collect();
    connections.sort_by(|x, y| {
        (x.degree_from_a + x.degree_from_b, &x.id).cmp(&(y.degree_from_a + y.degree_from_b, &y.id))
    });

    // A cut-short search has not shown that the two are disconnected.
    let unreachable = connections.is_empty() && reason.is_none();
    Ok(Bounded::cut(CommonConnections { connections, unreachable }, reason))
}
