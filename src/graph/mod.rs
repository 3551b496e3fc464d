//! # Working Subgraph
//!
//! The per-query materialized slice of the relationship graph.
//!
//! A [`GraphModel`] is created for one query and bound to the accessor.
//! Nodes are loaded on first visit (`ensure_loaded`), never before, so a
//! 2-degree traversal never pulls the whole store. Each node's edges are
//! merged exactly once; after that the slice is only read. When the query
//! ends, [`GraphModel::finish`] freezes it into an immutable
//! [`WorkingSubgraph`].

use std::sync::Arc;

use chrono::NaiveDate;
use futures_util::{stream, StreamExt, TryStreamExt};
use hashbrown::{HashMap, HashSet};
use tracing::debug;

use crate::accessor::{Accessor, GraphAccessor};
use crate::model::*;
use crate::{Error, Result};

// ============================================================================
// Edge filter
// ============================================================================

/// Which stored edges a query may traverse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeFilter {
    pub direction: Direction,
    /// `None` admits every relationship type.
    pub types: Option<Vec<RelType>>,
    pub include_inactive: bool,
    /// Date against which `ended` is evaluated.
    pub as_of: NaiveDate,
}

impl EdgeFilter {
    pub fn new(direction: Direction, as_of: NaiveDate) -> Self {
        Self { direction, types: None, include_inactive: false, as_of }
    }

    pub fn with_types(mut self, types: Option<Vec<RelType>>) -> Self {
        self.types = types.filter(|t| !t.is_empty());
        self
    }

    pub fn with_inactive(mut self, include_inactive: bool) -> Self {
        self.include_inactive = include_inactive;
        self
    }

    pub fn admits(&self, edge: &Edge) -> bool {
        if !self.include_inactive && !edge.is_active(self.as_of) {
            return false;
        }
        match &self.types {
            Some(types) => types.contains(&edge.rel_type),
            None => true,
        }
    }
}

// ============================================================================
// Hops
// ============================================================================

/// One traversal step out of a node.
#[derive(Debug, Clone)]
pub struct Hop {
    pub neighbor: NodeId,
    pub edge: Arc<Edge>,
    /// `Forward` if the edge was followed source → target.
    pub direction: Direction,
    pub weight: Weight,
}

/// Collapse parallel hops to the same neighbor: lowest weight wins, ties go
/// to the lexicographically smallest relationship type. Output sorted by
/// neighbor id.
fn collapse(steps: &[Hop]) -> Vec<Hop> {
    let mut best: HashMap<&NodeId, &Hop> = HashMap::with_capacity(steps.len());
    for hop in steps {
        best.entry(&hop.neighbor)
            .and_modify(|cur| {
                let better = (hop.weight, &hop.edge.rel_type, hop.direction == Direction::Reverse)
                    < (cur.weight, &cur.edge.rel_type, cur.direction == Direction::Reverse);
                if better {
                    *cur = hop;
                }
            })
            .or_insert(hop);
    }
    let mut hops: Vec<Hop> = best.into_values().cloned().collect();
    hops.sort_by(|a, b| a.neighbor.cmp(&b.neighbor));
    hops
}

// ============================================================================
// WorkingSubgraph (frozen)
// ============================================================================

/// Immutable snapshot of everything one query loaded.
#[derive(Debug, Default)]
pub struct WorkingSubgraph {
    nodes: HashMap<NodeId, Node>,
    /// source → edges leaving it (only for nodes whose forward edges were loaded)
    forward: HashMap<NodeId, Vec<Arc<Edge>>>,
    /// target → edges entering it (only for nodes whose reverse edges were loaded)
    reverse: HashMap<NodeId, Vec<Arc<Edge>>>,
    /// every admissible step, parallel edges kept, sorted by (neighbor, type)
    steps: HashMap<NodeId, Vec<Hop>>,
    /// collapsed steps for path algorithms
    hops: HashMap<NodeId, Vec<Hop>>,
    loaded: HashSet<NodeId>,
}

impl WorkingSubgraph {
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn is_loaded(&self, id: &NodeId) -> bool {
        self.loaded.contains(id)
    }

    /// Nodes whose edges were pulled from the accessor.
    pub fn loaded_count(&self) -> usize {
        self.loaded.len()
    }

    /// Collapsed hops out of `id`; empty if not loaded.
    pub fn hops(&self, id: &NodeId) -> &[Hop] {
        self.hops.get(id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Every admissible step out of `id`, parallel edges kept.
    pub fn steps(&self, id: &NodeId) -> &[Hop] {
        self.steps.get(id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Distinct loaded edges with both endpoints in `scope`, self-loops
    /// excluded.
    pub fn induced_edges(&self, scope: &HashSet<NodeId>) -> Vec<Arc<Edge>> {
        let mut seen: HashSet<&Edge> = HashSet::new();
        let mut out = Vec::new();
        let lists = self.forward.values().chain(self.reverse.values());
        for edge in lists.flatten() {
            if edge.is_self_loop()
                || !scope.contains(&edge.source)
                || !scope.contains(&edge.target)
            {
                continue;
            }
            if seen.insert(edge.as_ref()) {
                out.push(Arc::clone(edge));
            }
        }
        out.sort_by(|a, b| {
            (&a.source, &a.target, &a.rel_type).cmp(&(&b.source, &b.target, &b.rel_type))
        });
        out
    }

    fn merge(&mut self, id: NodeId, edges: &[Edge], filter: &EdgeFilter) {
        let mut fwd = Vec::new();
        let mut rev = Vec::new();
        let mut steps = Vec::new();

        for edge in edges.iter().filter(|e| filter.admits(e)) {
            let edge = Arc::new(edge.clone());
            let weight = edge.weight(filter.as_of);
            if filter.direction.includes_forward() && edge.source == id {
                fwd.push(Arc::clone(&edge));
                steps.push(Hop {
                    neighbor: edge.target.clone(),
                    edge: Arc::clone(&edge),
                    direction: Direction::Forward,
                    weight,
                });
            }
            if filter.direction.includes_reverse() && edge.target == id {
                rev.push(Arc::clone(&edge));
                if !edge.is_self_loop() || !filter.direction.includes_forward() {
                    steps.push(Hop {
                        neighbor: edge.source.clone(),
                        edge: Arc::clone(&edge),
                        direction: Direction::Reverse,
                        weight,
                    });
                }
            }
        }

        steps.sort_by(|a, b| {
            (&a.neighbor, &a.edge.rel_type, a.weight).cmp(&(&b.neighbor, &b.edge.rel_type, b.weight))
        });
        let non_loop: Vec<Hop> = steps.iter().filter(|h| h.neighbor != id).cloned().collect();
        let hops = collapse(&non_loop);

        if filter.direction.includes_forward() {
            self.forward.insert(id.clone(), fwd);
        }
        if filter.direction.includes_reverse() {
            self.reverse.insert(id.clone(), rev);
        }
        self.steps.insert(id.clone(), steps);
        self.hops.insert(id.clone(), hops);
        self.loaded.insert(id);
    }
}

// ============================================================================
// GraphModel (under construction)
// ============================================================================

/// Incrementally loaded working subgraph bound to one query.
pub struct GraphModel<A: GraphAccessor> {
    accessor: Accessor<A>,
    filter: EdgeFilter,
    concurrency: usize,
    graph: WorkingSubgraph,
}

impl<A: GraphAccessor> GraphModel<A> {
    pub fn new(accessor: Accessor<A>, filter: EdgeFilter) -> Self {
        Self { accessor, filter, concurrency: 8, graph: WorkingSubgraph::default() }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Read access to what has been loaded so far.
    pub fn graph(&self) -> &WorkingSubgraph {
        &self.graph
    }

    /// Pull `id`'s edges on first visit. Later calls are O(1).
    pub async fn ensure_loaded(&mut self, id: &NodeId) -> Result<()> {
        if self.graph.is_loaded(id) {
            return Ok(());
        }
        let edges = self
            .accessor
            .fetch_neighbors(
                id,
                self.filter.direction,
                self.filter.types.as_deref(),
                self.filter.include_inactive,
            )
            .await?;
        self.graph.merge(id.clone(), &edges, &self.filter);
        Ok(())
    }

    /// Load a whole BFS frontier, fetching up to `concurrency` nodes at a time.
    pub async fn ensure_loaded_batch(&mut self, ids: &[NodeId]) -> Result<()> {
        let mut seen = HashSet::new();
        let pending: Vec<NodeId> = ids
            .iter()
            .filter(|id| !self.graph.is_loaded(id) && seen.insert(*id))
            .cloned()
            .collect();
        if pending.is_empty() {
            return Ok(());
        }
        debug!(count = pending.len(), "loading frontier");

        let accessor = &self.accessor;
        let filter = &self.filter;
        let types = filter.types.as_deref();
        let fetched: Vec<(NodeId, Arc<Vec<Edge>>)> = stream::iter(pending)
            .map(|id| async move {
                let edges = accessor
                    .fetch_neighbors(&id, filter.direction, types, filter.include_inactive)
                    .await?;
                Ok::<_, Error>((id, edges))
            })
            .buffer_unordered(self.concurrency)
            .try_collect()
            .await?;

        for (id, edges) in fetched {
            self.graph.merge(id, &edges, &self.filter);
        }
        Ok(())
    }

    /// Loaded collapsed hops out of `id`, loading it first if needed.
    pub async fn hops(&mut self, id: &NodeId) -> Result<Vec<Hop>> {
        self.ensure_loaded(id).await?;
        Ok(self.graph.hops(id).to_vec())
    }

    /// Every admissible raw edge out of `id` with the direction travelled,
    /// parallel edges kept. Used by chain matching.
    pub async fn edges_from(&mut self, id: &NodeId) -> Result<Vec<Hop>> {
        self.ensure_loaded(id).await?;
        Ok(self.graph.steps(id).to_vec())
    }

    /// Node record, fetched once.
    pub async fn node(&mut self, id: &NodeId) -> Result<Node> {
        if let Some(node) = self.graph.node(id) {
            return Ok(node.clone());
        }
        let node = self.accessor.fetch_node(id).await?;
        self.graph.nodes.insert(id.clone(), node.clone());
        Ok(node)
    }

    /// Resolve node records for `ids`; ids the store does not know are
    /// skipped (dangling edges).
    pub async fn resolve_nodes(&mut self, ids: &[NodeId]) -> Result<()> {
        let missing: Vec<NodeId> = ids
            .iter()
            .filter(|id| self.graph.node(id).is_none())
            .cloned()
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        for node in self.accessor.fetch_nodes(&missing).await? {
            self.graph.nodes.insert(node.id.clone(), node);
        }
        Ok(())
    }

    /// Freeze into an immutable snapshot.
    pub fn finish(self) -> WorkingSubgraph {
        self.graph
    }
}

// ============================================================================
// Tests
// ============================================================================
