//! In-memory relationship store.
//!
//! This is the reference implementation of `GraphAccessor`.
//! It uses simple HashMaps protected by RwLock.
//!
//! ## Limitations
//!
//! - **No persistence**: everything lives in process memory.
//! - **Writes are not atomic across collections**: `insert_edge` updates the
//!   edge list and both adjacency indexes under separate locks. Safe for
//!   fixture setup followed by concurrent reads, which is how the engine
//!   uses it.
//!
//! Use this store for:
//! - Testing the traversal core and query orchestrator
//! - Embedding the engine over a snapshot already loaded in memory
//! - Simulating outages (`set_unavailable`) and slow stores (`set_latency`)

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hashbrown::HashMap;
use parking_lot::RwLock;

use crate::model::*;
use crate::{Error, Result};
use super::GraphAccessor;

// ============================================================================
// MemoryAccessor
// ============================================================================

/// In-memory dossier relationship store.
#[derive(Clone, Default)]
pub struct MemoryAccessor {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    nodes: RwLock<HashMap<NodeId, Node>>,
    /// Edge slots; removed edges leave `None` so indexes stay valid.
    edges: RwLock<Vec<Option<Edge>>>,
    /// source → edge slots
    outgoing: RwLock<HashMap<NodeId, Vec<usize>>>,
    /// target → edge slots
    incoming: RwLock<HashMap<NodeId, Vec<usize>>>,
    unavailable: AtomicBool,
    latency_ms: AtomicU64,
    edge_calls: AtomicU64,
}

impl MemoryAccessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from node and edge lists.
    pub fn from_parts(
        nodes: impl IntoIterator<Item = Node>,
        edges: impl IntoIterator<Item = Edge>,
    ) -> Self {
        let db = Self::new();
        for node in nodes {
            db.insert_node(node);
        }
        for edge in edges {
            db.insert_edge(edge);
        }
        db
    }

    /// Insert or replace a node record.
    pub fn insert_node(&self, node: Node) {
        self.inner.nodes.write().insert(node.id.clone(), node);
    }

    /// Append an edge. Endpoints are not required to exist (dangling edges
    /// are skipped by the engine when it resolves nodes).
    pub fn insert_edge(&self, edge: Edge) {
        let (src, dst) = (edge.source.clone(), edge.target.clone());
        let slot = {
            let mut edges = self.inner.edges.write();
            edges.push(Some(edge));
            edges.len() - 1
        };
        self.inner.outgoing.write().entry(src).or_default().push(slot);
        self.inner.incoming.write().entry(dst).or_default().push(slot);
    }

    /// Remove every edge `source → target` of `rel_type`. Returns how many.
    pub fn remove_edge(&self, source: &NodeId, target: &NodeId, rel_type: &str) -> usize {
        let mut edges = self.inner.edges.write();
        let mut removed = 0;
        for slot in edges.iter_mut() {
            let matches = slot.as_ref().is_some_and(|e| {
                e.source == *source && e.target == *target && e.rel_type.as_str() == rel_type
            });
            if matches {
                *slot = None;
                removed += 1;
            }
        }
        removed
    }

    pub fn node_count(&self) -> usize {
        self.inner.nodes.read().len()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edges.read().iter().filter(|e| e.is_some()).count()
    }

    /// Simulate a backing-store outage.
    pub fn set_unavailable(&self, down: bool) {
        self.inner.unavailable.store(down, Ordering::Relaxed);
    }

    /// Delay every call, to exercise accessor timeouts.
    pub fn set_latency(&self, latency: Duration) {
        self.inner.latency_ms.store(latency.as_millis() as u64, Ordering::Relaxed);
    }

    /// Number of `get_edges` calls served so far.
    pub fn edge_calls(&self) -> u64 {
        self.inner.edge_calls.load(Ordering::Relaxed)
    }

    async fn simulate_store(&self) -> Result<()> {
        let latency = self.inner.latency_ms.load(Ordering::Relaxed);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        if self.inner.unavailable.load(Ordering::Relaxed) {
            return Err(Error::AccessorUnavailable("memory store is offline".into()));
        }
        Ok(())
    }

    fn collect(
        &self,
        slots: Option<&Vec<usize>>,
        types: Option<&[RelType]>,
        include_inactive: bool,
        skip_self_loops: bool,
        out: &mut Vec<Edge>,
    ) {
        let edges = self.inner.edges.read();
        for &slot in slots.into_iter().flatten() {
            let Some(edge) = edges.get(slot).and_then(|e| e.as_ref()) else {
                continue;
            };
            if !include_inactive && edge.status != EdgeStatus::Active {
                continue;
            }
            if types.is_some_and(|t| !t.contains(&edge.rel_type)) {
                continue;
            }
            if skip_self_loops && edge.is_self_loop() {
                continue;
            }
            out.push(edge.clone());
        }
    }
}

// ============================================================================
// GraphAccessor impl
// ============================================================================

#[async_trait]
impl GraphAccessor for MemoryAccessor {
    async fn get_node(&self, id: &NodeId) -> Result<Option<Node>> {
        self.simulate_store().await?;
        Ok(self.inner.nodes.read().get(id).cloned())
    }

    async fn get_edges(
        &self,
        node: &NodeId,
        direction: Direction,
        types: Option<&[RelType]>,
        include_inactive: bool,
    ) -> Result<Vec<Edge>> {
        self.simulate_store().await?;
        self.inner.edge_calls.fetch_add(1, Ordering::Relaxed);

        let mut result = Vec::new();
        if direction.includes_forward() {
            let out = self.inner.outgoing.read();
            self.collect(out.get(node), types, include_inactive, false, &mut result);
        }
        if direction.includes_reverse() {
            let inc = self.inner.incoming.read();
            // A self-loop is already in the outgoing half when both are requested.
            let skip = direction == Direction::Both;
            self.collect(inc.get(node), types, include_inactive, skip, &mut result);
        }
        Ok(result)
    }

    async fn get_nodes(&self, ids: &[NodeId]) -> Result<Vec<Node>> {
        self.simulate_store().await?;
        let nodes = self.inner.nodes.read();
        Ok(ids.iter().filter_map(|id| nodes.get(id).cloned()).collect())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MemoryAccessor {
        MemoryAccessor::from_parts(
            [
                Node::new("sa", DossierType::Country).with_label("Saudi Arabia"),
                Node::new("g20", DossierType::Forum).with_label("G20"),
                Node::new("cn", DossierType::Country).with_label("China"),
            ],
            [
                Edge::new("sa", "g20", "member_of", Strength::Primary),
                Edge::new("cn", "g20", "member_of", Strength::Primary),
                Edge::new("sa", "cn", "bilateral_relation", Strength::Secondary)
                    .with_status(EdgeStatus::Historical),
            ],
        )
    }

    #[tokio::test]
    async fn test_get_node() {
        let db = sample();
        let node = db.get_node(&"g20".into()).await.unwrap().unwrap();
        assert_eq!(node.kind, DossierType::Forum);
        assert_eq!(node.label, "G20");
        assert!(db.get_node(&"nope".into()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_direction_filter() {
        let db = sample();
        let fwd = db.get_edges(&"g20".into(), Direction::Forward, None, false).await.unwrap();
        assert!(fwd.is_empty());
        let rev = db.get_edges(&"g20".into(), Direction::Reverse, None, false).await.unwrap();
        assert_eq!(rev.len(), 2);
        let both = db.get_edges(&"sa".into(), Direction::Both, None, true).await.unwrap();
        assert_eq!(both.len(), 2);
    }

    #[tokio::test]
    async fn test_inactive_excluded_unless_requested() {
        let db = sample();
        let active = db.get_edges(&"sa".into(), Direction::Forward, None, false).await.unwrap();
        assert_eq!(active.len(), 1);
        let all = db.get_edges(&"sa".into(), Direction::Forward, None, true).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_type_filter() {
        let db = sample();
        let types = [RelType::from("bilateral_relation")];
        let edges = db.get_edges(&"sa".into(), Direction::Both, Some(&types), true).await.unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].target.as_str(), "cn");
    }

    #[tokio::test]
    async fn test_self_loop_reported_once_for_both() {
        let db = MemoryAccessor::new();
        db.insert_edge(Edge::new("x", "x", "related_to", Strength::Observer));
        let both = db.get_edges(&"x".into(), Direction::Both, None, false).await.unwrap();
        assert_eq!(both.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_edge() {
        let db = sample();
        assert_eq!(db.remove_edge(&"sa".into(), &"g20".into(), "member_of"), 1);
        assert_eq!(db.edge_count(), 2);
        let fwd = db.get_edges(&"sa".into(), Direction::Forward, None, false).await.unwrap();
        assert!(fwd.is_empty());
    }

    #[tokio::test]
    async fn test_offline_store() {
        let db = sample();
        db.set_unavailable(true);
        assert!(matches!(
            db.get_node(&"sa".into()).await,
            Err(Error::AccessorUnavailable(_))
        ));
    }
}
