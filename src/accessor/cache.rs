//! Read-mostly neighbor cache shared by concurrent queries.
//!
//! Injected into the [`Accessor`](super::Accessor); the traversal core
//! never sees it. Staleness is bounded by `max_staleness`: an entry older
//! than that is treated as absent and refetched. Invalidation is
//! best-effort; queries tolerate slightly stale snapshots.

use std::sync::Arc;
use std::time::{Duration, Instant};

use hashbrown::HashMap;
use parking_lot::RwLock;

use crate::config::CacheConfig;
use crate::model::{Direction, Edge, NodeId, RelType};

/// Cache key: one neighbor list per accessor call signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NeighborKey {
    pub node: NodeId,
    pub direction: Direction,
    /// Sorted, deduplicated; `None` means all types.
    pub types: Option<Vec<RelType>>,
    pub include_inactive: bool,
}

impl NeighborKey {
    pub fn new(
        node: &NodeId,
        direction: Direction,
        types: Option<&[RelType]>,
        include_inactive: bool,
    ) -> Self {
        let types = types.map(|t| {
            let mut t = t.to_vec();
            t.sort();
            t.dedup();
            t
        });
        Self { node: node.clone(), direction, types, include_inactive }
    }
}

struct CacheEntry {
    edges: Arc<Vec<Edge>>,
    fetched_at: Instant,
}

/// Bounded, time-limited neighbor list cache.
pub struct NeighborCache {
    entries: RwLock<HashMap<NeighborKey, CacheEntry>>,
    capacity: usize,
    max_staleness: Duration,
}

impl NeighborCache {
    pub fn new(capacity: usize, max_staleness: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
            max_staleness,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.capacity, config.max_staleness())
    }

    /// Fresh entry for `key`, if any.
    pub fn get(&self, key: &NeighborKey) -> Option<Arc<Vec<Edge>>> {
        let entries = self.entries.read();
        entries
            .get(key)
            .filter(|e| e.fetched_at.elapsed() < self.max_staleness)
            .map(|e| Arc::clone(&e.edges))
    }

    pub fn insert(&self, key: NeighborKey, edges: Arc<Vec<Edge>>) {
        let mut entries = self.entries.write();
        if entries.len() >= self.capacity && !entries.contains_key(&key) {
            let max_staleness = self.max_staleness;
            entries.retain(|_, e| e.fetched_at.elapsed() < max_staleness);
            if entries.len() >= self.capacity {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, e)| e.fetched_at)
                    .map(|(k, _)| k.clone());
                if let Some(oldest) = oldest {
                    entries.remove(&oldest);
                }
            }
        }
        entries.insert(key, CacheEntry { edges, fetched_at: Instant::now() });
    }

    /// Drop every list that mentions `node` as the queried endpoint.
    pub fn invalidate(&self, node: &NodeId) {
        self.entries.write().retain(|k, _| k.node != *node);
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
