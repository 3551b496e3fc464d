//! # Graph Accessor
//!
//! This is THE contract between the traversal engine and the persistence
//! collaborator that owns dossiers and relationships. The engine only ever
//! reads through it.
//!
//! ## Layers
//!
//! | Type | Role |
//! |------|------|
//! | `GraphAccessor` | Trait implemented by the backing store |
//! | `Accessor` | Engine-side wrapper: call timeout, error mapping, cache |
//! | `NeighborCache` | Injectable read-mostly neighbor cache |
//! | `MemoryAccessor` | In-memory store for testing/embedding |

pub mod cache;
pub mod memory;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::model::*;
use crate::{Error, Result};

pub use cache::{NeighborCache, NeighborKey};
pub use memory::MemoryAccessor;

// ============================================================================
// GraphAccessor Trait
// ============================================================================

/// Read-only view of the relationship store.
///
/// Implementations report store failures as
/// `Error::AccessorUnavailable`; any other error is mapped to it by the
/// [`Accessor`] wrapper. Pagination, if the store needs it, stays inside
/// the implementation. Each call returns one complete list.
#[async_trait]
pub trait GraphAccessor: Send + Sync + 'static {
    /// `GetNode(id)`. `Ok(None)` when the node does not exist.
    async fn get_node(&self, id: &NodeId) -> Result<Option<Node>>;

    /// `GetEdges(nodeId, direction, typeFilter, includeInactive)`.
    ///
    /// `Forward`: edges whose source is `node`. `Reverse`: edges whose
    /// target is `node`. `Both`: the union (a self-loop appears once).
    /// Unless `include_inactive`, only edges with `Active` status.
    async fn get_edges(
        &self,
        node: &NodeId,
        direction: Direction,
        types: Option<&[RelType]>,
        include_inactive: bool,
    ) -> Result<Vec<Edge>>;

    /// Batch node lookup; missing ids are skipped.
    ///
    /// Default falls back to sequential `get_node` calls.
    async fn get_nodes(&self, ids: &[NodeId]) -> Result<Vec<Node>> {
        let mut nodes = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(node) = self.get_node(id).await? {
                nodes.push(node);
            }
        }
        Ok(nodes)
    }
}

// ============================================================================
// Accessor wrapper
// ============================================================================

/// Engine-side accessor: every call bounded by a timeout, backend errors
/// normalised to `AccessorUnavailable`, neighbor lists cached.
pub struct Accessor<A: GraphAccessor> {
    backend: Arc<A>,
    cache: Option<Arc<NeighborCache>>,
    timeout: Duration,
}

impl<A: GraphAccessor> Clone for Accessor<A> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            cache: self.cache.clone(),
            timeout: self.timeout,
        }
    }
}

impl<A: GraphAccessor> Accessor<A> {
    pub fn new(backend: Arc<A>, timeout: Duration) -> Self {
        Self { backend, cache: None, timeout }
    }

    pub fn with_cache(mut self, cache: Arc<NeighborCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn backend(&self) -> &A {
        &self.backend
    }

    pub fn cache(&self) -> Option<&NeighborCache> {
        self.cache.as_deref()
    }

    /// `fetchNode`: the node, or `NodeNotFound`.
    pub async fn fetch_node(&self, id: &NodeId) -> Result<Node> {
        self.bounded("get_node", self.backend.get_node(id))
            .await?
            .ok_or_else(|| Error::NodeNotFound(id.clone()))
    }

    /// Nodes that exist among `ids`, in backend order.
    pub async fn fetch_nodes(&self, ids: &[NodeId]) -> Result<Vec<Node>> {
        self.bounded("get_nodes", self.backend.get_nodes(ids)).await
    }

    /// `fetchNeighbors`: idempotent, served from cache when fresh.
    pub async fn fetch_neighbors(
        &self,
        id: &NodeId,
        direction: Direction,
        types: Option<&[RelType]>,
        include_inactive: bool,
    ) -> Result<Arc<Vec<Edge>>> {
        let key = self
            .cache
            .as_ref()
            .map(|_| NeighborKey::new(id, direction, types, include_inactive));

        if let (Some(cache), Some(key)) = (&self.cache, &key) {
            if let Some(hit) = cache.get(key) {
                return Ok(hit);
            }
        }

        let edges = self
            .bounded(
                "get_edges",
                self.backend.get_edges(id, direction, types, include_inactive),
            )
            .await?;
        debug!(node = %id, ?direction, count = edges.len(), "fetched neighbors");
        let edges = Arc::new(edges);

        if let (Some(cache), Some(key)) = (&self.cache, key) {
            cache.insert(key, Arc::clone(&edges));
        }
        Ok(edges)
    }

    async fn bounded<T>(&self, call: &str, fut: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(v)) => Ok(v),
            Ok(Err(e @ (Error::AccessorUnavailable(_) | Error::NodeNotFound(_)))) => {
                if matches!(e, Error::AccessorUnavailable(_)) {
                    warn!(call, error = %e, "accessor call failed");
                }
                Err(e)
            }
            Ok(Err(other)) => {
                warn!(call, error = %other, "accessor call failed");
                Err(Error::AccessorUnavailable(other.to_string()))
            }
            Err(_) => {
                warn!(call, timeout_ms = self.timeout.as_millis() as u64, "accessor call timed out");
                Err(Error::AccessorUnavailable(format!(
                    "{call} timed out after {} ms",
                    self.timeout.as_millis()
                )))
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
