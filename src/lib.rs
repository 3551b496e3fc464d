//! # dossier-graph: Relationship Graph Traversal Engine
//!
//! Multi-hop structural queries over dossier relationships: reachability,
//! shortest and alternate paths, typed relationship chains, common
//! connections and network statistics.
//!
//! ## Design Principles
//!
//! 1. **Trait-first**: `GraphAccessor` is the contract between the engine and
//!    the store that owns dossiers and relationships
//! 2. **Load on demand**: a query only pulls the nodes it expands
//! 3. **Never fail on size**: budgets end work early with `partial: true`
//! 4. **Deterministic**: every result has a total order, so identical
//!    queries on an unchanged snapshot produce identical JSON
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dossier_graph::{Engine, MemoryAccessor, Node, Edge, DossierType, Strength, TraverseRequest};
//!
//! # async fn example() -> dossier_graph::Result<()> {
//! let db = MemoryAccessor::new();
//! db.insert_node(Node::new("sa", DossierType::Country).with_label("Saudi Arabia"));
//! db.insert_node(Node::new("g20", DossierType::Forum).with_label("G20"));
//! db.insert_edge(Edge::new("sa", "g20", "member_of", Strength::Primary));
//!
//! let engine = Engine::with_defaults(db);
//! let resp = engine.traverse(&TraverseRequest::new("sa", 2)).await?;
//! for node in &resp.result {
//!     println!("{} at degree {}", node.label, node.degree);
//! }
//!
//! // Or over JSON:
//! let body = engine.handle_json(r#"{"operation": "traverse", "startId": "sa"}"#).await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Layers
//!
//! | Module | Role |
//! |--------|------|
//! | `accessor` | Store contract, timeouts, neighbor cache, in-memory store |
//! | `graph` | Per-query working subgraph, loaded incrementally |
//! | `traversal` | BFS, Dijkstra, DFS enumeration, chains, cycles |
//! | `stats` | Counts, degree histogram, components, key connectors |
//! | `query` | Validation, budgets, response shaping, JSON dispatch |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod accessor;
pub mod config;
pub mod graph;
pub mod traversal;
pub mod stats;
pub mod query;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

// ============================================================================
// Re-exports: Model (the DTOs)
// ============================================================================

pub use model::{
    Node, NodeId, DossierType, Edge, RelType, Strength, EdgeStatus,
    Direction, Path, Weight, INACTIVE_PENALTY,
};

// ============================================================================
// Re-exports: Accessor
// ============================================================================

pub use accessor::{Accessor, GraphAccessor, MemoryAccessor, NeighborCache};

// ============================================================================
// Re-exports: Query surface
// ============================================================================

pub use config::{CacheConfig, EngineConfig, SamplingConfig};
pub use query::{
    AllPathsRequest, CommonConnectionsRequest, ConnectedEntitiesRequest, DetectCyclesRequest,
    EstimateComplexityRequest, QueryOptions, RelationshipChainRequest, Reply, Request, Response,
    ShortestPathRequest, StatisticsRequest, StatsScope, TraverseRequest,
};
pub use stats::{KeyConnector, NetworkStatistics};
pub use traversal::{
    CancelToken, ChainMatch, ChainStep, CommonConnection, CommonConnections, ComplexityEstimate,
    Cycle, ReachedNode, ShortestPath, StepMatcher, TruncationReason,
};

// ============================================================================
// Top-level Engine handle
// ============================================================================

/// The primary entry point. An `Engine` wraps a relationship store and
/// answers traversal queries against it.
///
/// Cheap to clone; clones share the accessor and its neighbor cache.
pub struct Engine<A: GraphAccessor> {
    inner: Arc<EngineInner<A>>,
}

struct EngineInner<A: GraphAccessor> {
    accessor: Accessor<A>,
    config: EngineConfig,
}

impl<A: GraphAccessor> Clone for Engine<A> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<A: GraphAccessor> Engine<A> {
    /// Create an engine over `backend` with a validated configuration.
    pub fn new(backend: A, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(backend, config))
    }

    /// Create an engine with default ceilings, budgets and cache.
    pub fn with_defaults(backend: A) -> Self {
        Self::build(backend, EngineConfig::default())
    }

    fn build(backend: A, config: EngineConfig) -> Self {
        let mut accessor = Accessor::new(Arc::new(backend), config.accessor_timeout());
        if config.cache.enabled {
            accessor = accessor.with_cache(Arc::new(NeighborCache::from_config(&config.cache)));
        }
        Self { inner: Arc::new(EngineInner { accessor, config }) }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Access the accessor (and through it the backend) for advanced use.
    pub fn accessor(&self) -> &Accessor<A> {
        &self.inner.accessor
    }

    /// Drop cached neighbor lists of `node` after the store changed it.
    pub fn invalidate(&self, node: &NodeId) {
        if let Some(cache) = self.inner.accessor.cache() {
            cache.invalidate(node);
        }
    }
}

/// In-memory engine for testing and embedding.
impl Engine<MemoryAccessor> {
    pub fn open_memory() -> Self {
        Self::with_defaults(MemoryAccessor::new())
    }

    /// The in-memory store, for loading fixtures.
    pub fn store(&self) -> &MemoryAccessor {
        self.inner.accessor.backend()
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Accessor unavailable: {0}")]
    AccessorUnavailable(String),

    #[error("Invalid request: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidParameter(_) => "INVALID_PARAMETER",
            Error::NodeNotFound(_) => "NODE_NOT_FOUND",
            Error::AccessorUnavailable(_) => "ACCESSOR_UNAVAILABLE",
            Error::Json(_) => "INVALID_REQUEST",
        }
    }

    /// The caller may retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::AccessorUnavailable(_))
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody { code: self.code().to_string(), message: self.to_string() }
    }

    /// `{"error": {"code": ..., "message": ...}}`
    pub fn to_json(&self) -> String {
        serde_json::json!({ "error": self.to_body() }).to_string()
    }
}

/// Wire form of an [`Error`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

pub type Result<T> = std::result::Result<T, Error>;
