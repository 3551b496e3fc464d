//! # Traversal Core
//!
//! Graph algorithms over a [`GraphModel`](crate::graph::GraphModel). Each
//! operation is stateless per call: it pulls nodes through the model as it
//! expands and returns a [`Bounded`] value carrying the truncation reason,
//! if any.
//!
//! | Operation | Algorithm |
//! |-----------|-----------|
//! | `traverse`, `connected_entities`, `common_connections` | level-synchronous BFS |
//! | `shortest_path` | BFS with tie-breaks, or Dijkstra |
//! | `all_paths`, `relationship_chain`, `detect_cycles` | iterative DFS with a path stack |
//!
//! Every traversal keeps a visited set (BFS) or an on-path set (DFS), so
//! cyclic graphs terminate.

pub mod bfs;
pub mod budget;
pub mod chain;
pub mod cycles;
pub mod paths;
pub mod shortest;

pub use bfs::{
    common_connections, connected_entities, traverse, CommonConnection, CommonConnections,
    ReachedNode, TraverseOptions,
};
pub use budget::{Bounded, Budget, CancelToken, TruncationReason};
pub use chain::{chain_direction, relationship_chain, ChainMatch, ChainStep, StepMatcher};
pub use cycles::{detect_cycles, estimate_complexity, ComplexityEstimate, Cycle};
pub use paths::all_paths;
pub use shortest::{shortest_path, ShortestPath};
