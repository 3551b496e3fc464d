//! # Relationship Graph Model
//!
//! Clean DTOs for the dossier relationship graph.
//! These types cross every boundary: accessor ↔ working subgraph ↔
//! traversal ↔ query responses.
//!
//! Design rule: strength and status are closed enums, parsed once at the
//! boundary. Weights are derived here and nowhere else.
//! This module is pure data with no I/O and no async.

pub mod node;
pub mod edge;
pub mod path;

pub use node::{Node, NodeId, DossierType};
pub use edge::{Edge, RelType, Strength, EdgeStatus, Direction, Weight, INACTIVE_PENALTY};
pub use path::Path;
