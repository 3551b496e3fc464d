//! Request types: one struct per operation, plus the `Request` envelope
//! tagged by `operation`.
//!
//! Fields are camelCase on the wire. Omitted fields take the defaults
//! below; nothing is clamped, out-of-range values are rejected by the
//! orchestrator.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::{Direction, DossierType, NodeId, RelType};
use crate::traversal::{CancelToken, ChainStep};

fn default_max_degree() -> u32 {
    2
}

fn default_max_hops() -> u32 {
    6
}

fn default_max_length() -> u32 {
    4
}

fn default_max_paths() -> usize {
    10
}

fn default_min_degree() -> u32 {
    1
}

fn default_stats_degree() -> u32 {
    3
}

fn default_direction_both() -> Direction {
    Direction::Both
}

/// Options shared by every request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryOptions {
    /// Traverse historical and ended edges (with a weight penalty).
    #[serde(default)]
    pub include_inactive: bool,
    /// Date edge `ended` values are judged against. Defaults to today.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub as_of: Option<NaiveDate>,
    /// Lower the node budget for this query. Must not exceed the engine's.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_nodes_visited: Option<usize>,
    /// Lower the wall-clock budget for this query.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(skip)]
    pub cancel: Option<CancelToken>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraverseRequest {
    pub start_id: NodeId,
    #[serde(default = "default_max_degree")]
    pub max_degree: u32,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_filter: Option<Vec<RelType>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_types: Option<Vec<DossierType>>,
    #[serde(flatten)]
    pub options: QueryOptions,
}

impl TraverseRequest {
    pub fn new(start_id: impl Into<NodeId>, max_degree: u32) -> Self {
        Self {
            start_id: start_id.into(),
            max_degree,
            direction: Direction::default(),
            type_filter: None,
            node_types: None,
            options: QueryOptions::default(),
        }
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortestPathRequest {
    pub from_id: NodeId,
    pub to_id: NodeId,
    #[serde(default = "default_max_hops")]
    pub max_hops: u32,
    /// Dijkstra over edge weights instead of fewest hops.
    #[serde(default)]
    pub weighted: bool,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_filter: Option<Vec<RelType>>,
    #[serde(flatten)]
    pub options: QueryOptions,
}

impl ShortestPathRequest {
    pub fn new(from_id: impl Into<NodeId>, to_id: impl Into<NodeId>) -> Self {
        Self {
            from_id: from_id.into(),
            to_id: to_id.into(),
            max_hops: default_max_hops(),
            weighted: false,
            direction: Direction::default(),
            type_filter: None,
            options: QueryOptions::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllPathsRequest {
    pub from_id: NodeId,
    pub to_id: NodeId,
    #[serde(default = "default_max_length")]
    pub max_length: u32,
    #[serde(default = "default_max_paths")]
    pub max_paths: usize,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_filter: Option<Vec<RelType>>,
    #[serde(flatten)]
    pub options: QueryOptions,
}

impl AllPathsRequest {
    pub fn new(from_id: impl Into<NodeId>, to_id: impl Into<NodeId>, max_length: u32, max_paths: usize) -> Self {
        Self {
            from_id: from_id.into(),
            to_id: to_id.into(),
            max_length,
            max_paths,
            direction: Direction::default(),
            type_filter: None,
            options: QueryOptions::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedEntitiesRequest {
    pub node_id: NodeId,
    #[serde(default = "default_min_degree")]
    pub min_degree: u32,
    #[serde(default = "default_max_degree")]
    pub max_degree: u32,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_filter: Option<Vec<RelType>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_types: Option<Vec<DossierType>>,
    /// Report at most this many entities.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(flatten)]
    pub options: QueryOptions,
}

impl ConnectedEntitiesRequest {
    pub fn new(node_id: impl Into<NodeId>, min_degree: u32, max_degree: u32) -> Self {
        Self {
            node_id: node_id.into(),
            min_degree,
            max_degree,
            direction: Direction::default(),
            type_filter: None,
            node_types: None,
            limit: None,
            options: QueryOptions::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipChainRequest {
    pub start_id: NodeId,
    pub type_sequence: Vec<ChainStep>,
    #[serde(flatten)]
    pub options: QueryOptions,
}

impl RelationshipChainRequest {
    pub fn new(start_id: impl Into<NodeId>, type_sequence: Vec<ChainStep>) -> Self {
        Self { start_id: start_id.into(), type_sequence, options: QueryOptions::default() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonConnectionsRequest {
    pub node_a_id: NodeId,
    pub node_b_id: NodeId,
    #[serde(default = "default_max_degree")]
    pub degree: u32,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_filter: Option<Vec<RelType>>,
    #[serde(flatten)]
    pub options: QueryOptions,
}

impl CommonConnectionsRequest {
    pub fn new(a: impl Into<NodeId>, b: impl Into<NodeId>, degree: u32) -> Self {
        Self {
            node_a_id: a.into(),
            node_b_id: b.into(),
            degree,
            direction: Direction::default(),
            type_filter: None,
            options: QueryOptions::default(),
        }
    }
}

/// Which nodes a statistics query covers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum StatsScope {
    /// Everything within `degree` hops of `seed`, seed included.
    #[serde(rename_all = "camelCase")]
    Neighborhood {
        seed: NodeId,
        #[serde(default = "default_stats_degree")]
        degree: u32,
    },
    /// An explicit node set.
    Nodes { ids: Vec<NodeId> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsRequest {
    pub scope: StatsScope,
    /// Neighborhood expansion direction. Statistics treat edges as
    /// undirected, so this defaults to both.
    #[serde(default = "default_direction_both")]
    pub direction: Direction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_filter: Option<Vec<RelType>>,
    #[serde(flatten)]
    pub options: QueryOptions,
}

impl StatisticsRequest {
    pub fn new(scope: StatsScope) -> Self {
        Self {
            scope,
            direction: Direction::Both,
            type_filter: None,
            options: QueryOptions::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectCyclesRequest {
    pub start_id: NodeId,
    #[serde(default = "default_max_length")]
    pub max_length: u32,
    #[serde(default = "default_max_paths")]
    pub max_cycles: usize,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_filter: Option<Vec<RelType>>,
    #[serde(flatten)]
    pub options: QueryOptions,
}

impl DetectCyclesRequest {
    pub fn new(start_id: impl Into<NodeId>) -> Self {
        Self {
            start_id: start_id.into(),
            max_length: default_max_length(),
            max_cycles: default_max_paths(),
            direction: Direction::default(),
            type_filter: None,
            options: QueryOptions::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateComplexityRequest {
    pub start_id: NodeId,
    #[serde(default = "default_max_degree")]
    pub degree: u32,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_filter: Option<Vec<RelType>>,
    #[serde(flatten)]
    pub options: QueryOptions,
}

impl EstimateComplexityRequest {
    pub fn new(start_id: impl Into<NodeId>, degree: u32) -> Self {
        Self {
            start_id: start_id.into(),
            degree,
            direction: Direction::default(),
            type_filter: None,
            options: QueryOptions::default(),
        }
    }
}

/// Any operation, as received on the JSON surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "kebab-case")]
pub enum Request {
    Traverse(TraverseRequest),
    ShortestPath(ShortestPathRequest),
    AllPaths(AllPathsRequest),
    ConnectedEntities(ConnectedEntitiesRequest),
    RelationshipChain(RelationshipChainRequest),
    CommonConnections(CommonConnectionsRequest),
    Statistics(StatisticsRequest),
    DetectCycles(DetectCyclesRequest),
    EstimateComplexity(EstimateComplexityRequest),
}

impl Request {
    pub fn operation(&self) -> &'static str {
        match self {
            Request::Traverse(_) => "traverse",
            Request::ShortestPath(_) => "shortest-path",
            Request::AllPaths(_) => "all-paths",
            Request::ConnectedEntities(_) => "connected-entities",
            Request::RelationshipChain(_) => "relationship-chain",
            Request::CommonConnections(_) => "common-connections",
            Request::Statistics(_) => "statistics",
            Request::DetectCycles(_) => "detect-cycles",
            Request::EstimateComplexity(_) => "estimate-complexity",
        }
    }
}
