//! # Query Orchestrator
//!
//! Validates a request, builds one [`GraphModel`] for it, runs the
//! traversal under a [`Budget`] and shapes the [`Response`].
//!
//! Validation happens before any traversal: an empty id or an
//! out-of-range parameter is `InvalidParameter`, an unknown start or end
//! node is `NodeNotFound`. Nothing is clamped.

pub mod request;

use std::time::{Duration, Instant};

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::accessor::GraphAccessor;
use crate::graph::{EdgeFilter, GraphModel};
use crate::model::*;
use crate::stats::{self, NetworkStatistics};
use crate::traversal::{
    self, Bounded, Budget, ChainMatch, CommonConnections, ComplexityEstimate, Cycle, ReachedNode,
    ShortestPath, TraverseOptions, TruncationReason,
};
use crate::{Engine, Error, Result};

pub use request::*;

// ============================================================================
// Response
// ============================================================================

/// Envelope of every successful response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Response<T> {
    pub result: T,
    /// The work was cut short by a budget, timeout, cancellation or engine
    /// limit; `result` is best-effort.
    pub partial: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<TruncationReason>,
    pub took_ms: u64,
    /// Nodes whose edges were pulled through the accessor.
    pub nodes_loaded: usize,
}

/// Typed result of [`Engine::execute`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    Reached(Response<Vec<ReachedNode>>),
    ShortestPath(Response<ShortestPath>),
    Paths(Response<Vec<Path>>),
    Chain(Response<Vec<ChainMatch>>),
    Common(Response<CommonConnections>),
    Statistics(Response<NetworkStatistics>),
    Cycles(Response<Vec<Cycle>>),
    Complexity(Response<ComplexityEstimate>),
}

impl Reply {
    pub fn partial(&self) -> bool {
        match self {
            Reply::Reached(r) => r.partial,
            Reply::ShortestPath(r) => r.partial,
            Reply::Paths(r) => r.partial,
            Reply::Chain(r) => r.partial,
            Reply::Common(r) => r.partial,
            Reply::Statistics(r) => r.partial,
            Reply::Cycles(r) => r.partial,
            Reply::Complexity(r) => r.partial,
        }
    }
}

// ============================================================================
// Validation
// ============================================================================

fn require_id(field: &str, id: &NodeId) -> Result<()> {
    if id.is_empty() {
        return Err(Error::InvalidParameter(format!("{field} must not be empty")));
    }
    Ok(())
}

fn check_range<T: PartialOrd + std::fmt::Display>(field: &str, value: T, min: T, max: T) -> Result<()> {
    if value < min || value > max {
        return Err(Error::InvalidParameter(format!(
            "{field} must be between {min} and {max}, got {value}"
        )));
    }
    Ok(())
}

// ============================================================================
// Per-query state
// ============================================================================

/// Bookkeeping for one running query.
struct Run {
    operation: &'static str,
    started: Instant,
    budget: Budget,
    as_of: NaiveDate,
    include_inactive: bool,
}

impl Run {
    fn filter(&self, direction: Direction, types: Option<&Vec<RelType>>) -> EdgeFilter {
        EdgeFilter::new(direction, self.as_of)
            .with_types(types.cloned())
            .with_inactive(self.include_inactive)
    }

    fn finish<T>(self, out: Bounded<T>, nodes_loaded: usize) -> Response<T> {
        let partial = out.is_partial();
        let took_ms = self.started.elapsed().as_millis() as u64;
        info!(
            operation = self.operation,
            partial,
            reason = ?out.reason,
            took_ms,
            nodes_loaded,
            "query finished"
        );
        Response { result: out.value, partial, reason: out.reason, took_ms, nodes_loaded }
    }
}

// ============================================================================
// Operations
// ============================================================================

impl<A: GraphAccessor> Engine<A> {
    fn begin(&self, operation: &'static str, options: &QueryOptions) -> Result<Run> {
        let config = self.config();
        let max_nodes = match options.max_nodes_visited {
            Some(n) => {
                check_range("maxNodesVisited", n, 1, config.max_nodes_visited)?;
                n
            }
            None => config.max_nodes_visited,
        };
        let timeout = match options.timeout_ms {
            Some(ms) => {
                check_range("timeoutMs", ms, 1, config.query_timeout_ms)?;
                Duration::from_millis(ms)
            }
            None => config.query_timeout(),
        };
        let mut budget = Budget::new(max_nodes, timeout);
        if let Some(cancel) = &options.cancel {
            budget = budget.with_cancel(cancel.clone());
        }
        debug!(operation, max_nodes, timeout_ms = timeout.as_millis() as u64, "query started");
        Ok(Run {
            operation,
            started: Instant::now(),
            budget,
            as_of: options.as_of.unwrap_or_else(|| Utc::now().date_naive()),
            include_inactive: options.include_inactive,
        })
    }

    fn model(&self, filter: EdgeFilter) -> GraphModel<A> {
        GraphModel::new(self.accessor().clone(), filter)
            .with_concurrency(self.config().frontier_concurrency)
    }

    /// N-degree traversal from `startId`.
    pub async fn traverse(&self, req: &TraverseRequest) -> Result<Response<Vec<ReachedNode>>> {
        require_id("startId", &req.start_id)?;
        check_range("maxDegree", req.max_degree, 0, self.config().max_degree_ceiling)?;
        let run = self.begin("traverse", &req.options)?;

        let mut model = self.model(run.filter(req.direction, req.type_filter.as_ref()));
        model.node(&req.start_id).await?;
        let opts = TraverseOptions { max_degree: req.max_degree, node_types: req.node_types.clone() };
        let out = traversal::traverse(&mut model, &req.start_id, &opts, &run.budget).await?;
        Ok(run.finish(out, model.graph().loaded_count()))
    }

    /// Shortest path by hop count, or by weight when `weighted`.
    pub async fn shortest_path(&self, req: &ShortestPathRequest) -> Result<Response<ShortestPath>> {
        require_id("fromId", &req.from_id)?;
        require_id("toId", &req.to_id)?;
        check_range("maxHops", req.max_hops, 1, self.config().max_length_ceiling)?;
        let run = self.begin("shortest-path", &req.options)?;

        let mut model = self.model(run.filter(req.direction, req.type_filter.as_ref()));
        model.node(&req.from_id).await?;
        model.node(&req.to_id).await?;
        let out = traversal::shortest_path(
            &mut model,
            &req.from_id,
            &req.to_id,
            req.max_hops,
            req.weighted,
            &run.budget,
        )
        .await?;
        Ok(run.finish(out, model.graph().loaded_count()))
    }

    /// Every simple path up to `maxLength` hops, at most `maxPaths`.
    pub async fn all_paths(&self, req: &AllPathsRequest) -> Result<Response<Vec<Path>>> {
        require_id("fromId", &req.from_id)?;
        require_id("toId", &req.to_id)?;
        let config = self.config();
        check_range("maxLength", req.max_length, 1, config.max_length_ceiling)?;
        check_range("maxPaths", req.max_paths, 1, config.max_paths_ceiling)?;
        let run = self.begin("all-paths", &req.options)?;

        let mut model = self.model(run.filter(req.direction, req.type_filter.as_ref()));
        model.node(&req.from_id).await?;
        model.node(&req.to_id).await?;
        let out = traversal::all_paths(
            &mut model,
            &req.from_id,
            &req.to_id,
            req.max_length,
            req.max_paths,
            &run.budget,
        )
        .await?;
        Ok(run.finish(out, model.graph().loaded_count()))
    }

    /// Nodes between `minDegree` and `maxDegree` hops away.
    pub async fn connected_entities(
        &self,
        req: &ConnectedEntitiesRequest,
    ) -> Result<Response<Vec<ReachedNode>>> {
        require_id("nodeId", &req.node_id)?;
        let config = self.config();
        check_range("maxDegree", req.max_degree, 1, config.max_degree_ceiling)?;
        check_range("minDegree", req.min_degree, 0, req.max_degree)?;
        if let Some(limit) = req.limit {
            check_range("limit", limit, 1, config.max_results)?;
        }
        let run = self.begin("connected-entities", &req.options)?;

        let mut model = self.model(run.filter(req.direction, req.type_filter.as_ref()));
        model.node(&req.node_id).await?;
        let opts = TraverseOptions { max_degree: req.max_degree, node_types: req.node_types.clone() };
        let out = traversal::connected_entities(
            &mut model,
            &req.node_id,
            req.min_degree,
            &opts,
            req.limit,
            &run.budget,
        )
        .await?;
        Ok(run.finish(out, model.graph().loaded_count()))
    }

    /// Terminal nodes reachable by following `typeSequence`.
    pub async fn relationship_chain(
        &self,
        req: &RelationshipChainRequest,
    ) -> Result<Response<Vec<ChainMatch>>> {
        require_id("startId", &req.start_id)?;
        let config = self.config();
        check_range("typeSequence length", req.type_sequence.len(), 1, config.max_chain_length)?;
        let run = self.begin("relationship-chain", &req.options)?;

        let direction = traversal::chain_direction(&req.type_sequence);
        let mut model = self.model(run.filter(direction, None));
        model.node(&req.start_id).await?;
        let out = traversal::relationship_chain(
            &mut model,
            &req.start_id,
            &req.type_sequence,
            config.max_results,
            &run.budget,
        )
        .await?;
        Ok(run.finish(out, model.graph().loaded_count()))
    }

    /// Nodes within `degree` of both A and B.
    pub async fn common_connections(
        &self,
        req: &CommonConnectionsRequest,
    ) -> Result<Response<CommonConnections>> {
        require_id("nodeAId", &req.node_a_id)?;
        require_id("nodeBId", &req.node_b_id)?;
        check_range("degree", req.degree, 1, self.config().max_degree_ceiling)?;
        let run = self.begin("common-connections", &req.options)?;

        let mut model = self.model(run.filter(req.direction, req.type_filter.as_ref()));
        model.node(&req.node_a_id).await?;
        model.node(&req.node_b_id).await?;
        let out = traversal::common_connections(
            &mut model,
            &req.node_a_id,
            &req.node_b_id,
            req.degree,
            &run.budget,
        )
        .await?;
        Ok(run.finish(out, model.graph().loaded_count()))
    }

    /// Aggregate network statistics over a neighborhood or a node set.
    pub async fn statistics(&self, req: &StatisticsRequest) -> Result<Response<NetworkStatistics>> {
        let config = self.config();
        match &req.scope {
            StatsScope::Neighborhood { seed, degree } => {
                require_id("scope.seed", seed)?;
                check_range("scope.degree", *degree, 0, config.max_degree_ceiling)?;
            }
            StatsScope::Nodes { ids } => {
                check_range("scope.ids length", ids.len(), 1, config.max_nodes_visited)?;
                for id in ids {
                    require_id("scope.ids", id)?;
                }
            }
        }
        let run = self.begin("statistics", &req.options)?;
        let mut model = self.model(run.filter(req.direction, req.type_filter.as_ref()));

        let (scope, reason) = match &req.scope {
            StatsScope::Neighborhood { seed, degree } => {
                model.node(seed).await?;
                let opts = TraverseOptions { max_degree: *degree, node_types: None };
                let out = traversal::traverse(&mut model, seed, &opts, &run.budget).await?;
                let mut ids: Vec<NodeId> = out.value.into_iter().map(|n| n.id).collect();
                ids.push(seed.clone());
                (ids, out.reason)
            }
            StatsScope::Nodes { ids } => {
                for id in ids {
                    model.node(id).await?;
                }
                (ids.clone(), None)
            }
        };

        // Edges between two nodes on the outermost level are only seen once
        // those nodes are loaded too.
        model.ensure_loaded_batch(&scope).await?;
        model.resolve_nodes(&scope).await?;
        let graph = model.finish();
        let result = stats::compute(&graph, &scope, &config.sampling);
        Ok(run.finish(Bounded::cut(result, reason), graph.loaded_count()))
    }

    /// Cycles reachable from `startId`.
    pub async fn detect_cycles(&self, req: &DetectCyclesRequest) -> Result<Response<Vec<Cycle>>> {
        require_id("startId", &req.start_id)?;
        let config = self.config();
        check_range("maxLength", req.max_length, 1, config.max_length_ceiling)?;
        check_range("maxCycles", req.max_cycles, 1, config.max_results)?;
        let run = self.begin("detect-cycles", &req.options)?;

        let mut model = self.model(run.filter(req.direction, req.type_filter.as_ref()));
        model.node(&req.start_id).await?;
        let out = traversal::detect_cycles(
            &mut model,
            &req.start_id,
            req.max_length,
            req.max_cycles,
            &run.budget,
        )
        .await?;
        Ok(run.finish(out, model.graph().loaded_count()))
    }

    /// Advisory `k^degree` size estimate for a traversal.
    pub async fn estimate_complexity(
        &self,
        req: &EstimateComplexityRequest,
    ) -> Result<Response<ComplexityEstimate>> {
        require_id("startId", &req.start_id)?;
        check_range("degree", req.degree, 0, self.config().max_degree_ceiling)?;
        let run = self.begin("estimate-complexity", &req.options)?;

        let mut model = self.model(run.filter(req.direction, req.type_filter.as_ref()));
        model.node(&req.start_id).await?;
        let max_nodes = run.budget.max_nodes();
        let estimate =
            traversal::estimate_complexity(&mut model, &req.start_id, req.degree, max_nodes).await?;
        Ok(run.finish(Bounded::complete(estimate), model.graph().loaded_count()))
    }

    /// Dispatch any request.
    pub async fn execute(&self, request: Request) -> Result<Reply> {
        Ok(match &request {
            Request::Traverse(r) => Reply::Reached(self.traverse(r).await?),
            Request::ShortestPath(r) => Reply::ShortestPath(self.shortest_path(r).await?),
            Request::AllPaths(r) => Reply::Paths(self.all_paths(r).await?),
            Request::ConnectedEntities(r) => Reply::Reached(self.connected_entities(r).await?),
            Request::RelationshipChain(r) => Reply::Chain(self.relationship_chain(r).await?),
            Request::CommonConnections(r) => Reply::Common(self.common_connections(r).await?),
            Request::Statistics(r) => Reply::Statistics(self.statistics(r).await?),
            Request::DetectCycles(r) => Reply::Cycles(self.detect_cycles(r).await?),
            Request::EstimateComplexity(r) => Reply::Complexity(self.estimate_complexity(r).await?),
        })
    }

    /// JSON in, JSON out. Failures become `{"error": {"code", "message"}}`.
    pub async fn handle_json(&self, body: &str) -> String {
        let outcome = match serde_json::from_str::<Request>(body) {
            Ok(request) => {
                let operation = request.operation();
                self.execute(request).await.and_then(|reply| {
                    debug!(operation, "serializing reply");
                    serde_json::to_string(&reply).map_err(Error::from)
                })
            }
            Err(e) => Err(Error::from(e)),
        };
        outcome.unwrap_or_else(|e| e.to_json())
    }
}
