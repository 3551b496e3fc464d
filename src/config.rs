//! Engine configuration: hard ceilings, budgets, cache and sampling.
//!
//! Every field has a default, so a partial JSON document (or none at all)
//! yields a usable configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Largest `maxDegree` a traversal request may ask for.
    pub max_degree_ceiling: u32,
    /// Largest `maxLength` / `maxHops` for path queries.
    pub max_length_ceiling: u32,
    /// Largest `maxPaths` for path enumeration.
    pub max_paths_ceiling: usize,
    /// Longest relationship chain pattern accepted.
    pub max_chain_length: usize,
    /// Default and ceiling for nodes visited per operation.
    pub max_nodes_visited: usize,
    /// Wall-clock budget per query.
    pub query_timeout_ms: u64,
    /// Bound on a single accessor call.
    pub accessor_timeout_ms: u64,
    /// Cap on chain matches and cycle reports.
    pub max_results: usize,
    /// Concurrent accessor calls when loading a BFS frontier.
    pub frontier_concurrency: usize,
    pub cache: CacheConfig,
    pub sampling: SamplingConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_degree_ceiling: 6,
            max_length_ceiling: 6,
            max_paths_ceiling: 100,
            max_chain_length: 6,
            max_nodes_visited: 5000,
            query_timeout_ms: 2000,
            accessor_timeout_ms: 1000,
            max_results: 500,
            frontier_concurrency: 8,
            cache: CacheConfig::default(),
            sampling: SamplingConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that would make every query fail or hang.
    pub fn validate(&self) -> Result<()> {
        if self.max_nodes_visited == 0 {
            return Err(Error::InvalidParameter("maxNodesVisited must be positive".into()));
        }
        if self.query_timeout_ms == 0 || self.accessor_timeout_ms == 0 {
            return Err(Error::InvalidParameter("timeouts must be positive".into()));
        }
        if self.frontier_concurrency == 0 {
            return Err(Error::InvalidParameter("frontierConcurrency must be positive".into()));
        }
        if self.sampling.sample_size == 0 {
            return Err(Error::InvalidParameter("sampling.sampleSize must be positive".into()));
        }
        Ok(())
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    pub fn accessor_timeout(&self) -> Duration {
        Duration::from_millis(self.accessor_timeout_ms)
    }
}

/// Accessor-level neighbor cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheConfig {
    pub enabled: bool,
    /// Maximum cached neighbor lists.
    pub capacity: usize,
    /// Entries older than this are refetched.
    pub max_staleness_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: true, capacity: 10_000, max_staleness_ms: 30_000 }
    }
}

impl CacheConfig {
    pub fn max_staleness(&self) -> Duration {
        Duration::from_millis(self.max_staleness_ms)
    }
}

/// Key-connector sampling. Fixed seed keeps statistics reproducible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SamplingConfig {
    /// Node pairs sampled for the betweenness proxy.
    pub sample_size: usize,
    pub seed: u64,
    /// How many key connectors to report.
    pub top_connectors: usize,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self { sample_size: 64, seed: 42, top_connectors: 10 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = EngineConfig::from_json(r#"{"maxDegreeCeiling": 4, "sampling": {"seed": 7}}"#).unwrap();
        assert_eq!(cfg.max_degree_ceiling, 4);
        assert_eq!(cfg.sampling.seed, 7);
        assert_eq!(cfg.sampling.sample_size, 64);
        assert_eq!(cfg.max_nodes_visited, 5000);
    }

    #[test]
    fn zero_budget_is_rejected() {
        let err = EngineConfig::from_json(r#"{"maxNodesVisited": 0}"#).unwrap_err();
        assert_eq!(err.code(), "INVALID_PARAMETER");
    }
}
