//! # Statistics Engine
//!
//! Aggregates over a frozen [`WorkingSubgraph`]: counts, degree histogram,
//! density, weakly-connected components and sampled key connectors.
//! Pure computation, no I/O.

use std::collections::{BTreeMap, VecDeque};

use hashbrown::{HashMap, HashSet};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::config::SamplingConfig;
use crate::graph::WorkingSubgraph;
use crate::model::{DossierType, NodeId, RelType};

// ============================================================================
// Union-find
// ============================================================================

/// Disjoint sets over `0..n` with path halving and union by rank.
#[derive(Debug, Clone)]
pub struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
    sets: usize,
}

impl UnionFind {
    pub fn new(n: usize) -> Self {
        Self { parent: (0..n).collect(), rank: vec![0; n], sets: n }
    }

    pub fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    /// Returns `true` if `a` and `b` were in different sets.
    pub fn union(&mut self, a: usize, b: usize) -> bool {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return false;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
        self.sets -= 1;
        true
    }

    pub fn count(&self) -> usize {
        self.sets
    }
}

// ============================================================================
// Result types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyConnector {
    pub id: NodeId,
    pub label: String,
    /// Sum over sampled pairs of shortest paths passing through the node.
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkStatistics {
    pub node_count: usize,
    pub edge_count: usize,
    /// Distinct ordered pairs over `n(n-1)`. Zero below two nodes.
    pub density: f64,
    pub avg_degree: f64,
    pub max_degree: usize,
    pub isolated_count: usize,
    pub component_count: usize,
    /// degree → number of nodes with that degree
    pub degree_histogram: BTreeMap<usize, usize>,
    pub type_distribution: BTreeMap<DossierType, usize>,
    pub relationship_distribution: BTreeMap<RelType, usize>,
    pub key_connectors: Vec<KeyConnector>,
    /// Pairs actually evaluated.
    pub sampled_pairs: usize,
    pub seed: u64,
}

// ============================================================================
// Computation
// ============================================================================

/// Statistics over the subgraph induced by `scope` (ids without a loaded
/// node record are ignored).
pub fn compute(
    graph: &WorkingSubgraph,
    scope: &[NodeId],
    sampling: &SamplingConfig,
) -> NetworkStatistics {
    let mut ids: Vec<NodeId> = scope.iter().filter(|id| graph.node(id).is_some()).cloned().collect();
    ids.sort();
    ids.dedup();
    let n = ids.len();
    let index: HashMap<&NodeId, usize> = ids.iter().enumerate().map(|(i, id)| (id, i)).collect();
    let members: HashSet<NodeId> = ids.iter().cloned().collect();

    let edges = graph.induced_edges(&members);
    let mut degree = vec![0usize; n];
    let mut neighbors: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut pairs: HashSet<(usize, usize)> = HashSet::new();
    let mut relationship_distribution = BTreeMap::new();
    let mut uf = UnionFind::new(n);

    for edge in &edges {
        let (Some(&s), Some(&t)) = (index.get(&edge.source), index.get(&edge.target)) else {
            continue;
        };
        degree[s] += 1;
        degree[t] += 1;
        if pairs.insert((s, t)) && !pairs.contains(&(t, s)) {
            neighbors[s].push(t);
            neighbors[t].push(s);
        }
        uf.union(s, t);
        *relationship_distribution.entry(edge.rel_type.clone()).or_insert(0) += 1;
    }
    for list in &mut neighbors {
        list.sort_unstable();
        list.dedup();
    }

    let mut degree_histogram = BTreeMap::new();
    for &d in &degree {
        *degree_histogram.entry(d).or_insert(0) += 1;
    }
    let mut type_distribution = BTreeMap::new();
    for id in &ids {
        if let Some(node) = graph.node(id) {
            *type_distribution.entry(node.kind).or_insert(0) += 1;
        }
    }

    let density = if n < 2 { 0.0 } else { pairs.len() as f64 / (n * (n - 1)) as f64 };
    let avg_degree = if n == 0 { 0.0 } else { degree.iter().sum::<usize>() as f64 / n as f64 };

    let (scores, sampled_pairs) = sampled_betweenness(&neighbors, sampling);
    let mut key_connectors: Vec<KeyConnector> = scores
        .into_iter()
        .enumerate()
        .filter(|(_, score)| *score > 0.0)
        .map(|(i, score)| KeyConnector {
            id: ids[i].clone(),
            label: graph.node(&ids[i]).map(|n| n.label.clone()).unwrap_or_default(),
            score,
        })
        .collect();
    key_connectors.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
    key_connectors.truncate(sampling.top_connectors);

    NetworkStatistics {
        node_count: n,
        edge_count: edges.len(),
        density,
        avg_degree,
        max_degree: degree.iter().copied().max().unwrap_or(0),
        isolated_count: degree.iter().filter(|&&d| d == 0).count(),
        component_count: uf.count(),
        degree_histogram,
        type_distribution,
        relationship_distribution,
        key_connectors,
        sampled_pairs,
        seed: sampling.seed,
    }
}

/// Unweighted BFS distances and shortest-path counts from `source`.
fn bfs_counts(neighbors: &[Vec<usize>], source: usize) -> (Vec<Option<u32>>, Vec<f64>) {
    let n = neighbors.len();
    let mut dist = vec![None; n];
    let mut sigma = vec![0.0; n];
    dist[source] = Some(0);
    sigma[source] = 1.0;
    let mut queue = VecDeque::from([source]);
    while let Some(u) = queue.pop_front() {
        let Some(du) = dist[u] else { continue };
        for &v in &neighbors[u] {
            match dist[v] {
                None => {
                    dist[v] = Some(du + 1);
                    sigma[v] = sigma[u];
                    queue.push_back(v);
                }
                Some(dv) if dv == du + 1 => sigma[v] += sigma[u],
                _ => {}
            }
        }
    }
    (dist, sigma)
}

/// Unordered pairs `(s, t)` with `s < t`: all of them when there are at
/// most `sample_size`, otherwise `sample_size` draws from a seeded RNG.
fn sample_pairs(n: usize, sampling: &SamplingConfig) -> Vec<(usize, usize)> {
    let total = n * n.saturating_sub(1) / 2;
    if total <= sampling.sample_size {
        return (0..n).flat_map(|s| (s + 1..n).map(move |t| (s, t))).collect();
    }
    let mut rng = ChaCha8Rng::seed_from_u64(sampling.seed);
    let mut pairs = Vec::with_capacity(sampling.sample_size);
    while pairs.len() < sampling.sample_size {
        let a = rng.gen_range(0..n);
        let b = rng.gen_range(0..n);
        if a != b {
            pairs.push((a.min(b), a.max(b)));
        }
    }
    pairs
}

/// For each sampled pair, every intermediate `v` on a shortest `s–t` path
/// gains `σ(s,v)·σ(v,t)`.
fn sampled_betweenness(neighbors: &[Vec<usize>], sampling: &SamplingConfig) -> (Vec<f64>, usize) {
    let n = neighbors.len();
    let mut scores = vec![0.0; n];
    if n < 3 {
        return (scores, 0);
    }
    let pairs = sample_pairs(n, sampling);
    let mut memo: HashMap<usize, (Vec<Option<u32>>, Vec<f64>)> = HashMap::new();

    for &(s, t) in &pairs {
        for src in [s, t] {
            memo.entry(src).or_insert_with(|| bfs_counts(neighbors, src));
        }
        let (ds, ss) = &memo[&s];
        let (dt, st) = &memo[&t];
        let Some(d_st) = ds[t] else { continue };
        for v in 0..n {
            if v == s || v == t {
                continue;
            }
            if let (Some(a), Some(b)) = (ds[v], dt[v]) {
                if a + b == d_st {
                    scores[v] += ss[v] * st[v];
                }
            }
        }
    }
    (scores, pairs.len())
}
