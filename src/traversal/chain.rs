//! Relationship chain matching: follow a typed sequence of hops.

use hashbrown::HashSet;
use serde::{Deserialize, Serialize};

use crate::accessor::GraphAccessor;
use crate::graph::{GraphModel, Hop};
use crate::model::*;
use crate::Result;

use super::paths::path_of;
use super::{Bounded, Budget, TruncationReason};

/// What one chain step accepts. `"*"` on the wire means any type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StepMatcher {
    Any,
    Type(RelType),
}

impl From<String> for StepMatcher {
    fn from(s: String) -> Self {
        if s == "*" { StepMatcher::Any } else { StepMatcher::Type(RelType(s)) }
    }
}

impl From<StepMatcher> for String {
    fn from(m: StepMatcher) -> Self {
        match m {
            StepMatcher::Any => "*".to_string(),
            StepMatcher::Type(t) => t.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainStep {
    #[serde(rename = "type")]
    pub matcher: StepMatcher,
    /// Allow this hop against the stored edge direction.
    #[serde(default)]
    pub bidirectional: bool,
}

impl ChainStep {
    pub fn of(rel_type: &str) -> Self {
        Self { matcher: StepMatcher::from(rel_type.to_string()), bidirectional: false }
    }

    pub fn either_way(mut self) -> Self {
        self.bidirectional = true;
        self
    }

    fn accepts(&self, hop: &Hop) -> bool {
        if hop.direction == Direction::Reverse && !self.bidirectional {
            return false;
        }
        match &self.matcher {
            StepMatcher::Any => true,
            StepMatcher::Type(t) => hop.edge.rel_type == *t,
        }
    }
}

/// Direction the model must load for `steps`.
pub fn chain_direction(steps: &[ChainStep]) -> Direction {
    if steps.iter().any(|s| s.bidirectional) { Direction::Both } else { Direction::Forward }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainMatch {
    pub terminal: NodeId,
    pub path: Path,
}

/// All simple paths from `start` whose i-th hop satisfies `steps[i]`.
/// Sorted by (terminal, node ids, edge types), at most `max_results`.
pub async fn relationship_chain<A: GraphAccessor>(
    model: &mut GraphModel<A>,
    start: &NodeId,
    steps: &[ChainStep],
    max_results: usize,
    budget: &Budget,
) -> Result<Bounded<Vec<ChainMatch>>> {
    let mut matches = Vec::new();
    let mut reason = None;
    if steps.is_empty() {
        return Ok(Bounded::complete(matches));
    }

    let mut on_path: HashSet<NodeId> = HashSet::new();
    on_path.insert(start.clone());
    let mut trail: Vec<Hop> = Vec::new();
    // candidates[i]: admissible hops for step i from the current node
    let mut candidates: Vec<(Vec<Hop>, usize)> = vec![(candidates_for(model, start, &steps[0]).await?, 0)];
    let mut expanded = 1usize;

    while let Some((hops, next)) = candidates.last_mut() {
        let Some(hop) = hops.get(*next).cloned() else {
            candidates.pop();
            if let Some(hop) = trail.pop() {
                on_path.remove(&hop.neighbor);
            }
            if candidates.is_empty() {
                break;
            }
            if let Some(r) = budget.interrupted(expanded) {
                reason = Some(r);
                break;
            }
            continue;
        };
        *next += 1;
        if on_path.contains(&hop.neighbor) {
            continue;
        }

        let depth = trail.len() + 1;
        if depth == steps.len() {
            trail.push(hop);
            let path = path_of(start, &trail);
            trail.pop();
            matches.push(ChainMatch { terminal: path.end().clone(), path });
            if matches.len() >= max_results {
                reason = Some(TruncationReason::ResultLimit);
                break;
            }
            continue;
        }
        if let Some(r) = budget.exhausted(expanded) {
            reason = Some(r);
            break;
        }

        let hops = candidates_for(model, &hop.neighbor, &steps[depth]).await?;
        expanded += 1;
        on_path.insert(hop.neighbor.clone());
        trail.push(hop);
        candidates.push((hops, 0));
    }

    matches.sort_by(|a, b| {
        let types = |m: &ChainMatch| m.path.edges.iter().map(|e| e.rel_type.clone()).collect::<Vec<_>>();
        (&a.terminal, &a.path.nodes, types(a)).cmp(&(&b.terminal, &b.path.nodes, types(b)))
    });
    Ok(Bounded::cut(matches, reason))
}

async fn candidates_for<A: GraphAccessor>(
    model: &mut GraphModel<A>,
    node: &NodeId,
    step: &ChainStep,
) -> Result<Vec<Hop>> {
    let mut hops = model.edges_from(node).await?;
    hops.retain(|h| step.accepts(h));
    Ok(hops)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::accessor::{Accessor, MemoryAccessor};
    use crate::graph::EdgeFilter;

    fn model(edges: &[(&str, &str, &str)], steps: &[ChainStep]) -> GraphModel<MemoryAccessor> {
        let db = MemoryAccessor::new();
        for (s, t, ty) in edges {
            db.insert_edge(Edge::new(*s, *t, *ty, Strength::Primary));
        }
        let acc = Accessor::new(Arc::new(db), Duration::from_secs(1));
        let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        GraphModel::new(acc, EdgeFilter::new(chain_direction(steps), today))
    }

    fn budget() -> Budget {
        Budget::new(5000, Duration::from_secs(10))
    }

    fn terminals(out: &[ChainMatch]) -> Vec<&str> {
        out.iter().map(|m| m.terminal.as_str()).collect()
    }

    const EDGES: [(&str, &str, &str); 5] = [
        ("person", "ministry", "works_for"),
        ("ministry", "gov", "part_of"),
        ("ministry", "un", "member_of"),
        ("gov", "g20", "member_of"),
        ("other", "ministry", "works_for"),
    ];

    #[tokio::test]
    async fn test_typed_chain() {
        let steps = [ChainStep::of("works_for"), ChainStep::of("part_of")];
        let mut m = model(&EDGES, &steps);
        let out = relationship_chain(&mut m, &"person".into(), &steps, 100, &budget()).await.unwrap();
        assert_eq!(terminals(&out.value), vec!["gov"]);
        assert_eq!(out.value[0].path.len(), 2);
    }

    #[tokio::test]
    async fn test_wildcard_step() {
        let steps = [ChainStep::of("works_for"), ChainStep::of("*")];
        let mut m = model(&EDGES, &steps);
        let out = relationship_chain(&mut m, &"person".into(), &steps, 100, &budget()).await.unwrap();
        assert_eq!(terminals(&out.value), vec!["gov", "un"]);
    }

    #[tokio::test]
    async fn test_bidirectional_step_walks_against_edges() {
        let steps = [ChainStep::of("works_for"), ChainStep::of("works_for").either_way()];
        let mut m = model(&EDGES, &steps);
        let out = relationship_chain(&mut m, &"person".into(), &steps, 100, &budget()).await.unwrap();
        assert_eq!(terminals(&out.value), vec!["other"]);
        assert_eq!(out.value[0].path.directions, vec![Direction::Forward, Direction::Reverse]);
    }

    #[tokio::test]
    async fn test_no_match_is_empty() {
        let steps = [ChainStep::of("part_of")];
        let mut m = model(&EDGES, &steps);
        let out = relationship_chain(&mut m, &"person".into(), &steps, 100, &budget()).await.unwrap();
        assert!(out.value.is_empty());
    }

    #[tokio::test]
    async fn test_result_cap() {
        let steps = [ChainStep::of("works_for"), ChainStep::of("*")];
        let mut m = model(&EDGES, &steps);
        let out = relationship_chain(&mut m, &"person".into(), &steps, 1, &budget()).await.unwrap();
        assert_eq!(out.value.len(), 1);
        assert_eq!(out.reason, Some(TruncationReason::ResultLimit));
    }

    #[test]
    fn step_matcher_wire_form() {
        let step: ChainStep = serde_json::from_str(r#"{"type": "*", "bidirectional": true}"#).unwrap();
        assert_eq!(step.matcher, StepMatcher::Any);
        assert!(step.bidirectional);
        let json = serde_json::to_string(&ChainStep::of("member_of")).unwrap();
        assert_eq!(json, r#"{"type":"member_of","bidirectional":false}"#);
    }
}
