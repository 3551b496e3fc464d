//! Simple-path enumeration by iterative DFS with an explicit path stack.

use hashbrown::HashSet;

use crate::accessor::GraphAccessor;
use crate::graph::{GraphModel, Hop};
use crate::model::*;
use crate::Result;

use super::{Bounded, Budget, TruncationReason};

/// Build a [`Path`] from a start node and the hops taken.
pub(crate) fn path_of(start: &NodeId, trail: &[Hop]) -> Path {
    let mut path = Path::single(start.clone());
    for hop in trail {
        path.append(hop.edge.as_ref().clone(), hop.direction, hop.weight, hop.neighbor.clone());
    }
    path
}

struct Frame {
    hops: Vec<Hop>,
    next: usize,
}

/// Every simple path `from → to` of at most `max_length` hops, stopping
/// once `max_paths` are found. Sorted by length, weight, then ids.
pub async fn all_paths<A: GraphAccessor>(
    model: &mut GraphModel<A>,
    from: &NodeId,
    to: &NodeId,
    max_length: u32,
    max_paths: usize,
    budget: &Budget,
) -> Result<Bounded<Vec<Path>>> {
    if from == to {
        return Ok(Bounded::complete(vec![Path::single(from.clone())]));
    }
    let max_length = max_length as usize;
    let mut found = Vec::new();
    let mut reason = None;
    if max_length == 0 || max_paths == 0 {
        return Ok(Bounded::complete(found));
    }

    let mut on_path: HashSet<NodeId> = HashSet::new();
    on_path.insert(from.clone());
    let mut trail: Vec<Hop> = Vec::new();
    let mut stack = vec![Frame { hops: model.hops(from).await?, next: 0 }];
    let mut expanded = 1usize;

    while let Some(frame) = stack.last_mut() {
        let Some(hop) = frame.hops.get(frame.next).cloned() else {
            // Backtrack.
            stack.pop();
            if let Some(hop) = trail.pop() {
                on_path.remove(&hop.neighbor);
            }
            if stack.is_empty() {
                break;
            }
            if let Some(r) = budget.interrupted(expanded) {
                reason = Some(r);
                break;
            }
            continue;
        };
        frame.next += 1;

        if on_path.contains(&hop.neighbor) {
            continue;
        }
        if hop.neighbor == *to {
            trail.push(hop);
            found.push(path_of(from, &trail));
            trail.pop();
            if found.len() >= max_paths {
                reason = Some(TruncationReason::PathLimit);
                break;
            }
            continue;
        }
        if trail.len() + 1 >= max_length {
            continue;
        }
        if let Some(r) = budget.exhausted(expanded) {
            reason = Some(r);
            break;
        }

        let hops = model.hops(&hop.neighbor).await?;
        expanded += 1;
        on_path.insert(hop.neighbor.clone());
        trail.push(hop);
        stack.push(Frame { hops, next: 0 });
    }

    found.sort_by(|a, b| (a.len(), a.total_weight, &a.nodes).cmp(&(b.len(), b.total_weight, &b.nodes)));
    Ok(Bounded::cut(found, reason))
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

    fn model(edges: &[(&str, &str)], direction: Direction) -> GraphModel<MemoryAccessor> {
        let db = MemoryAccessor::new();
        for (s, t) in edges {
            db.insert_edge(Edge::new(*s, *t, "related_to", Strength::Primary));
        }
        let acc = Accessor::new(Arc::new(db), Duration::from_secs(1));
        let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        GraphModel::new(acc, EdgeFilter::new(direction, today))
    }

    fn budget() -> Budget {
        Budget::new(5000, Duration::from_secs(10))
    }

    fn ids(paths: &[Path]) -> Vec<Vec<&str>> {
        paths.iter().map(|p| p.nodes.iter().map(|n| n.as_str()).collect()).collect()
    }

    #[tokio::test]
    async fn test_enumerates_simple_paths_sorted() {
        let edges = [("a", "b"), ("b", "c"), ("a", "c"), ("b", "a"), ("c", "d")];
        let mut m = model(&edges, Direction::Forward);
        let out = all_paths(&mut m, &"a".into(), &"c".into(), 4, 10, &budget()).await.unwrap();
        assert_eq!(ids(&out.value), vec![vec!["a", "c"], vec!["a", "b", "c"]]);
        assert!(out.reason.is_none());
        assert!(out.value.iter().all(Path::is_simple));
    }

    #[tokio::test]
    async fn test_max_length_bounds_each_branch() {
        let edges = [("a", "b"), ("b", "c"), ("c", "d"), ("a", "d")];
        let mut m = model(&edges, Direction::Forward);
        let out = all_paths(&mut m, &"a".into(), &"d".into(), 2, 10, &budget()).await.unwrap();
        assert_eq!(ids(&out.value), vec![vec!["a", "d"]]);
    }

    #[tokio::test]
    async fn test_max_paths_stops_with_path_limit() {
        let edges = [("a", "b"), ("b", "z"), ("a", "c"), ("c", "z"), ("a", "z")];
        let mut m = model(&edges, Direction::Forward);
        let out = all_paths(&mut m, &"a".into(), &"z".into(), 4, 2, &budget()).await.unwrap();
        assert_eq!(out.value.len(), 2);
        assert_eq!(out.reason, Some(TruncationReason::PathLimit));
        assert!(!out.is_partial());
    }

    #[tokio::test]
    async fn test_cyclic_graph_in_both_mode_terminates() {
        let edges = [("a", "b"), ("b", "c"), ("c", "a"), ("c", "d")];
        let mut m = model(&edges, Direction::Both);
        let out = all_paths(&mut m, &"a".into(), &"d".into(), 6, 100, &budget()).await.unwrap();
        assert_eq!(ids(&out.value), vec![vec!["a", "c", "d"], vec!["a", "b", "c", "d"]]);
    }
}
