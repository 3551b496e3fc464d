//! Node budgets across every operation, plus the complexity pre-check.
//!
//! A budget trip never fails a query: the response is `partial` with
//! reason `nodeBudget`, and a search that was cut short never claims the
//! endpoints are disconnected.

use pretty_assertions::assert_eq;

use dossier_graph::{
    AllPathsRequest, ChainStep, CommonConnectionsRequest, ConnectedEntitiesRequest,
    DetectCyclesRequest, DossierType, Edge, Engine, EstimateComplexityRequest, MemoryAccessor,
    Node, RelationshipChainRequest, ShortestPathRequest, StatisticsRequest, StatsScope, Strength,
    TraverseRequest, TruncationReason,
};

// ============================================================================
// Fixtures
// ============================================================================

/// A -> B (primary), B -> C (primary), A -> D (observer), D -> C (secondary)
fn scenario() -> Engine<MemoryAccessor> {
    let db = MemoryAccessor::from_parts(
        [
            Node::new("A", DossierType::Country),
            Node::new("B", DossierType::Organization),
            Node::new("C", DossierType::Forum),
            Node::new("D", DossierType::Organization),
        ],
        [
            Edge::new("A", "B", "member_of", Strength::Primary),
            Edge::new("B", "C", "member_of", Strength::Primary),
            Edge::new("A", "D", "partnership", Strength::Observer),
            Edge::new("D", "C", "member_of", Strength::Secondary),
        ],
    );
    Engine::with_defaults(db)
}

/// n0 -> n1 -> ... -> n5
fn line() -> Engine<MemoryAccessor> {
    let db = MemoryAccessor::new();
    for i in 0..6 {
        db.insert_node(Node::new(format!("n{i}"), DossierType::Topic));
    }
    for i in 1..6 {
        db.insert_edge(Edge::new(format!("n{}", i - 1), format!("n{i}"), "related_to", Strength::Primary));
    }
    Engine::with_defaults(db)
}

/// hub -> leaf000 .. leaf099
fn star() -> Engine<MemoryAccessor> {
    let db = MemoryAccessor::new();
    db.insert_node(Node::new("hub", DossierType::Forum));
    for i in 0..100 {
        let leaf = format!("leaf{i:03}");
        db.insert_node(Node::new(leaf.clone(), DossierType::Country));
        db.insert_edge(Edge::new("hub", leaf, "member_of", Strength::Primary));
    }
    Engine::with_defaults(db)
}

// ============================================================================
// 1. BFS operations
// ============================================================================

#[tokio::test]
async fn test_traverse_caps_a_wide_level() {
    let mut req = TraverseRequest::new("hub", 1);
    req.options.max_nodes_visited = Some(10);
    let resp = star().traverse(&req).await.unwrap();
    assert!(resp.partial);
    assert_eq!(resp.reason, Some(TruncationReason::NodeBudget));
    assert!(resp.result.len() < 10);
}

#[tokio::test]
async fn test_connected_entities_caps_a_wide_level() {
    let mut req = ConnectedEntitiesRequest::new("hub", 1, 1);
    req.options.max_nodes_visited = Some(10);
    let resp = star().connected_entities(&req).await.unwrap();
    assert!(resp.partial);
    assert_eq!(resp.reason, Some(TruncationReason::NodeBudget));
    assert!(resp.result.len() < 10);
}

#[tokio::test]
async fn test_common_connections_cut_short_is_not_unreachable() {
    let mut req = CommonConnectionsRequest::new("n0", "n4", 3);
    req.options.max_nodes_visited = Some(2);
    let resp = line().common_connections(&req).await.unwrap();
    assert!(resp.partial);
    assert_eq!(resp.reason, Some(TruncationReason::NodeBudget));
    assert!(!resp.result.unreachable);
}

#[tokio::test]
async fn test_statistics_over_cut_neighborhood_is_partial() {
    let mut req = StatisticsRequest::new(StatsScope::Neighborhood { seed: "hub".into(), degree: 1 });
    req.options.max_nodes_visited = Some(10);
    let resp = star().statistics(&req).await.unwrap();
    assert!(resp.partial);
    assert_eq!(resp.reason, Some(TruncationReason::NodeBudget));
    assert!(resp.result.node_count <= 10);
}

// ============================================================================
// 2. Shortest path
// ============================================================================

#[tokio::test]
async fn test_shortest_path_cut_short_is_not_unreachable() {
    for weighted in [false, true] {
        let mut req = ShortestPathRequest::new("n0", "n5");
        req.weighted = weighted;
        req.options.max_nodes_visited = Some(2);
        let resp = line().shortest_path(&req).await.unwrap();
        assert!(resp.partial, "weighted={weighted}");
        assert_eq!(resp.reason, Some(TruncationReason::NodeBudget));
        assert!(resp.result.path.is_none());
        assert!(!resp.result.unreachable, "weighted={weighted}");
    }
}

#[tokio::test]
async fn test_shortest_path_json_cut_short_is_partial() {
    let body = line()
        .handle_json(r#"{"operation": "shortest-path", "fromId": "n0", "toId": "n5", "maxNodesVisited": 2}"#)
        .await;
    let v: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(v["partial"], true);
    assert_eq!(v["reason"], "nodeBudget");
    assert_eq!(v["result"]["unreachable"], false);
}

// ============================================================================
// 3. DFS operations
// ============================================================================

#[tokio::test]
async fn test_all_paths_node_budget() {
    let mut req = AllPathsRequest::new("A", "C", 3, 10);
    req.options.max_nodes_visited = Some(2);
    let resp = scenario().all_paths(&req).await.unwrap();
    assert!(resp.partial);
    assert_eq!(resp.reason, Some(TruncationReason::NodeBudget));
    let walks: Vec<Vec<&str>> =
        resp.result.iter().map(|p| p.nodes.iter().map(|n| n.as_str()).collect()).collect();
    assert_eq!(walks, vec![vec!["A", "B", "C"]]);
}

#[tokio::test]
async fn test_relationship_chain_node_budget() {
    let mut req = RelationshipChainRequest::new(
        "A",
        vec![ChainStep::of("member_of"), ChainStep::of("member_of")],
    );
    req.options.max_nodes_visited = Some(1);
    let resp = scenario().relationship_chain(&req).await.unwrap();
    assert!(resp.partial);
    assert_eq!(resp.reason, Some(TruncationReason::NodeBudget));
    assert!(resp.result.is_empty());
}

#[tokio::test]
async fn test_detect_cycles_node_budget() {
    let engine = scenario();
    engine.store().insert_edge(Edge::new("C", "A", "related_to", Strength::Observer));
    let mut req = DetectCyclesRequest::new("A");
    req.options.max_nodes_visited = Some(2);
    let resp = engine.detect_cycles(&req).await.unwrap();
    assert!(resp.partial);
    assert_eq!(resp.reason, Some(TruncationReason::NodeBudget));
    assert!(resp.result.is_empty());
}

// ============================================================================
// 4. Complexity pre-check
// ============================================================================

#[tokio::test]
async fn test_estimate_complexity_against_budget() {
    let engine = star();
    let resp = engine.estimate_complexity(&EstimateComplexityRequest::new("hub", 2)).await.unwrap();
    assert_eq!(resp.result.neighbor_count, 100);
    assert_eq!(resp.result.estimated_nodes, 10_000);
    assert!(!resp.result.within_budget);
    assert!(!resp.partial);

    let resp = engine.estimate_complexity(&EstimateComplexityRequest::new("hub", 1)).await.unwrap();
    assert!(resp.result.within_budget);
}

#[tokio::test]
async fn test_estimate_complexity_over_json() {
    let body = star()
        .handle_json(r#"{"operation": "estimate-complexity", "startId": "hub", "degree": 1}"#)
        .await;
    let v: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(v["result"]["neighborCount"], 100);
    assert_eq!(v["result"]["estimatedNodes"], 100);
    assert_eq!(v["result"]["maxNodesVisited"], 5000);
    assert_eq!(v["result"]["withinBudget"], true);
}
