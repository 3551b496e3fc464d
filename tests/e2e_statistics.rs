//! End-to-end tests for network statistics.

use pretty_assertions::assert_eq;

use dossier_graph::{
    DossierType, Edge, Engine, MemoryAccessor, Node, StatisticsRequest, StatsScope, Strength,
};

fn star() -> Engine<MemoryAccessor> {
    let db = MemoryAccessor::new();
    db.insert_node(Node::new("hub", DossierType::Forum).with_label("Hub"));
    for leaf in ["l1", "l2", "l3", "l4"] {
        db.insert_node(Node::new(leaf, DossierType::Country));
        db.insert_edge(Edge::new("hub", leaf, "member_of", Strength::Primary));
    }
    db.insert_node(Node::new("iso", DossierType::Person));
    Engine::with_defaults(db)
}

fn neighborhood(seed: &str, degree: u32) -> StatisticsRequest {
    StatisticsRequest::new(StatsScope::Neighborhood { seed: seed.into(), degree })
}

#[tokio::test]
async fn test_star_neighborhood() {
    let engine = star();
    let resp = engine.statistics(&neighborhood("hub", 1)).await.unwrap();
    let stats = resp.result;

    assert!(!resp.partial);
    assert_eq!(stats.node_count, 5);
    assert_eq!(stats.edge_count, 4);
    assert_eq!(stats.max_degree, 4);
    assert_eq!(stats.isolated_count, 0);
    assert_eq!(stats.component_count, 1);
    assert_eq!(stats.degree_histogram.into_iter().collect::<Vec<_>>(), vec![(1, 4), (4, 1)]);
    assert!((stats.density - 0.2).abs() < 1e-9);
    assert!((stats.avg_degree - 1.6).abs() < 1e-9);
    assert_eq!(stats.type_distribution.get(&DossierType::Country), Some(&4));
    assert_eq!(stats.relationship_distribution.values().copied().collect::<Vec<_>>(), vec![4]);

    assert_eq!(stats.key_connectors.len(), 1);
    assert_eq!(stats.key_connectors[0].id.as_str(), "hub");
    assert_eq!(stats.key_connectors[0].label, "Hub");
}

#[tokio::test]
async fn test_explicit_node_set_counts_isolated_and_components() {
    let engine = star();
    let req = StatisticsRequest::new(StatsScope::Nodes {
        ids: vec!["l1".into(), "hub".into(), "iso".into()],
    });
    let stats = engine.statistics(&req).await.unwrap().result;
    assert_eq!(stats.node_count, 3);
    assert_eq!(stats.edge_count, 1);
    assert_eq!(stats.isolated_count, 1);
    assert_eq!(stats.component_count, 2);
}

#[tokio::test]
async fn test_single_node_scope() {
    let engine = star();
    let stats = engine.statistics(&neighborhood("iso", 3)).await.unwrap().result;
    assert_eq!(stats.node_count, 1);
    assert_eq!(stats.edge_count, 0);
    assert_eq!(stats.density, 0.0);
    assert!(stats.key_connectors.is_empty());
}

#[tokio::test]
async fn test_unknown_scope_node_is_not_found() {
    let engine = star();
    let req = StatisticsRequest::new(StatsScope::Nodes { ids: vec!["hub".into(), "ghost".into()] });
    let err = engine.statistics(&req).await.unwrap_err();
    assert_eq!(err.code(), "NODE_NOT_FOUND");
}

#[tokio::test]
async fn test_statistics_are_reproducible() {
    let db = MemoryAccessor::new();
    for i in 0..30 {
        db.insert_node(Node::new(format!("n{i:02}"), DossierType::Organization));
    }
    for i in 0..30 {
        for step in [1, 7] {
            db.insert_edge(Edge::new(
                format!("n{i:02}"),
                format!("n{:02}", (i + step) % 30),
                "partnership",
                Strength::Secondary,
            ));
        }
    }
    let engine = Engine::with_defaults(db);

    let first = engine.statistics(&neighborhood("n00", 6)).await.unwrap().result;
    let second = engine.statistics(&neighborhood("n00", 6)).await.unwrap().result;
    assert_eq!(first, second);
    assert_eq!(first.sampled_pairs, 64);
    assert_eq!(first.seed, 42);
    assert!(!first.key_connectors.is_empty());
}
