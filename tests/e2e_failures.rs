//! Failure modes: store outages, timeouts, concurrency and cache
//! invalidation.

use std::time::Duration;

use pretty_assertions::assert_eq;

use dossier_graph::{
    DossierType, Edge, Engine, EngineConfig, MemoryAccessor, Node, NodeId, Strength,
    TraverseRequest, TruncationReason,
};

fn chain(n: usize) -> MemoryAccessor {
    let db = MemoryAccessor::new();
    for i in 0..n {
        db.insert_node(Node::new(format!("n{i:02}"), DossierType::Topic));
    }
    for i in 1..n {
        db.insert_edge(Edge::new(format!("n{:02}", i - 1), format!("n{i:02}"), "related_to", Strength::Primary));
    }
    db
}

fn reached(resp: &dossier_graph::Response<Vec<dossier_graph::ReachedNode>>) -> Vec<String> {
    resp.result.iter().map(|n| n.id.to_string()).collect()
}

#[tokio::test]
async fn test_outage_is_accessor_unavailable() {
    let engine = Engine::with_defaults(chain(4));
    engine.store().set_unavailable(true);

    let err = engine.traverse(&TraverseRequest::new("n00", 2)).await.unwrap_err();
    assert_eq!(err.code(), "ACCESSOR_UNAVAILABLE");
    assert!(err.is_retryable());

    let body = engine.handle_json(r#"{"operation": "traverse", "startId": "n00"}"#).await;
    let v: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(v["error"]["code"], "ACCESSOR_UNAVAILABLE");

    engine.store().set_unavailable(false);
    assert!(engine.traverse(&TraverseRequest::new("n00", 2)).await.is_ok());
}

#[tokio::test]
async fn test_slow_accessor_call_times_out() {
    let config = EngineConfig { accessor_timeout_ms: 20, ..EngineConfig::default() };
    let engine = Engine::new(chain(4), config).unwrap();
    engine.store().set_latency(Duration::from_millis(200));

    let err = engine.traverse(&TraverseRequest::new("n00", 2)).await.unwrap_err();
    assert_eq!(err.code(), "ACCESSOR_UNAVAILABLE");
    assert!(err.to_string().contains("timed out"));
}

#[tokio::test]
async fn test_query_timeout_gives_partial_result() {
    let engine = Engine::with_defaults(chain(20));
    engine.store().set_latency(Duration::from_millis(30));

    let mut req = TraverseRequest::new("n00", 6);
    req.options.timeout_ms = Some(50);
    let resp = engine.traverse(&req).await.unwrap();
    assert!(resp.partial);
    assert_eq!(resp.reason, Some(TruncationReason::Timeout));
    assert!(resp.result.len() < 6);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_queries_share_engine() {
    let engine = Engine::with_defaults(chain(12));
    let expected = reached(&engine.traverse(&TraverseRequest::new("n00", 5)).await.unwrap());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let engine = engine.clone();
            tokio::spawn(async move { engine.traverse(&TraverseRequest::new("n00", 5)).await })
        })
        .collect();
    for handle in handles {
        let resp = handle.await.unwrap().unwrap();
        assert_eq!(reached(&resp), expected);
    }
}

#[tokio::test]
async fn test_invalidate_drops_cached_neighbors() {
    let engine = Engine::with_defaults(chain(3));
    let first = engine.traverse(&TraverseRequest::new("n00", 1)).await.unwrap();
    assert_eq!(reached(&first), vec!["n01"]);

    engine.store().insert_node(Node::new("extra", DossierType::Topic));
    engine.store().insert_edge(Edge::new("n00", "extra", "related_to", Strength::Observer));

    let cached = engine.traverse(&TraverseRequest::new("n00", 1)).await.unwrap();
    assert_eq!(reached(&cached), vec!["n01"]);

    engine.invalidate(&NodeId::from("n00"));
    let fresh = engine.traverse(&TraverseRequest::new("n00", 1)).await.unwrap();
    assert_eq!(reached(&fresh), vec!["extra", "n01"]);
}
