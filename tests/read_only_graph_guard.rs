//! The `graph` tool's `query` action only accepts read-shaped traversals;
//! anything containing a write keyword is rejected before it reaches the
//! graph store.

mod common;

use common::{test_engine, test_engine_with, tool_call};
use serde_json::json;

#[tokio::test]
async fn read_only_query_is_accepted() {
    let (engine, _dir) = test_engine().await;

    let query = tool_call("graph", json!({ "action": "query", "text": "MATCH (n) RETURN n" }));
    let result = engine.dispatcher.handle(query).await.result.unwrap();
    assert_eq!(result["success"], json!(true));
    assert_eq!(result["accepted"], json!(true));
}

#[tokio::test]
async fn write_shaped_query_is_rejected() {
    let (engine, _dir) = test_engine().await;

    let query = tool_call("graph", json!({ "action": "query", "text": "MATCH (n) DELETE n" }));
    let result = engine.dispatcher.handle(query).await.result.unwrap();
    assert_eq!(result["success"], json!(false));
    assert!(result["error"].as_str().unwrap().contains("delete"));
}

#[tokio::test]
async fn link_and_get_relationships_round_trip() {
    let (engine, _dir) = test_engine_with(|c| c.graph_enabled = true).await;

    for name in ["a.txt", "b.txt"] {
        let store = tool_call("memory", json!({ "action": "store", "file_name": name, "content": "body" }));
        let result = engine.dispatcher.handle(store).await.result.unwrap();
        assert_eq!(result["success"], json!(true));
    }

    let link = tool_call(
        "graph",
        json!({ "action": "link", "src": "resource:1", "dst": "resource:2", "relation_type": "references" }),
    );
    let link_result = engine.dispatcher.handle(link).await.result.unwrap();
    assert_eq!(link_result["linked"], json!(true));
    assert_eq!(link_result["degraded"], json!(false));

    let get = tool_call("graph", json!({ "action": "get_relationships", "id": "resource:1" }));
    let get_result = engine.dispatcher.handle(get).await.result.unwrap();
    assert_eq!(get_result["success"], json!(true));
    let relations = get_result["relations"].as_array().unwrap();
    assert_eq!(relations.len(), 1);
    assert_eq!(relations[0]["dst"], json!("resource:2"));
}

#[tokio::test]
async fn link_with_unknown_endpoints_is_degraded() {
    let (engine, _dir) = test_engine_with(|c| c.graph_enabled = true).await;

    let link = tool_call(
        "graph",
        json!({ "action": "link", "src": "resource:1", "dst": "resource:2", "relation_type": "references" }),
    );
    let link_result = engine.dispatcher.handle(link).await.result.unwrap();
    assert_eq!(link_result["linked"], json!(false));
    assert_eq!(link_result["degraded"], json!(true));
}
