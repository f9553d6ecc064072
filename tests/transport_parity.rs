//! The optional HTTP surface must answer `POST /jsonrpc` with exactly the
//! same tool-result shape the stdio transport produces for an identical
//! envelope, since both delegate to the same `ToolDispatcher::handle`.

#![cfg(feature = "http")]

mod common;

use common::test_engine;
use ltmc::ltmc::http::router;
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn http_jsonrpc_matches_stdio_dispatch() {
    let (engine, _dir) = test_engine().await;
    let engine = std::sync::Arc::new(engine);

    let envelope = serde_json::json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "tools/call",
        "params": { "name": "todo", "arguments": { "action": "add", "title": "ship it", "description": "finish the thing" } },
    });

    let stdio_request: ltmc::ltmc::rpc::protocol::JsonRpcRequest =
        serde_json::from_value(envelope.clone()).unwrap();
    let stdio_response = engine.dispatcher.handle(stdio_request).await;
    let stdio_value = serde_json::to_value(&stdio_response).unwrap();

    let app = router(engine.clone());
    let http_request = axum::http::Request::builder()
        .method("POST")
        .uri("/jsonrpc")
        .header("content-type", "application/json")
        .body(axum::body::Body::from(envelope.to_string()))
        .unwrap();
    let http_response = app.oneshot(http_request).await.unwrap();
    assert_eq!(http_response.status(), axum::http::StatusCode::OK);
    let http_value = body_json(http_response).await;

    assert_eq!(http_value, stdio_value);
}

#[tokio::test]
async fn http_health_mirrors_the_dispatcher_health_snapshot() {
    let (engine, _dir) = test_engine().await;
    let engine = std::sync::Arc::new(engine);
    let app = router(engine);

    let request = axum::http::Request::builder()
        .method("GET")
        .uri("/health")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::OK);
    let value = body_json(response).await;
    assert!(value.get("store_liveness").is_some());
    assert!(value.get("breaker_states").is_some());
}

#[tokio::test]
async fn http_tools_list_matches_tools_list_rpc_method() {
    let (engine, _dir) = test_engine().await;
    let engine = std::sync::Arc::new(engine);

    let rpc_request = ltmc::ltmc::rpc::protocol::JsonRpcRequest {
        jsonrpc: Some("2.0".to_string()),
        id: Some(serde_json::json!(1)),
        method: "tools/list".to_string(),
        params: serde_json::Value::Null,
    };
    let rpc_response = engine.dispatcher.handle(rpc_request).await;
    let rpc_tools = rpc_response.result.unwrap();

    let app = router(engine);
    let request = axum::http::Request::builder()
        .method("GET")
        .uri("/tools")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let http_tools = body_json(response).await;

    assert_eq!(http_tools, rpc_tools);
}
