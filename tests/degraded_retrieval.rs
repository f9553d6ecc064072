//! When the vector store's circuit breaker is open, retrieval falls back
//! to the recency-only degraded path instead of failing the request.

mod common;

use common::{test_engine, tool_call};
use serde_json::json;

#[tokio::test]
async fn open_vector_breaker_degrades_retrieval_instead_of_failing() {
    let (engine, _dir) = test_engine().await;

    let store = tool_call(
        "memory",
        json!({
            "action": "store",
            "file_name": "degraded.txt",
            "content": "some content that would normally be found by similarity search",
        }),
    );
    let store_result = engine.dispatcher.handle(store).await.result.unwrap();
    assert_eq!(store_result["degraded"], json!(false));

    for _ in 0..engine.config.breaker_fails {
        engine.state.sync.vector_breaker.record_failure();
    }

    let retrieve = tool_call(
        "memory",
        json!({ "action": "retrieve", "query": "content", "top_k": 5 }),
    );
    let retrieve_result = engine.dispatcher.handle(retrieve).await.result.unwrap();
    assert_eq!(retrieve_result["success"], json!(true));
    assert_eq!(retrieve_result["degraded"], json!(true));

    let chunks = retrieve_result["chunks"].as_array().unwrap();
    assert!(!chunks.is_empty());
}
