//! End-to-end: storing a document through the `memory` tool makes it
//! findable through `memory.retrieve`, non-degraded, scored, and
//! attributed to the right file name.

mod common;

use common::{test_engine, tool_call};
use serde_json::json;

#[tokio::test]
async fn stored_document_is_retrievable_by_query() {
    let (engine, _dir) = test_engine().await;

    let store_req = tool_call(
        "memory",
        json!({
            "action": "store",
            "file_name": "notes.txt",
            "content": "The quick brown fox jumps over the lazy dog. Rust is a systems language.",
            "content_type": "document",
        }),
    );
    let store_resp = engine.dispatcher.handle(store_req).await;
    let store_result = store_resp.result.expect("store succeeds");
    assert_eq!(store_result["success"], json!(true));
    assert_eq!(store_result["degraded"], json!(false));

    let retrieve_req = tool_call(
        "memory",
        json!({
            "action": "retrieve",
            "query": "systems language",
            "top_k": 5,
        }),
    );
    let retrieve_resp = engine.dispatcher.handle(retrieve_req).await;
    let retrieve_result = retrieve_resp.result.expect("retrieve succeeds");
    assert_eq!(retrieve_result["success"], json!(true));
    assert_eq!(retrieve_result["degraded"], json!(false));

    let chunks = retrieve_result["chunks"].as_array().expect("chunks array");
    assert!(!chunks.is_empty());
    assert_eq!(chunks[0]["file_name"], json!("notes.txt"));

    let context = retrieve_result["context"].as_str().expect("context string");
    assert!(context.contains("Rust is a systems language"));
}

#[tokio::test]
async fn duplicate_file_name_without_replace_is_already_exists() {
    let (engine, _dir) = test_engine().await;

    let store = |content: &'static str| {
        tool_call(
            "memory",
            json!({ "action": "store", "file_name": "dup.txt", "content": content }),
        )
    };

    let first = engine.dispatcher.handle(store("first version")).await;
    assert_eq!(first.result.unwrap()["success"], json!(true));

    let second = engine.dispatcher.handle(store("second version")).await;
    let second_result = second.result.unwrap();
    assert_eq!(second_result["success"], json!(false));
    assert_eq!(second_result["error_code"], json!(-32603));
}

#[tokio::test]
async fn replace_true_supersedes_the_previous_resource() {
    let (engine, _dir) = test_engine().await;

    let first = tool_call(
        "memory",
        json!({ "action": "store", "file_name": "r.txt", "content": "old content about cats" }),
    );
    engine.dispatcher.handle(first).await;

    let replace = tool_call(
        "memory",
        json!({
            "action": "store",
            "file_name": "r.txt",
            "content": "new content about submarines",
            "replace": true,
        }),
    );
    let replace_resp = engine.dispatcher.handle(replace).await;
    assert_eq!(replace_resp.result.unwrap()["success"], json!(true));

    let retrieve = tool_call(
        "memory",
        json!({ "action": "retrieve", "query": "submarines", "top_k": 5 }),
    );
    let retrieve_resp = engine.dispatcher.handle(retrieve).await;
    let result = retrieve_resp.result.unwrap();
    let chunks = result["chunks"].as_array().unwrap();
    assert!(!chunks.is_empty());
}
