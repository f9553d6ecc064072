//! End-to-end: three chained thoughts created through the `thought` tool
//! form a single analyzable chain with monotone step numbers.

mod common;

use common::{test_engine, tool_call};
use serde_json::json;

#[tokio::test]
async fn three_chained_thoughts_form_one_chain() {
    let (engine, _dir) = test_engine().await;

    let create = tool_call(
        "thought",
        json!({
            "action": "create",
            "session_id": "sess-abc",
            "content": "what problem are we solving?",
            "kind": "problem",
        }),
    );
    let first = engine.dispatcher.handle(create).await.result.unwrap();
    assert_eq!(first["success"], json!(true));
    let first_ulid = first["ulid"].as_str().unwrap().to_string();

    let create2 = tool_call(
        "thought",
        json!({
            "action": "create",
            "session_id": "sess-abc",
            "content": "here's an intermediate step",
            "kind": "intermediate",
            "previous_thought_id": first_ulid,
        }),
    );
    let second = engine.dispatcher.handle(create2).await.result.unwrap();
    assert_eq!(second["success"], json!(true));
    let second_ulid = second["ulid"].as_str().unwrap().to_string();

    let create3 = tool_call(
        "thought",
        json!({
            "action": "create",
            "session_id": "sess-abc",
            "content": "therefore the conclusion is reached",
            "kind": "conclusion",
            "previous_thought_id": second_ulid,
        }),
    );
    let third = engine.dispatcher.handle(create3).await.result.unwrap();
    assert_eq!(third["success"], json!(true));

    let analyze = tool_call("thought", json!({ "action": "analyze_chain", "session_id": "sess-abc" }));
    let analysis = engine.dispatcher.handle(analyze).await.result.unwrap();
    assert_eq!(analysis["success"], json!(true));
    assert_eq!(analysis["chain_length"], json!(3));
    assert_eq!(analysis["analysis"]["has_problem_definition"], json!(true));
    assert_eq!(analysis["analysis"]["has_conclusion"], json!(true));
}

#[tokio::test]
async fn step_number_must_follow_previous_step() {
    let (engine, _dir) = test_engine().await;

    let first = tool_call(
        "thought",
        json!({
            "action": "create",
            "session_id": "sess-skip",
            "content": "first",
            "kind": "problem",
        }),
    );
    let first_result = engine.dispatcher.handle(first).await.result.unwrap();
    let first_ulid = first_result["ulid"].as_str().unwrap().to_string();

    let bad_next = tool_call(
        "thought",
        json!({
            "action": "create",
            "session_id": "sess-skip",
            "content": "skips a step",
            "kind": "intermediate",
            "previous_thought_id": first_ulid,
            "step_number": 5,
        }),
    );
    let bad_result = engine.dispatcher.handle(bad_next).await.result.unwrap();
    assert_eq!(bad_result["success"], json!(false));
}

#[tokio::test]
async fn find_similar_surfaces_thought_content() {
    let (engine, _dir) = test_engine().await;

    let create = tool_call(
        "thought",
        json!({
            "action": "create",
            "session_id": "sess-find",
            "content": "the rocket equation governs delta-v budgets",
            "kind": "problem",
        }),
    );
    engine.dispatcher.handle(create).await;

    let find = tool_call("thought", json!({ "action": "find_similar", "query": "delta-v budgets", "k": 3 }));
    let result = engine.dispatcher.handle(find).await.result.unwrap();
    assert_eq!(result["success"], json!(true));
    let hits = result["similar_thoughts"].as_array().unwrap();
    assert!(hits.len() <= 3);
    assert!(!hits.is_empty());
    assert_eq!(hits[0]["session_id"], json!("sess-find"));
    assert!(hits[0]["session_preview"]
        .as_str()
        .unwrap()
        .contains("delta-v budgets"));
    assert!(hits[0].get("chain").is_none());
}

#[tokio::test]
async fn find_similar_with_include_chains_attaches_the_full_chain() {
    let (engine, _dir) = test_engine().await;

    let first = tool_call(
        "thought",
        json!({
            "action": "create",
            "session_id": "sess-chain-preview",
            "content": "what is the orbital insertion problem",
            "kind": "problem",
        }),
    );
    let first_result = engine.dispatcher.handle(first).await.result.unwrap();
    let first_ulid = first_result["ulid"].as_str().unwrap().to_string();

    let second = tool_call(
        "thought",
        json!({
            "action": "create",
            "session_id": "sess-chain-preview",
            "content": "therefore we burn at perigee",
            "kind": "conclusion",
            "previous_thought_id": first_ulid,
        }),
    );
    engine.dispatcher.handle(second).await;

    let find = tool_call(
        "thought",
        json!({ "action": "find_similar", "query": "orbital insertion", "k": 3, "include_chains": true }),
    );
    let result = engine.dispatcher.handle(find).await.result.unwrap();
    let hits = result["similar_thoughts"].as_array().unwrap();
    assert!(!hits.is_empty());
    let chain = &hits[0]["chain"];
    assert!(!chain.is_null());
    assert_eq!(chain["chain_length"], json!(2));
}

#[tokio::test]
async fn archive_session_removes_its_thoughts_from_retrieval() {
    let (engine, _dir) = test_engine().await;

    let create = tool_call(
        "thought",
        json!({
            "action": "create",
            "session_id": "sess-archive",
            "content": "a thought about supercooled helium",
            "kind": "problem",
        }),
    );
    engine.dispatcher.handle(create).await;

    let find_before = tool_call(
        "thought",
        json!({ "action": "find_similar", "query": "supercooled helium", "k": 3 }),
    );
    let before = engine.dispatcher.handle(find_before).await.result.unwrap();
    assert!(!before["similar_thoughts"].as_array().unwrap().is_empty());

    let archive = tool_call("thought", json!({ "action": "archive_session", "session_id": "sess-archive" }));
    let archive_result = engine.dispatcher.handle(archive).await.result.unwrap();
    assert_eq!(archive_result["success"], json!(true));
    assert_eq!(archive_result["archived_count"], json!(1));

    let find_after = tool_call(
        "thought",
        json!({ "action": "find_similar", "query": "supercooled helium", "k": 3 }),
    );
    let after = engine.dispatcher.handle(find_after).await.result.unwrap();
    assert!(after["similar_thoughts"].as_array().unwrap().is_empty());
}
