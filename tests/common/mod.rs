//! Shared harness for integration tests: spins up a full `LtmcEngine` over
//! a throwaway directory so every test gets its own relational/vector/graph
//! files instead of colliding on the defaults.

use ltmc::{Config, LtmcEngine};

pub async fn test_engine() -> (LtmcEngine, tempfile::TempDir) {
    test_engine_with(|_| {}).await
}

/// Same as [`test_engine`], but lets the caller tweak the config before
/// startup (e.g. to turn on the embedded graph store for a test).
pub async fn test_engine_with(customize: impl FnOnce(&mut Config)) -> (LtmcEngine, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = Config::default();
    config.db_path = dir.path().join("ltmc.db").to_string_lossy().into_owned();
    config.vector_index_path = dir.path().join("ltmc.vec").to_string_lossy().into_owned();
    config.graph_uri = dir.path().join("ltmc.graph").to_string_lossy().into_owned();
    config.embedding_dim = 16;
    customize(&mut config);

    let engine = LtmcEngine::start(config).await.expect("engine starts");
    (engine, dir)
}

pub fn tool_call(name: &str, arguments: serde_json::Value) -> ltmc::ltmc::rpc::protocol::JsonRpcRequest {
    ltmc::ltmc::rpc::protocol::JsonRpcRequest {
        jsonrpc: Some("2.0".to_string()),
        id: Some(serde_json::json!(1)),
        method: "tools/call".to_string(),
        params: serde_json::json!({ "name": name, "arguments": arguments }),
    }
}
