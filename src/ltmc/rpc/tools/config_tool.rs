//! `config` tool (§4.14): `get_schema`, `validate_config`, `get_retrieval_weights`,
//! `set_retrieval_weights`, `export_config`.

use crate::ltmc::error::LtmcError;
use crate::ltmc::rpc::tool_protocol::{err, ok, ToolHandler, ToolMetadata};
use crate::ltmc::rpc::tools::AppState;
use crate::ltmc::store::RetrievalWeights;
use async_trait::async_trait;
use serde_json::{json, Value};

pub struct ConfigTool {
    state: AppState,
}

impl ConfigTool {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

fn recognized_options() -> Value {
    json!([
        "DB_PATH", "VECTOR_INDEX_PATH", "EMBEDDING_DIM",
        "CACHE_HOST", "CACHE_PORT", "CACHE_PASSWORD", "CACHE_ENABLED",
        "GRAPH_URI", "GRAPH_USER", "GRAPH_PASSWORD", "GRAPH_ENABLED",
        "CHUNK_SIZE", "CHUNK_OVERLAP",
        "RANK_ALPHA", "RANK_BETA", "RANK_GAMMA", "RANK_DELTA", "RANK_EPSILON",
        "OVERFETCH", "RECENCY_TAU",
        "BREAKER_FAILS", "BREAKER_COOLDOWN_S",
        "ENABLE_AUTH", "API_TOKEN",
    ])
}

#[async_trait]
impl ToolHandler for ConfigTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            name: "config",
            description: "Inspect recognized configuration and the hybrid-retrieval weights.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "action": {"enum": [
                        "get_schema", "validate_config", "get_retrieval_weights",
                        "set_retrieval_weights", "export_config"
                    ]}
                },
                "required": ["action"]
            }),
        }
    }

    async fn call(&self, action: &str, arguments: &Value) -> Value {
        let db = &self.state.sync.db;
        match action {
            "get_schema" => ok(json!({ "options": recognized_options() })),
            "validate_config" => match crate::ltmc::config::Config::from_env() {
                Ok(_) => ok(json!({ "valid": true })),
                Err(e) => ok(json!({ "valid": false, "error": e.to_string() })),
            },
            "get_retrieval_weights" => match db.get_retrieval_weights() {
                Ok(w) => ok(json!({
                    "alpha": w.alpha, "beta": w.beta, "gamma": w.gamma,
                    "delta": w.delta, "epsilon": w.epsilon,
                })),
                Err(e) => err(&e),
            },
            "set_retrieval_weights" => {
                let get = |k: &str| arguments.get(k).and_then(Value::as_f64);
                let current = match db.get_retrieval_weights() {
                    Ok(w) => w,
                    Err(e) => return err(&e),
                };
                let weights = RetrievalWeights {
                    alpha: get("alpha").unwrap_or(current.alpha),
                    beta: get("beta").unwrap_or(current.beta),
                    gamma: get("gamma").unwrap_or(current.gamma),
                    delta: get("delta").unwrap_or(current.delta),
                    epsilon: get("epsilon").unwrap_or(current.epsilon),
                };
                match db.set_retrieval_weights(&weights) {
                    Ok(()) => ok(json!({
                        "alpha": weights.alpha, "beta": weights.beta, "gamma": weights.gamma,
                        "delta": weights.delta, "epsilon": weights.epsilon,
                    })),
                    Err(e) => err(&e),
                }
            }
            "export_config" => match db.get_retrieval_weights() {
                Ok(w) => ok(json!({
                    "options": recognized_options(),
                    "retrieval_weights": {
                        "alpha": w.alpha, "beta": w.beta, "gamma": w.gamma,
                        "delta": w.delta, "epsilon": w.epsilon,
                    },
                })),
                Err(e) => err(&e),
            },
            other => err(&LtmcError::InvalidParams(format!("unknown config action: {other}"))),
        }
    }
}
