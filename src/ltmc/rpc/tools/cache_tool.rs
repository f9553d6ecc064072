//! `cache` tool (§4.4, §4.15): `get`, `set`, `del`, `flush`, `stats`, `health_check`.

use crate::ltmc::error::LtmcError;
use crate::ltmc::rpc::tool_protocol::{err, err_str, ok, optional_u64, require_str, ToolHandler, ToolMetadata};
use crate::ltmc::rpc::tools::AppState;
use async_trait::async_trait;
use serde_json::{json, Value};

pub struct CacheTool {
    state: AppState,
}

impl CacheTool {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl ToolHandler for CacheTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            name: "cache",
            description: "Read and write hot key/value state; report health.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "action": {"enum": ["get", "set", "del", "flush", "stats", "health_check"]}
                },
                "required": ["action"]
            }),
        }
    }

    async fn call(&self, action: &str, arguments: &Value) -> Value {
        match action {
            "get" => {
                let key = match require_str(arguments, "key") {
                    Ok(v) => v,
                    Err(e) => return err(&e),
                };
                match self.state.sync.cache_get(key).await {
                    Some(value) => ok(json!({ "value": value, "hit": true })),
                    None => ok(json!({ "value": Value::Null, "hit": false })),
                }
            }
            "set" => {
                let key = match require_str(arguments, "key") {
                    Ok(v) => v,
                    Err(e) => return err(&e),
                };
                let value = match require_str(arguments, "value") {
                    Ok(v) => v,
                    Err(e) => return err(&e),
                };
                let ttl = optional_u64(arguments, "ttl_secs").unwrap_or(300);
                let stored = self.state.sync.cache_set(key, value, ttl).await;
                ok(json!({ "stored": stored, "degraded": !stored }))
            }
            "del" => {
                let key = match require_str(arguments, "key") {
                    Ok(v) => v,
                    Err(e) => return err(&e),
                };
                let removed = self.state.sync.cache_del(key);
                ok(json!({ "removed": removed }))
            }
            "flush" => err_str("invalid_params", "flush is not supported: cache keys are namespaced and not enumerable without a prefix scan; use del per key"),
            "stats" => ok(json!({ "handlers": self.state.observability.snapshot_handlers() })),
            "health_check" => {
                use crate::ltmc::observability::{BreakerStates, StoreLiveness};
                let breaker_state_name = |b: &crate::ltmc::store::breaker::CircuitBreaker| {
                    format!("{:?}", b.state()).to_lowercase()
                };
                let store_liveness = StoreLiveness {
                    relational: true,
                    vector: !self.state.sync.vector.is_degraded(),
                    #[cfg(feature = "graph")]
                    graph: Some(self.state.sync.graph.is_some()),
                    #[cfg(not(feature = "graph"))]
                    graph: None,
                    #[cfg(feature = "cache")]
                    cache: Some(self.state.sync.cache.is_some()),
                    #[cfg(not(feature = "cache"))]
                    cache: None,
                };
                let breaker_states = BreakerStates {
                    vector: breaker_state_name(&self.state.sync.vector_breaker),
                    graph: breaker_state_name(&self.state.sync.graph_breaker),
                    cache: breaker_state_name(&self.state.sync.cache_breaker),
                };
                let snapshot = self.state.observability.health_snapshot(store_liveness, breaker_states);
                ok(serde_json::to_value(snapshot).unwrap_or(json!({"healthy": false})))
            }
            other => err(&LtmcError::InvalidParams(format!("unknown cache action: {other}"))),
        }
    }
}
