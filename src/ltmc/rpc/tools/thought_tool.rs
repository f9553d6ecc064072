//! `thought` tool (§4.11): `create`, `analyze_chain`, `find_similar`,
//! `archive_session`, `health_status`.

use crate::ltmc::error::LtmcError;
use crate::ltmc::rpc::tool_protocol::{err, ok, optional_i64, optional_str, require_str, ToolHandler, ToolMetadata};
use crate::ltmc::rpc::tools::AppState;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;

pub struct ThoughtTool {
    state: AppState,
}

impl ThoughtTool {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    fn metadata_from(arguments: &Value) -> HashMap<String, String> {
        arguments
            .get("metadata")
            .and_then(Value::as_object)
            .map(|m| {
                m.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl ToolHandler for ThoughtTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            name: "thought",
            description: "Record and traverse sequential reasoning chains.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "action": {"enum": ["create", "analyze_chain", "find_similar", "archive_session", "health_status"]}
                },
                "required": ["action"]
            }),
        }
    }

    async fn call(&self, action: &str, arguments: &Value) -> Value {
        match action {
            "create" => {
                let session_id = match require_str(arguments, "session_id") {
                    Ok(v) => v,
                    Err(e) => return err(&e),
                };
                let content = match require_str(arguments, "content") {
                    Ok(v) => v,
                    Err(e) => return err(&e),
                };
                let kind = match require_str(arguments, "kind") {
                    Ok(v) => v,
                    Err(e) => return err(&e),
                };
                let previous_thought_id = optional_str(arguments, "previous_thought_id").map(str::to_string);
                let step_number = optional_i64(arguments, "step_number");
                let metadata = Self::metadata_from(arguments);

                match self
                    .state
                    .thought_engine
                    .create(session_id, content, kind, previous_thought_id, step_number, metadata)
                    .await
                {
                    Ok(result) => ok(json!({
                        "ulid": result.ulid,
                        "session_id": result.session_id,
                        "content_hash": result.content_hash,
                        "created_at": result.created_at,
                        "databases_affected": result.databases_affected,
                        "execution_time_ms": result.execution_time_ms,
                        "sla_compliant": result.sla_compliant,
                    })),
                    Err(e) => err(&e),
                }
            }
            "analyze_chain" => {
                let session_id = match require_str(arguments, "session_id") {
                    Ok(v) => v,
                    Err(e) => return err(&e),
                };
                match self.state.thought_engine.analyze_chain(session_id) {
                    Ok(result) => ok(json!({
                        "chain_length": result.chain_length,
                        "thoughts": result.thoughts,
                        "analysis": result.analysis,
                    })),
                    Err(e) => err(&e),
                }
            }
            "find_similar" => {
                let query = match require_str(arguments, "query") {
                    Ok(v) => v,
                    Err(e) => return err(&e),
                };
                let k = optional_i64(arguments, "k").unwrap_or(5).max(0) as usize;
                let include_chains = arguments
                    .get("include_chains")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                match self.state.thought_engine.find_similar(query, k, include_chains) {
                    Ok(similar) => ok(json!({ "similar_thoughts": similar })),
                    Err(e) => err(&e),
                }
            }
            "archive_session" => {
                let session_id = match require_str(arguments, "session_id") {
                    Ok(v) => v,
                    Err(e) => return err(&e),
                };
                match self.state.thought_engine.archive_session(session_id) {
                    Ok(archived_count) => ok(json!({ "session_id": session_id, "archived_count": archived_count })),
                    Err(e) => err(&e),
                }
            }
            "health_status" => {
                // SLA targets from the observability design: thought creation
                // p90 <= 100ms, thought retrieval (find_similar) p95 <= 50ms.
                let handlers = self.state.observability.snapshot_handlers();
                let create_ok = handlers
                    .get("thought.create")
                    .map(|h| h.p95_ms <= 100.0)
                    .unwrap_or(true);
                let retrieve_ok = handlers
                    .get("thought.find_similar")
                    .map(|h| h.p95_ms <= 50.0)
                    .unwrap_or(true);
                ok(json!({
                    "handlers": handlers,
                    "sla_compliant": create_ok && retrieve_ok,
                }))
            }
            other => err(&LtmcError::InvalidParams(format!("unknown thought action: {other}"))),
        }
    }
}
