//! `sync` tool (§4.8): `validate`, `drift`, `code`, `score`.
//!
//! `code`/`score` are the drift-measurement primitives split into their
//! own actions (`drift` reports a ready-made `{file_path, content}` pair's
//! staleness; `code` repairs the repair queue; `score` exposes the raw
//! heuristic for an arbitrary pair of texts).

use crate::ltmc::error::LtmcError;
use crate::ltmc::rpc::tool_protocol::{err, ok, optional_i64, require_i64, require_str, ToolHandler, ToolMetadata};
use crate::ltmc::rpc::tools::AppState;
use crate::ltmc::consistency::ConsistencyManager;
use async_trait::async_trait;
use serde_json::{json, Value};

pub struct SyncTool {
    state: AppState,
}

impl SyncTool {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl ToolHandler for SyncTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            name: "sync",
            description: "Verify and repair cross-store consistency; measure content drift.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "action": {"enum": ["validate", "drift", "code", "score"]}
                },
                "required": ["action"]
            }),
        }
    }

    async fn call(&self, action: &str, arguments: &Value) -> Value {
        match action {
            "validate" => {
                let resource_id = match require_i64(arguments, "resource_id") {
                    Ok(v) => v,
                    Err(e) => return err(&e),
                };
                match self.state.consistency.verify(resource_id) {
                    Ok(report) => ok(json!({
                        "chunks_checked": report.chunks_checked,
                        "missing_vectors": report.missing_vectors,
                        "missing_graph_node": report.missing_graph_node,
                        "consistent": report.missing_vectors.is_empty() && !report.missing_graph_node,
                    })),
                    Err(e) => err(&e),
                }
            }
            "code" => {
                let batch_size = optional_i64(arguments, "batch_size").unwrap_or(50);
                match self.state.consistency.repair(batch_size) {
                    Ok(report) => ok(json!({ "repaired": report.repaired, "quarantined": report.quarantined })),
                    Err(e) => err(&e),
                }
            }
            "drift" => {
                let resource_id = match require_i64(arguments, "resource_id") {
                    Ok(v) => v,
                    Err(e) => return err(&e),
                };
                let comparison = match require_str(arguments, "content") {
                    Ok(v) => v,
                    Err(e) => return err(&e),
                };
                match self.state.ops.get_document(resource_id) {
                    Ok(resource) => {
                        let score = ConsistencyManager::drift_score(&resource.content, comparison);
                        ok(json!({ "drift_score": score, "stale": score > 0.5 }))
                    }
                    Err(e) => err(&e),
                }
            }
            "score" => {
                let a = match require_str(arguments, "a") {
                    Ok(v) => v,
                    Err(e) => return err(&e),
                };
                let b = match require_str(arguments, "b") {
                    Ok(v) => v,
                    Err(e) => return err(&e),
                };
                ok(json!({ "drift_score": ConsistencyManager::drift_score(a, b) }))
            }
            other => err(&LtmcError::InvalidParams(format!("unknown sync action: {other}"))),
        }
    }
}
