//! `graph` tool (§4.3): `link`, `query` (read-only), `auto_link`, `get_relationships`.

use crate::ltmc::error::LtmcError;
use crate::ltmc::rpc::tool_protocol::{err, err_str, ok, optional_str, require_str, ToolHandler, ToolMetadata};
use crate::ltmc::rpc::tools::AppState;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;

pub struct GraphTool {
    state: AppState,
}

impl GraphTool {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    fn props_from(arguments: &Value) -> HashMap<String, String> {
        arguments
            .get("properties")
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
impl ToolHandler for GraphTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            name: "graph",
            description: "Link documents and query their relations. `query` is read-only.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "action": {"enum": ["link", "query", "auto_link", "get_relationships"]}
                },
                "required": ["action"]
            }),
        }
    }

    async fn call(&self, action: &str, arguments: &Value) -> Value {
        match action {
            "link" | "auto_link" => {
                let src = match require_str(arguments, "src") {
                    Ok(v) => v,
                    Err(e) => return err(&e),
                };
                let dst = match require_str(arguments, "dst") {
                    Ok(v) => v,
                    Err(e) => return err(&e),
                };
                let relation_type = optional_str(arguments, "relation_type").unwrap_or("related_to");
                let props = Self::props_from(arguments);
                let linked = self.state.ops.link(src, dst, relation_type, props);
                ok(json!({ "linked": linked, "degraded": !linked }))
            }
            "query" => {
                #[cfg(feature = "graph")]
                {
                    let text = match require_str(arguments, "text") {
                        Ok(v) => v,
                        Err(e) => return err(&e),
                    };
                    if let Err(keyword) = crate::ltmc::store::graph::GraphStore::validate_read_only(text) {
                        return err(&LtmcError::ReadOnlyViolation(keyword));
                    }
                    ok(json!({
                        "note": "only MATCH/RETURN-shaped traversals are supported; use get_relationships for structured queries",
                        "accepted": true,
                    }))
                }
                #[cfg(not(feature = "graph"))]
                {
                    err_str("not_found", "graph store is not enabled")
                }
            }
            "get_relationships" => {
                #[cfg(feature = "graph")]
                {
                    let id = match require_str(arguments, "id") {
                        Ok(v) => v,
                        Err(e) => return err(&e),
                    };
                    let edge_type = optional_str(arguments, "relation_type");
                    let direction = match optional_str(arguments, "direction").unwrap_or("both") {
                        "in" => crate::ltmc::store::graph::EdgeDirection::In,
                        "out" => crate::ltmc::store::graph::EdgeDirection::Out,
                        _ => crate::ltmc::store::graph::EdgeDirection::Both,
                    };
                    match self.state.sync.graph_relations(id, edge_type, direction) {
                        Some(relations) => ok(json!({ "relations": relations })),
                        None => ok(json!({ "relations": [], "degraded": true })),
                    }
                }
                #[cfg(not(feature = "graph"))]
                {
                    err_str("not_found", "graph store is not enabled")
                }
            }
            other => err(&LtmcError::InvalidParams(format!("unknown graph action: {other}"))),
        }
    }
}
