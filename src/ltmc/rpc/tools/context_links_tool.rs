//! `context_links` tool (§4.12): `store`, `get_for_message`, `get_for_chunk`, `stats`.

use crate::ltmc::error::LtmcError;
use crate::ltmc::rpc::tool_protocol::{err, ok, require_i64, ToolHandler, ToolMetadata};
use crate::ltmc::rpc::tools::AppState;
use async_trait::async_trait;
use serde_json::{json, Value};

pub struct ContextLinksTool {
    state: AppState,
}

impl ContextLinksTool {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl ToolHandler for ContextLinksTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            name: "context_links",
            description: "Link chat messages to the chunks that answered them.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "action": {"enum": ["store", "get_for_message", "get_for_chunk", "stats"]}
                },
                "required": ["action"]
            }),
        }
    }

    async fn call(&self, action: &str, arguments: &Value) -> Value {
        let linker = &self.state.chat_linker;
        match action {
            "store" => {
                let message_id = match require_i64(arguments, "message_id") {
                    Ok(v) => v,
                    Err(e) => return err(&e),
                };
                let chunk_ids: Vec<i64> = match arguments.get("chunk_ids").and_then(Value::as_array) {
                    Some(arr) => arr.iter().filter_map(Value::as_i64).collect(),
                    None => {
                        return err(&LtmcError::InvalidParams(
                            "missing required array argument: chunk_ids".into(),
                        ))
                    }
                };
                match linker.store_context_links(message_id, &chunk_ids) {
                    Ok(()) => ok(json!({ "message_id": message_id, "chunk_ids": chunk_ids })),
                    Err(e) => err(&e),
                }
            }
            "get_for_message" => {
                let message_id = match require_i64(arguments, "message_id") {
                    Ok(v) => v,
                    Err(e) => return err(&e),
                };
                match linker.get_context_links_for_message(message_id) {
                    Ok(links) => ok(json!({ "links": links })),
                    Err(e) => err(&e),
                }
            }
            "get_for_chunk" => {
                let chunk_id = match require_i64(arguments, "chunk_id") {
                    Ok(v) => v,
                    Err(e) => return err(&e),
                };
                match linker.get_messages_for_chunk(chunk_id) {
                    Ok(messages) => ok(json!({ "messages": messages })),
                    Err(e) => err(&e),
                }
            }
            "stats" => match linker.stats() {
                Ok((links, messages)) => ok(json!({ "link_count": links, "message_count": messages })),
                Err(e) => err(&e),
            },
            other => err(&LtmcError::InvalidParams(format!(
                "unknown context_links action: {other}"
            ))),
        }
    }
}
