//! `chat` tool (§4.12): `log`, `get_by_tool`, `get_by_conversation`.

use crate::ltmc::error::LtmcError;
use crate::ltmc::rpc::tool_protocol::{err, ok, optional_str, require_str, ToolHandler, ToolMetadata};
use crate::ltmc::rpc::tools::AppState;
use async_trait::async_trait;
use serde_json::{json, Value};

pub struct ChatTool {
    state: AppState,
}

impl ChatTool {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl ToolHandler for ChatTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            name: "chat",
            description: "Log conversation turns and look them up by tool or conversation.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "action": {"enum": ["log", "get_by_tool", "get_by_conversation"]}
                },
                "required": ["action"]
            }),
        }
    }

    fn is_write_shaped(&self) -> bool {
        true
    }

    async fn call(&self, action: &str, arguments: &Value) -> Value {
        match action {
            "log" => {
                let conversation_id = match require_str(arguments, "conversation_id") {
                    Ok(v) => v,
                    Err(e) => return err(&e),
                };
                let role = match require_str(arguments, "role") {
                    Ok(v) => v,
                    Err(e) => return err(&e),
                };
                let content = match require_str(arguments, "content") {
                    Ok(v) => v,
                    Err(e) => return err(&e),
                };
                let agent = optional_str(arguments, "agent");
                let source_tool = optional_str(arguments, "source_tool");
                let metadata = optional_str(arguments, "metadata");
                match self
                    .state
                    .chat_linker
                    .log_chat(conversation_id, role, content, agent, source_tool, metadata)
                {
                    Ok(message_id) => ok(json!({ "message_id": message_id })),
                    Err(e) => err(&e),
                }
            }
            "get_by_tool" => {
                let source_tool = match require_str(arguments, "source_tool") {
                    Ok(v) => v,
                    Err(e) => return err(&e),
                };
                match self.state.chat_linker.get_by_tool(source_tool) {
                    Ok(messages) => ok(json!({ "messages": messages })),
                    Err(e) => err(&e),
                }
            }
            "get_by_conversation" => {
                let conversation_id = match require_str(arguments, "conversation_id") {
                    Ok(v) => v,
                    Err(e) => return err(&e),
                };
                match self.state.chat_linker.get_by_conversation(conversation_id) {
                    Ok(messages) => ok(json!({ "messages": messages })),
                    Err(e) => err(&e),
                }
            }
            other => err(&LtmcError::InvalidParams(format!("unknown chat action: {other}"))),
        }
    }
}
