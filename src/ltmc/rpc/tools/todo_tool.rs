//! `todo` tool (§3): `add`, `list`, `complete`, `search`.

use crate::ltmc::error::LtmcError;
use crate::ltmc::rpc::tool_protocol::{err, ok, optional_str, require_i64, require_str, ToolHandler, ToolMetadata};
use crate::ltmc::rpc::tools::AppState;
use async_trait::async_trait;
use serde_json::{json, Value};

pub struct TodoTool {
    state: AppState,
}

impl TodoTool {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl ToolHandler for TodoTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            name: "todo",
            description: "Track todo items: add, list, complete, search.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "action": {"enum": ["add", "list", "complete", "search"]}
                },
                "required": ["action"]
            }),
        }
    }

    async fn call(&self, action: &str, arguments: &Value) -> Value {
        let db = &self.state.sync.db;
        match action {
            "add" => {
                let title = match require_str(arguments, "title") {
                    Ok(v) => v,
                    Err(e) => return err(&e),
                };
                let description = optional_str(arguments, "description").unwrap_or("");
                let priority = optional_str(arguments, "priority").unwrap_or("medium");
                if !matches!(priority, "low" | "medium" | "high") {
                    return err(&LtmcError::InvalidParams(format!(
                        "priority must be low, medium, or high: {priority}"
                    )));
                }
                match db.add_todo(title, description, priority) {
                    Ok(id) => ok(json!({ "todo_id": id })),
                    Err(e) => err(&e),
                }
            }
            "list" => {
                let status = optional_str(arguments, "status");
                match db.list_todos(status) {
                    Ok(todos) => ok(json!({ "todos": todos })),
                    Err(e) => err(&e),
                }
            }
            "complete" => {
                let id = match require_i64(arguments, "todo_id") {
                    Ok(v) => v,
                    Err(e) => return err(&e),
                };
                match db.complete_todo(id) {
                    Ok(()) => ok(json!({ "todo_id": id })),
                    Err(e) => err(&e),
                }
            }
            "search" => {
                let query = match require_str(arguments, "query") {
                    Ok(v) => v,
                    Err(e) => return err(&e),
                };
                match db.search_todos(query) {
                    Ok(todos) => ok(json!({ "todos": todos })),
                    Err(e) => err(&e),
                }
            }
            other => err(&LtmcError::InvalidParams(format!("unknown todo action: {other}"))),
        }
    }
}
