//! `memory` tool (§4.9, §4.10): `store`, `retrieve`, `retrieve_by_type`,
//! `build_context`, `ask_with_context`.

use crate::ltmc::error::LtmcError;
use crate::ltmc::rpc::tool_protocol::{
    err, ok, optional_i64, optional_str, require_str, ToolHandler, ToolMetadata,
};
use crate::ltmc::rpc::tools::AppState;
use async_trait::async_trait;
use serde_json::{json, Value};

pub struct MemoryTool {
    state: AppState,
}

impl MemoryTool {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    fn store(&self, arguments: &Value) -> Value {
        let file_name = match require_str(arguments, "file_name") {
            Ok(v) => v,
            Err(e) => return err(&e),
        };
        let content = match require_str(arguments, "content") {
            Ok(v) => v,
            Err(e) => return err(&e),
        };
        let content_type = optional_str(arguments, "content_type").unwrap_or("document");
        let replace = arguments
            .get("replace")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        if replace {
            if let Ok(existing) = self.state.sync.db.find_resource_by_file_name(file_name) {
                if let Err(e) = self.state.ops.delete_document(existing.id) {
                    return err(&e);
                }
            }
        }

        match self.state.ops.store_document(file_name, content, content_type) {
            Ok(result) => ok(json!({
                "resource_id": result.resource_id,
                "chunk_ids": result.chunk_ids,
                "vector_ids": result.vector_ids,
                "degraded": result.degraded.any(),
            })),
            Err(e) => err(&e),
        }
    }

    fn retrieve(&self, arguments: &Value, type_filter: Option<&str>) -> Value {
        let query = match require_str(arguments, "query") {
            Ok(v) => v,
            Err(e) => return err(&e),
        };
        let top_k = optional_i64(arguments, "top_k").unwrap_or(5).max(0) as usize;
        let conversation_id = optional_str(arguments, "conversation_id");

        match self.state.retriever.retrieve(query, top_k, type_filter, conversation_id) {
            Ok(result) => ok(json!({
                "chunks": result.chunks,
                "context": result.context,
                "degraded": result.degraded,
            })),
            Err(e) => err(&e),
        }
    }

    fn build_context(&self, arguments: &Value) -> Value {
        let query = match require_str(arguments, "query") {
            Ok(v) => v,
            Err(e) => return err(&e),
        };
        let top_k = optional_i64(arguments, "top_k").unwrap_or(5).max(0) as usize;
        let type_filter = optional_str(arguments, "type_filter");

        match self.state.retriever.retrieve(query, top_k, type_filter, None) {
            Ok(result) => ok(json!({ "context": result.context, "degraded": result.degraded })),
            Err(e) => err(&e),
        }
    }

    fn ask_with_context(&self, arguments: &Value) -> Value {
        let query = match require_str(arguments, "query") {
            Ok(v) => v,
            Err(e) => return err(&e),
        };
        let top_k = optional_i64(arguments, "top_k").unwrap_or(5).max(0) as usize;
        let conversation_id = optional_str(arguments, "conversation_id");

        match self.state.retriever.retrieve(query, top_k, None, conversation_id) {
            Ok(result) => ok(json!({
                "context": result.context,
                "chunks": result.chunks,
                "degraded": result.degraded,
                "note": "LTMC only assembles retrieval context; composing an answer from it is the caller's responsibility.",
            })),
            Err(e) => err(&e),
        }
    }
}

#[async_trait]
impl ToolHandler for MemoryTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            name: "memory",
            description: "Store documents and retrieve relevant chunks for a query.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "action": {"enum": ["store", "retrieve", "retrieve_by_type", "build_context", "ask_with_context"]}
                },
                "required": ["action"]
            }),
        }
    }

    async fn call(&self, action: &str, arguments: &Value) -> Value {
        match action {
            "store" => self.store(arguments),
            "retrieve" => self.retrieve(arguments, optional_str(arguments, "type_filter")),
            "retrieve_by_type" => match require_str(arguments, "content_type") {
                Ok(t) => self.retrieve(arguments, Some(t)),
                Err(e) => err(&e),
            },
            "build_context" => self.build_context(arguments),
            "ask_with_context" => self.ask_with_context(arguments),
            other => err(&LtmcError::InvalidParams(format!("unknown memory action: {other}"))),
        }
    }
}
