//! Tool Dispatcher (C13).
//!
//! Parses one JSON-RPC envelope per stdin line, routes `tools/call` to the
//! registered handler named by `params.name`, and writes exactly one reply
//! line per request to stdout. Requests may run concurrently; the
//! in-flight count is bounded, and anything above the bound is rejected
//! immediately with `Overloaded` (§5).

use crate::ltmc::config::Config;
use crate::ltmc::observability::Observability;
use crate::ltmc::rpc::protocol::{
    Capabilities, InitializeResult, JsonRpcRequest, JsonRpcResponse, ToolCallParams, ToolListEntry,
    PROTOCOL_VERSION, SERVER_NAME, SERVER_VERSION,
};
use crate::ltmc::rpc::tool_protocol::{err_str, ToolHandler};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use subtle::ConstantTimeEq;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Semaphore;

const MAX_IN_FLIGHT: usize = 64;

pub struct ToolDispatcher {
    tools: HashMap<String, Arc<dyn ToolHandler>>,
    observability: Arc<Observability>,
    enable_auth: bool,
    api_token: Option<String>,
    in_flight: Arc<Semaphore>,
}

impl ToolDispatcher {
    pub fn new(cfg: &Config, observability: Arc<Observability>) -> Self {
        Self {
            tools: HashMap::new(),
            observability,
            enable_auth: cfg.enable_auth,
            api_token: cfg.api_token.clone(),
            in_flight: Arc::new(Semaphore::new(MAX_IN_FLIGHT)),
        }
    }

    pub fn register(&mut self, name: &str, handler: Arc<dyn ToolHandler>) {
        self.tools.insert(name.to_string(), handler);
    }

    fn tool_list(&self) -> Vec<ToolListEntry> {
        let mut entries: Vec<ToolListEntry> = self
            .tools
            .values()
            .map(|t| {
                let m = t.metadata();
                ToolListEntry {
                    name: m.name.to_string(),
                    description: m.description.to_string(),
                    input_schema: m.input_schema,
                }
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }

    fn check_auth(&self, tool: &Arc<dyn ToolHandler>, arguments: &Value) -> Result<(), Value> {
        if !self.enable_auth || !tool.is_write_shaped() {
            return Ok(());
        }
        let expected = match &self.api_token {
            Some(t) => t,
            None => return Ok(()),
        };
        let provided = arguments.get("api_token").and_then(Value::as_str).unwrap_or("");
        let ok = provided.len() == expected.len()
            && bool::from(provided.as_bytes().ct_eq(expected.as_bytes()));
        if ok {
            Ok(())
        } else {
            Err(err_str("unauthorized", "missing or invalid api_token"))
        }
    }

    /// Handles a single parsed request, returning the JSON-RPC response to
    /// write. Never panics; parse/dispatch failures become JSON-RPC error
    /// objects per §4.13.
    pub async fn handle(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.clone().unwrap_or(Value::Null);

        let Ok(_permit) = self.in_flight.clone().try_acquire_owned() else {
            return JsonRpcResponse::success(id, json!({"success": false, "error": "Overloaded"}));
        };

        match request.method.as_str() {
            "initialize" => JsonRpcResponse::success(
                id,
                serde_json::to_value(InitializeResult {
                    protocol_version: PROTOCOL_VERSION,
                    server_name: SERVER_NAME,
                    server_version: SERVER_VERSION,
                    capabilities: Capabilities { tools: true },
                })
                .unwrap(),
            ),
            "tools/list" => JsonRpcResponse::success(
                id,
                serde_json::to_value(self.tool_list()).unwrap_or(json!([])),
            ),
            "tools/call" => {
                let params: ToolCallParams = match serde_json::from_value(request.params.clone()) {
                    Ok(p) => p,
                    Err(e) => return JsonRpcResponse::failure(id, -32602, format!("invalid params: {e}")),
                };
                let Some(tool) = self.tools.get(&params.name).cloned() else {
                    return JsonRpcResponse::failure(id, -32602, format!("unknown tool: {}", params.name));
                };
                if let Err(unauthorized) = self.check_auth(&tool, &params.arguments) {
                    return JsonRpcResponse::success(id, unauthorized);
                }
                let action = params
                    .arguments
                    .get("action")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                let Some(action) = action else {
                    return JsonRpcResponse::failure(id, -32602, "missing required argument: action");
                };

                let start = Instant::now();
                let result = tool.call(&action, &params.arguments).await;
                let failed = result.get("success").and_then(Value::as_bool) == Some(false);
                let degraded = result.get("degraded").and_then(Value::as_bool).unwrap_or(false);
                self.observability.record(
                    &format!("{}.{}", params.name, action),
                    start.elapsed(),
                    failed,
                    degraded,
                );

                JsonRpcResponse::success(id, result)
            }
            other => JsonRpcResponse::failure(id, -32601, format!("unknown method: {other}")),
        }
    }

    /// Drives the line-framed stdio loop: reads one JSON-RPC envelope per
    /// line, dispatches it on a spawned task so requests overlap, and
    /// writes the reply as a single line to stdout. No other bytes reach
    /// stdout; diagnostics go to `log` (stderr).
    pub async fn run_stdio(self: Arc<Self>) -> std::io::Result<()> {
        let stdin = tokio::io::stdin();
        let mut lines = BufReader::new(stdin).lines();
        let stdout = tokio::io::stdout();
        let stdout = Arc::new(tokio::sync::Mutex::new(stdout));

        let mut handles = Vec::new();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let dispatcher = self.clone();
            let stdout = stdout.clone();
            let handle = tokio::spawn(async move {
                let response = match serde_json::from_str::<JsonRpcRequest>(&line) {
                    Ok(req) => dispatcher.handle(req).await,
                    Err(e) => JsonRpcResponse::failure(Value::Null, -32700, format!("parse error: {e}")),
                };
                let mut out = serde_json::to_string(&response).unwrap_or_else(|_| {
                    "{\"jsonrpc\":\"2.0\",\"id\":null,\"error\":{\"code\":-32603,\"message\":\"internal\"}}"
                        .to_string()
                });
                out.push('\n');
                let mut stdout = stdout.lock().await;
                let _ = stdout.write_all(out.as_bytes()).await;
                let _ = stdout.flush().await;
            });
            handles.push(handle);
        }
        for handle in handles {
            let _ = handle.await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ltmc::rpc::tool_protocol::ToolMetadata;

    struct EchoTool;

    #[async_trait::async_trait]
    impl ToolHandler for EchoTool {
        fn metadata(&self) -> ToolMetadata {
            ToolMetadata {
                name: "echo",
                description: "echoes",
                input_schema: json!({}),
            }
        }
        fn is_write_shaped(&self) -> bool {
            false
        }
        async fn call(&self, _action: &str, _arguments: &Value) -> Value {
            json!({"success": true})
        }
    }

    fn dispatcher() -> ToolDispatcher {
        let mut cfg = Config::default();
        cfg.enable_auth = false;
        let mut d = ToolDispatcher::new(&cfg, Arc::new(Observability::new()));
        d.register("echo", Arc::new(EchoTool));
        d
    }

    #[tokio::test]
    async fn unknown_method_is_method_not_found() {
        let d = dispatcher();
        let req = JsonRpcRequest {
            jsonrpc: Some("2.0".into()),
            id: Some(json!(1)),
            method: "bogus".into(),
            params: Value::Null,
        };
        let resp = d.handle(req).await;
        assert_eq!(resp.error.unwrap().code, -32601);
    }

    #[tokio::test]
    async fn unknown_tool_is_invalid_params() {
        let d = dispatcher();
        let req = JsonRpcRequest {
            jsonrpc: Some("2.0".into()),
            id: Some(json!(1)),
            method: "tools/call".into(),
            params: json!({"name": "bogus", "arguments": {"action": "x"}}),
        };
        let resp = d.handle(req).await;
        assert_eq!(resp.error.unwrap().code, -32602);
    }

    #[tokio::test]
    async fn missing_action_is_invalid_params() {
        let d = dispatcher();
        let req = JsonRpcRequest {
            jsonrpc: Some("2.0".into()),
            id: Some(json!(1)),
            method: "tools/call".into(),
            params: json!({"name": "echo", "arguments": {}}),
        };
        let resp = d.handle(req).await;
        assert_eq!(resp.error.unwrap().code, -32602);
    }

    #[tokio::test]
    async fn successful_call_passes_result_through_verbatim() {
        let d = dispatcher();
        let req = JsonRpcRequest {
            jsonrpc: Some("2.0".into()),
            id: Some(json!(1)),
            method: "tools/call".into(),
            params: json!({"name": "echo", "arguments": {"action": "noop"}}),
        };
        let resp = d.handle(req).await;
        assert_eq!(resp.result.unwrap(), json!({"success": true}));
    }
}
