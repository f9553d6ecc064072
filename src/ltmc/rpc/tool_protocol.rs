//! Tool handler abstraction (§4.13, §6).
//!
//! Each of the ten tools in the fixed catalog implements [`ToolHandler`],
//! dispatching its own `action` string internally. A handler's success
//! return is passed through as the JSON-RPC `result` verbatim — it is
//! never double-wrapped — so every handler builds its own
//! `{success, ...}` / `{success:false, error}` object directly.

use crate::ltmc::error::LtmcError;
use async_trait::async_trait;
use serde_json::{json, Value};

#[derive(Debug, Clone)]
pub struct ToolMetadata {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

#[async_trait]
pub trait ToolHandler: Send + Sync {
    fn metadata(&self) -> ToolMetadata;

    /// Whether this tool's actions write state (used for the optional
    /// bearer-token gate, which only covers write-shaped tools per §4.14).
    fn is_write_shaped(&self) -> bool {
        true
    }

    async fn call(&self, action: &str, arguments: &Value) -> Value;
}

pub fn ok(mut fields: Value) -> Value {
    if let Value::Object(ref mut map) = fields {
        map.insert("success".to_string(), Value::Bool(true));
        Value::Object(map.clone())
    } else {
        json!({ "success": true })
    }
}

pub fn err(e: &LtmcError) -> Value {
    json!({
        "success": false,
        "error": e.to_string(),
        "error_code": e.json_rpc_code(),
    })
}

pub fn err_str(kind: &str, message: impl Into<String>) -> Value {
    json!({
        "success": false,
        "error": format!("{kind}: {}", message.into()),
    })
}

/// Required-string-argument extraction shared by every tool's action
/// dispatch; a missing or wrong-typed argument is always `InvalidParams`.
pub fn require_str<'a>(arguments: &'a Value, key: &str) -> Result<&'a str, LtmcError> {
    arguments
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| LtmcError::InvalidParams(format!("missing required string argument: {key}")))
}

pub fn require_i64(arguments: &Value, key: &str) -> Result<i64, LtmcError> {
    arguments
        .get(key)
        .and_then(Value::as_i64)
        .ok_or_else(|| LtmcError::InvalidParams(format!("missing required integer argument: {key}")))
}

pub fn optional_str<'a>(arguments: &'a Value, key: &str) -> Option<&'a str> {
    arguments.get(key).and_then(Value::as_str)
}

pub fn optional_i64(arguments: &Value, key: &str) -> Option<i64> {
    arguments.get(key).and_then(Value::as_i64)
}

pub fn optional_u64(arguments: &Value, key: &str) -> Option<u64> {
    arguments.get(key).and_then(Value::as_u64)
}
