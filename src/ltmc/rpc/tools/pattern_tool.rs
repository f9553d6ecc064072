//! `pattern` tool: best-effort static analysis over source text, as a
//! line-oriented scanner in the same style as [`crate::ltmc::chunker`]'s
//! boundary search rather than a full parser — no registry crate in the
//! corpus does language-aware parsing for this kind of lightweight scan.

use crate::ltmc::error::LtmcError;
use crate::ltmc::rpc::tool_protocol::{err, ok, require_str, ToolHandler, ToolMetadata};
use async_trait::async_trait;
use serde_json::{json, Value};

const FUNCTION_MARKERS: &[&str] = &["fn ", "def ", "function ", "func "];
const CLASS_MARKERS: &[&str] = &["class ", "struct ", "interface ", "trait "];

pub struct PatternTool;

impl PatternTool {
    pub fn new() -> Self {
        Self
    }

    fn extract(content: &str, markers: &[&str]) -> Vec<String> {
        const SKIP_PREFIXES: &[&str] = &["pub(crate) ", "pub ", "async ", "export ", "static "];
        let mut names = Vec::new();
        for line in content.lines() {
            let mut trimmed = line.trim_start();
            loop {
                let mut stripped_any = false;
                for prefix in SKIP_PREFIXES {
                    if let Some(rest) = trimmed.strip_prefix(prefix) {
                        trimmed = rest;
                        stripped_any = true;
                    }
                }
                if !stripped_any {
                    break;
                }
            }
            for marker in markers {
                if let Some(rest) = trimmed.strip_prefix(marker) {
                    let name: String = rest
                        .chars()
                        .take_while(|c| c.is_alphanumeric() || *c == '_')
                        .collect();
                    if !name.is_empty() {
                        names.push(name);
                    }
                    break;
                }
            }
        }
        names
    }
}

impl Default for PatternTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolHandler for PatternTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            name: "pattern",
            description: "Best-effort extraction of function/class names and a length summary over source text.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "action": {"enum": ["extract_functions", "extract_classes", "summarize_code"]}
                },
                "required": ["action"]
            }),
        }
    }

    fn is_write_shaped(&self) -> bool {
        false
    }

    async fn call(&self, action: &str, arguments: &Value) -> Value {
        let content = match require_str(arguments, "content") {
            Ok(v) => v,
            Err(e) => return err(&e),
        };
        match action {
            "extract_functions" => ok(json!({ "functions": Self::extract(content, FUNCTION_MARKERS) })),
            "extract_classes" => ok(json!({ "classes": Self::extract(content, CLASS_MARKERS) })),
            "summarize_code" => {
                let lines = content.lines().count();
                let functions = Self::extract(content, FUNCTION_MARKERS);
                let classes = Self::extract(content, CLASS_MARKERS);
                ok(json!({
                    "line_count": lines,
                    "function_count": functions.len(),
                    "class_count": classes.len(),
                    "functions": functions,
                    "classes": classes,
                }))
            }
            other => err(&LtmcError::InvalidParams(format!("unknown pattern action: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_rust_function_names() {
        let src = "pub fn store_document(x: i32) {}\nfn helper() {}\n";
        let names = PatternTool::extract(src, FUNCTION_MARKERS);
        assert_eq!(names, vec!["store_document", "helper"]);
    }

    #[test]
    fn extracts_struct_and_class_names() {
        let src = "struct Foo;\nclass Bar:\n";
        let names = PatternTool::extract(src, CLASS_MARKERS);
        assert_eq!(names, vec!["Foo", "Bar"]);
    }
}
