//! Shared helper functions for MCP tool implementations.

use orchestrator_shared::Value;

/// Build a structured error JSON string that LLMs can parse.
pub fn error_json(error_code: &str, message: &str) -> String {
    serde_json::json!({
        "error": error_code,
        "message": message,
    })
    .to_string()
}

/// `Value` is already `Serialize` (untagged), so this is just a shape
/// change into `serde_json::Value` for the wire response.
pub fn value_to_json(value: &Value) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or(serde_json::Value::Null)
}
