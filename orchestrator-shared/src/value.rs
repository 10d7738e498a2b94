//! A tagged-variant payload type for opaque task/context data (spec §9
//! Design Notes: "Model as a tagged variant over {string, number, bool,
//! list, map, null}... Avoid dynamic field access at the engine boundary").
//!
//! The executor, shared context map, and agent results all carry `Value`
//! rather than `serde_json::Value` directly so that the one place allowed to
//! inspect payload shape — the aggregator's `key_findings` extraction — is
//! visibly the exception, not the rule.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Opaque, serializable payload carried by tasks, agent results, and the
/// shared context map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Look up a string-valued field on a map variant, the one shape the
    /// aggregator needs when extracting `summary`/`keyFindings` (spec §4.5).
    pub fn get_str_field(&self, key: &str) -> Option<&str> {
        self.as_map()?.get(key)?.as_str()
    }

    /// Truncate a human-readable rendering of this value to `max_chars`,
    /// the shape the aggregator needs for `keyFindings` extraction and for
    /// building the summary prompt context.
    pub fn truncated(&self, max_chars: usize) -> String {
        let rendered = match self {
            Value::String(s) => s.clone(),
            other => serde_json::to_string(other).unwrap_or_default(),
        };
        truncate_chars(&rendered, max_chars)
    }
}

/// Truncate a string to at most `max_chars` Unicode scalar values.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        s.chars().take(max_chars).collect()
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(0.0)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(a) => Value::List(a.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(o) => {
                Value::Map(o.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_string_values() {
        let v = Value::String("a".repeat(300));
        assert_eq!(v.truncated(200).chars().count(), 200);
    }

    #[test]
    fn extracts_summary_field_from_map() {
        let mut m = BTreeMap::new();
        m.insert("summary".to_string(), Value::String("did the thing".into()));
        let v = Value::Map(m);
        assert_eq!(v.get_str_field("summary"), Some("did the thing"));
        assert_eq!(v.get_str_field("missing"), None);
    }

    #[test]
    fn converts_from_json() {
        let json = serde_json::json!({"a": 1, "b": [true, null, "x"]});
        let v = Value::from(json);
        let m = v.as_map().unwrap();
        assert_eq!(m.get("a"), Some(&Value::Number(1.0)));
    }
}
