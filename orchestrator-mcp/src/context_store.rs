//! Shared key-value context store exposed to the tool-call layer (spec §6:
//! "scope identifiers for the context store: session, global").
//!
//! This is the caller-facing context store, distinct from
//! `OrchestrationContext::shared_context` inside one run — that one is
//! internal to the executor and keyed by task id; this one is keyed by
//! whatever the caller chooses and survives across `create_task` calls.

use orchestrator_shared::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextScope {
    Session,
    Global,
}

impl ContextScope {
    pub fn wire_id(self) -> &'static str {
        match self {
            ContextScope::Session => "session",
            ContextScope::Global => "global",
        }
    }

    pub fn from_wire_id(id: &str) -> Option<Self> {
        match id {
            "session" => Some(ContextScope::Session),
            "global" => Some(ContextScope::Global),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct ContextStore {
    global: RwLock<HashMap<String, Value>>,
    sessions: RwLock<HashMap<String, HashMap<String, Value>>>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(
        &self,
        scope: ContextScope,
        session_id: Option<&str>,
        key: String,
        value: Value,
    ) -> Result<(), String> {
        match scope {
            ContextScope::Global => {
                self.global.write().await.insert(key, value);
                Ok(())
            }
            ContextScope::Session => {
                let sid = session_id.ok_or("scope \"session\" requires a session_id")?;
                self.sessions
                    .write()
                    .await
                    .entry(sid.to_string())
                    .or_default()
                    .insert(key, value);
                Ok(())
            }
        }
    }

    pub async fn get(&self, scope: ContextScope, session_id: Option<&str>, key: &str) -> Result<Option<Value>, String> {
        match scope {
            ContextScope::Global => Ok(self.global.read().await.get(key).cloned()),
            ContextScope::Session => {
                let sid = session_id.ok_or("scope \"session\" requires a session_id")?;
                Ok(self.sessions.read().await.get(sid).and_then(|m| m.get(key).cloned()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn global_scope_ignores_session_id() {
        let store = ContextStore::new();
        store
            .set(ContextScope::Global, None, "k".into(), Value::String("v".into()))
            .await
            .unwrap();
        let got = store.get(ContextScope::Global, None, "k").await.unwrap();
        assert_eq!(got, Some(Value::String("v".into())));
    }

    #[tokio::test]
    async fn session_scope_is_isolated_per_session() {
        let store = ContextStore::new();
        store
            .set(ContextScope::Session, Some("s1"), "k".into(), Value::Number(1.0))
            .await
            .unwrap();
        store
            .set(ContextScope::Session, Some("s2"), "k".into(), Value::Number(2.0))
            .await
            .unwrap();
        assert_eq!(
            store.get(ContextScope::Session, Some("s1"), "k").await.unwrap(),
            Some(Value::Number(1.0))
        );
        assert_eq!(
            store.get(ContextScope::Session, Some("s2"), "k").await.unwrap(),
            Some(Value::Number(2.0))
        );
    }

    #[tokio::test]
    async fn session_scope_without_session_id_is_an_error() {
        let store = ContextStore::new();
        let result = store.set(ContextScope::Session, None, "k".into(), Value::Null).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn missing_key_is_none_not_error() {
        let store = ContextStore::new();
        let got = store.get(ContextScope::Global, None, "missing").await.unwrap();
        assert_eq!(got, None);
    }
}
