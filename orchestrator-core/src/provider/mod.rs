//! Provider Adapter contract and the normalized request/response shapes the
//! Model Router speaks (spec §4.7). One adapter per vendor lives under
//! `adapters`; the router never reads vendor-specific fields (spec §9:
//! "duck-typed provider response shapes... the engine never reads
//! vendor-specific fields").

pub mod adapters;
pub mod health;
pub mod router;

use async_trait::async_trait;
use orchestrator_shared::error::ModelApiErrorKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single chat message in the normalized wire format every adapter
/// converts to and from its vendor's own shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMessage {
    pub role: MessageRole,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters_schema: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    pub arguments: serde_json::Value,
}

/// Normalized request every adapter accepts (spec §4.7).
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub model: String,
    pub system_prompt: Option<String>,
    pub messages: Vec<ModelMessage>,
    pub tools: Option<Vec<ToolDefinition>>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl ModelRequest {
    pub fn simple(model: impl Into<String>, system_prompt: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system_prompt: Some(system_prompt.into()),
            messages: vec![ModelMessage {
                role: MessageRole::User,
                content: user_prompt.into(),
            }],
            tools: None,
            temperature: 0.7,
            max_tokens: 4096,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input: u32,
    pub output: u32,
}

/// Normalized response every adapter produces (spec §4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelResponse {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
    pub finish_reason: String,
    pub model: String,
    pub tokens_used: TokenUsage,
    /// Present when the router had to fall back from the originally
    /// requested provider (spec §4.7, §8 scenario 6).
    pub fallback_info: Option<FallbackInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackInfo {
    pub original_provider: String,
    pub used_provider: String,
    pub reason: String,
}

/// Uniform error wrapper every adapter normalizes vendor errors into (spec
/// §4.7: "Adapters wrap vendor errors into a uniform `ModelAPIError` with a
/// provider tag, preserving retryability signals where possible.").
#[derive(Debug, Clone)]
pub struct ModelApiError {
    pub provider: String,
    pub kind: ModelApiErrorKind,
    pub message: String,
    /// `retryable` flag carried explicitly when the vendor signals it (spec
    /// §4.4 step 2: "if the thrown error carries a retryable flag, obey it").
    pub retryable: Option<bool>,
}

impl ModelApiError {
    pub fn new(provider: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        let kind = ModelApiErrorKind::classify(&message);
        Self {
            provider: provider.into(),
            kind,
            message,
            retryable: None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.retryable.unwrap_or_else(|| self.kind.is_retryable_by_default())
    }
}

impl fmt::Display for ModelApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {:?}: {}", self.provider, self.kind, self.message)
    }
}

impl std::error::Error for ModelApiError {}

/// One vendor's uniform request/response facade (spec §4.7).
#[async_trait]
pub trait ProviderAdapter: Send + Sync + fmt::Debug {
    /// The provider tag used in health tracking and fallback info (e.g. "anthropic").
    fn provider_name(&self) -> &str;

    async fn execute(&self, request: ModelRequest) -> Result<ModelResponse, ModelApiError>;

    /// Multi-turn tool-using call (spec §4.7 `executeWithTools`). Default
    /// implementation delegates to `execute`, ignoring tools, for vendors
    /// without native tool-calling support wired up yet.
    async fn execute_with_tools(&self, request: ModelRequest) -> Result<ModelResponse, ModelApiError> {
        self.execute(request).await
    }
}
