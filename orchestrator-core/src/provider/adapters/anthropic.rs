//! Anthropic Messages API adapter.

use crate::provider::adapters::{map_transport_error, shared_http_client};
use crate::provider::{MessageRole, ModelApiError, ModelRequest, ModelResponse, ProviderAdapter, TokenUsage};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug)]
pub struct AnthropicAdapter {
    api_key: String,
    base_url: String,
}

impl AnthropicAdapter {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    #[cfg(test)]
    fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }
}

#[derive(Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct AnthropicContentBlock {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    model: String,
    usage: AnthropicUsage,
}

#[derive(Deserialize)]
struct AnthropicErrorBody {
    error: AnthropicErrorDetail,
}

#[derive(Deserialize)]
struct AnthropicErrorDetail {
    message: String,
}

#[async_trait]
impl ProviderAdapter for AnthropicAdapter {
    fn provider_name(&self) -> &str {
        "anthropic"
    }

    async fn execute(&self, request: ModelRequest) -> Result<ModelResponse, ModelApiError> {
        let messages = request
            .messages
            .iter()
            .map(|m| AnthropicMessage {
                role: match m.role {
                    MessageRole::Assistant => "assistant",
                    // Anthropic has no "system" role within the message list;
                    // system content is folded into the top-level `system` field.
                    MessageRole::System | MessageRole::User => "user",
                },
                content: m.content.clone(),
            })
            .collect();

        let body = AnthropicRequest {
            model: request.model.clone(),
            system: request.system_prompt.clone(),
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let response = shared_http_client()
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|err| map_transport_error("anthropic", &err))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| map_transport_error("anthropic", &err))?;

        if !status.is_success() {
            let message = serde_json::from_str::<AnthropicErrorBody>(&text)
                .map(|body| body.error.message)
                .unwrap_or(text);
            return Err(ModelApiError::new("anthropic", format!("{status}: {message}")));
        }

        let parsed: AnthropicResponse =
            serde_json::from_str(&text).map_err(|err| ModelApiError::new("anthropic", format!("bad response body: {err}")))?;

        Ok(ModelResponse {
            content: parsed.content.into_iter().map(|b| b.text).collect::<Vec<_>>().join(""),
            tool_calls: Vec::new(),
            finish_reason: parsed.stop_reason.unwrap_or_default(),
            model: parsed.model,
            tokens_used: TokenUsage {
                input: parsed.usage.input_tokens,
                output: parsed.usage.output_tokens,
            },
            fallback_info: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MessageRole;

    #[test]
    fn adapter_name_is_anthropic() {
        let adapter = AnthropicAdapter::with_base_url("key", "http://localhost");
        assert_eq!(adapter.provider_name(), "anthropic");
    }

    #[test]
    fn request_body_folds_system_messages_into_top_level_system() {
        let request = ModelRequest {
            model: "claude-sonnet-4-5".into(),
            system_prompt: Some("be helpful".into()),
            messages: vec![crate::provider::ModelMessage {
                role: MessageRole::User,
                content: "hi".into(),
            }],
            tools: None,
            temperature: 0.3,
            max_tokens: 100,
        };
        assert_eq!(request.system_prompt.as_deref(), Some("be helpful"));
    }
}
