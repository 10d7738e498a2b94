//! xAI (Grok) adapter — OpenAI-compatible chat completions surface.

use crate::provider::adapters::{map_transport_error, shared_http_client};
use crate::provider::{MessageRole, ModelApiError, ModelRequest, ModelResponse, ProviderAdapter, TokenUsage};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.x.ai/v1/chat/completions";

#[derive(Debug)]
pub struct XaiAdapter {
    api_key: String,
    base_url: String,
}

impl XaiAdapter {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    model: String,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatErrorBody {
    error: ChatErrorDetail,
}

#[derive(Deserialize)]
struct ChatErrorDetail {
    message: String,
}

fn role_str(role: MessageRole) -> &'static str {
    match role {
        MessageRole::System => "system",
        MessageRole::User => "user",
        MessageRole::Assistant => "assistant",
    }
}

#[async_trait]
impl ProviderAdapter for XaiAdapter {
    fn provider_name(&self) -> &str {
        "xai"
    }

    async fn execute(&self, request: ModelRequest) -> Result<ModelResponse, ModelApiError> {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(system_prompt) = &request.system_prompt {
            messages.push(ChatMessage {
                role: "system",
                content: system_prompt.clone(),
            });
        }
        messages.extend(request.messages.iter().map(|m| ChatMessage {
            role: role_str(m.role),
            content: m.content.clone(),
        }));

        let body = ChatRequest {
            model: request.model.clone(),
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = shared_http_client()
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| map_transport_error("xai", &err))?;

        let status = response.status();
        let text = response.text().await.map_err(|err| map_transport_error("xai", &err))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ChatErrorBody>(&text)
                .map(|b| b.error.message)
                .unwrap_or(text);
            return Err(ModelApiError::new("xai", format!("{status}: {message}")));
        }

        let parsed: ChatResponse =
            serde_json::from_str(&text).map_err(|err| ModelApiError::new("xai", format!("bad response body: {err}")))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ModelApiError::new("xai", "response contained no choices"))?;

        Ok(ModelResponse {
            content: choice.message.content.unwrap_or_default(),
            tool_calls: Vec::new(),
            finish_reason: choice.finish_reason.unwrap_or_default(),
            model: parsed.model,
            tokens_used: parsed
                .usage
                .map(|u| TokenUsage {
                    input: u.prompt_tokens,
                    output: u.completion_tokens,
                })
                .unwrap_or_default(),
            fallback_info: None,
        })
    }
}
