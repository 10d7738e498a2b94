//! Google Gemini `generateContent` API adapter.

use crate::provider::adapters::{map_transport_error, shared_http_client};
use crate::provider::{MessageRole, ModelApiError, ModelRequest, ModelResponse, ProviderAdapter, TokenUsage};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Debug)]
pub struct GoogleAdapter {
    api_key: String,
    base_url: String,
}

impl GoogleAdapter {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
    #[serde(rename = "finishReason", default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct UsageMetadata {
    #[serde(rename = "promptTokenCount", default)]
    prompt_token_count: u32,
    #[serde(rename = "candidatesTokenCount", default)]
    candidates_token_count: u32,
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Vec<GeminiCandidate>,
    #[serde(rename = "usageMetadata", default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize)]
struct GeminiErrorBody {
    error: GeminiErrorDetail,
}

#[derive(Deserialize)]
struct GeminiErrorDetail {
    message: String,
}

#[async_trait]
impl ProviderAdapter for GoogleAdapter {
    fn provider_name(&self) -> &str {
        "google"
    }

    async fn execute(&self, request: ModelRequest) -> Result<ModelResponse, ModelApiError> {
        let contents = request
            .messages
            .iter()
            .map(|m| Content {
                role: match m.role {
                    MessageRole::Assistant => "model",
                    MessageRole::System | MessageRole::User => "user",
                },
                parts: vec![Part { text: m.content.clone() }],
            })
            .collect();

        let body = GeminiRequest {
            contents,
            system_instruction: request.system_prompt.clone().map(|text| SystemInstruction {
                parts: vec![Part { text }],
            }),
            generation_config: GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            },
        };

        let url = format!("{}/{}:generateContent", self.base_url, request.model);

        let response = shared_http_client()
            .post(&url)
            .query(&[("key", &self.api_key)])
            .json(&body)
            .send()
            .await
            .map_err(|err| map_transport_error("google", &err))?;

        let status = response.status();
        let text = response.text().await.map_err(|err| map_transport_error("google", &err))?;

        if !status.is_success() {
            let message = serde_json::from_str::<GeminiErrorBody>(&text)
                .map(|b| b.error.message)
                .unwrap_or(text);
            return Err(ModelApiError::new("google", format!("{status}: {message}")));
        }

        let parsed: GeminiResponse =
            serde_json::from_str(&text).map_err(|err| ModelApiError::new("google", format!("bad response body: {err}")))?;

        let candidate = parsed
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| ModelApiError::new("google", "response contained no candidates"))?;

        let content = candidate
            .content
            .parts
            .into_iter()
            .map(|p| p.text)
            .collect::<Vec<_>>()
            .join("");

        Ok(ModelResponse {
            content,
            tool_calls: Vec::new(),
            finish_reason: candidate.finish_reason.unwrap_or_default(),
            model: request.model,
            tokens_used: parsed
                .usage_metadata
                .map(|u| TokenUsage {
                    input: u.prompt_token_count,
                    output: u.candidates_token_count,
                })
                .unwrap_or_default(),
            fallback_info: None,
        })
    }
}
