//! One adapter per vendor, each a thin `reqwest`-based HTTP facade sharing
//! one pooled client (grounded on `cloudllm::clients::common::get_shared_http_client`).

pub mod anthropic;
pub mod gemini;
pub mod openai;
pub mod xai;

use crate::provider::ModelApiError;
use std::sync::OnceLock;
use std::time::Duration;

static SHARED_HTTP_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

/// Normalizes a `reqwest` transport error into the uniform adapter error type.
pub(crate) fn map_transport_error(provider: &str, err: &reqwest::Error) -> ModelApiError {
    if err.is_timeout() {
        ModelApiError::new(provider, format!("request timed out: {err}"))
    } else {
        ModelApiError::new(provider, err.to_string())
    }
}

/// Borrow the lazily initialized shared `reqwest::Client`. A single pooled
/// client keeps TLS sessions and DNS lookups warm across every adapter.
pub fn shared_http_client() -> &'static reqwest::Client {
    SHARED_HTTP_CLIENT.get_or_init(|| {
        reqwest::Client::builder()
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .pool_max_idle_per_host(10)
            .tcp_keepalive(Some(Duration::from_secs(60)))
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build shared HTTP client")
    })
}

pub use anthropic::AnthropicAdapter;
pub use gemini::GoogleAdapter;
pub use openai::OpenAiAdapter;
pub use xai::XaiAdapter;
