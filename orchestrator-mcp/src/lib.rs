//! MCP tool-call server exposing the orchestrator to an upstream host
//! (spec §6: "externalized, not part of the core").
//!
//! Everything in this crate is deliberately thin: it tracks background
//! orchestration runs, stores caller-supplied context entries, and maps
//! the tool-call wire shapes onto `orchestrator-core` types. None of the
//! orchestration logic lives here.

pub mod context_store;
pub mod server;
pub mod task_registry;
pub mod tools;

use std::collections::HashMap;
use std::sync::Arc;

use orchestrator_core::provider::adapters::{AnthropicAdapter, GoogleAdapter, OpenAiAdapter, XaiAdapter};
use orchestrator_core::provider::ProviderAdapter;
use orchestrator_core::Orchestrator;
use orchestrator_shared::config::{provider_credential, OrchestratorConfig};
use rmcp::ServiceExt;
use server::OrchestratorMcpServer;

fn build_adapters() -> HashMap<String, Arc<dyn ProviderAdapter>> {
    let mut adapters: HashMap<String, Arc<dyn ProviderAdapter>> = HashMap::new();

    if let Some(key) = provider_credential("ANTHROPIC_API_KEY") {
        adapters.insert("anthropic".to_string(), Arc::new(AnthropicAdapter::new(key)));
    }
    if let Some(key) = provider_credential("OPENAI_API_KEY") {
        adapters.insert("openai".to_string(), Arc::new(OpenAiAdapter::new(key)));
    }
    if let Some(key) = provider_credential("GOOGLE_API_KEY") {
        adapters.insert("google".to_string(), Arc::new(GoogleAdapter::new(key)));
    }
    if let Some(key) = provider_credential("XAI_API_KEY") {
        adapters.insert("xai".to_string(), Arc::new(XaiAdapter::new(key)));
    }

    for provider in &adapters {
        tracing::info!(provider = %provider.0, "provider adapter configured");
    }
    if adapters.is_empty() {
        tracing::warn!("no provider credentials found in the environment; every orchestration run will fail at decomposition");
    }

    adapters
}

/// Assembles the orchestrator from environment-configured provider
/// credentials and serves the MCP tool-call API over stdio until the
/// client disconnects. Shared by this crate's own binary and the
/// top-level `agent-orchestrator` binary.
pub async fn run() -> anyhow::Result<()> {
    tracing::info!("orchestrator-mcp starting (stdio transport)");

    let adapters = build_adapters();
    let orchestrator = Arc::new(Orchestrator::new(adapters, OrchestratorConfig::from_env()));
    let server = OrchestratorMcpServer::new(orchestrator);
    let transport = rmcp::transport::io::stdio();

    let service = server.serve(transport).await?;
    service.waiting().await?;

    Ok(())
}
