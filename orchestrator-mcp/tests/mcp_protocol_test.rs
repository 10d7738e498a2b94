//! MCP protocol integration test.
//!
//! Verifies the server's tool discovery (`list_tools`) and one full
//! `call_tool` round-trip over a real duplex transport, rather than calling
//! the tool methods directly as the `#[cfg(test)]` modules do.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rmcp::model::{CallToolRequestParams, ClientInfo};
use rmcp::{ClientHandler, ServiceExt};

use orchestrator_core::provider::{ModelApiError, ModelRequest, ModelResponse, ProviderAdapter, TokenUsage};
use orchestrator_core::Orchestrator;
use orchestrator_mcp::server::OrchestratorMcpServer;
use orchestrator_shared::config::OrchestratorConfig;

#[derive(Debug)]
struct FixedJsonAdapter {
    content: String,
}

#[async_trait]
impl ProviderAdapter for FixedJsonAdapter {
    fn provider_name(&self) -> &str {
        "anthropic"
    }

    async fn execute(&self, request: ModelRequest) -> Result<ModelResponse, ModelApiError> {
        Ok(ModelResponse {
            content: self.content.clone(),
            tool_calls: Vec::new(),
            finish_reason: "stop".into(),
            model: request.model,
            tokens_used: TokenUsage::default(),
            fallback_info: None,
        })
    }
}

fn test_server() -> OrchestratorMcpServer {
    let mut adapters: HashMap<String, Arc<dyn ProviderAdapter>> = HashMap::new();
    adapters.insert(
        "anthropic".into(),
        Arc::new(FixedJsonAdapter {
            content: r#"{"tasks": [{"id": "t1", "description": "research it", "type": "research", "dependencies": []}]}"#
                .to_string(),
        }),
    );
    let orchestrator = Arc::new(Orchestrator::new(adapters, OrchestratorConfig::default()));
    OrchestratorMcpServer::new(orchestrator)
}

#[derive(Debug, Clone, Default)]
struct DummyClient;

impl ClientHandler for DummyClient {
    fn get_info(&self) -> ClientInfo {
        ClientInfo::default()
    }
}

#[tokio::test]
async fn list_tools_includes_every_tool_call() -> anyhow::Result<()> {
    let (server_transport, client_transport) = tokio::io::duplex(4096);

    let server = test_server();
    let server_handle = tokio::spawn(async move {
        let service = server.serve(server_transport).await?;
        service.waiting().await?;
        anyhow::Ok(())
    });

    let client = DummyClient.serve(client_transport).await?;

    let tools = client.list_tools(None).await?;
    let tool_names: Vec<&str> = tools.tools.iter().map(|t| t.name.as_ref()).collect();
    for expected in [
        "create_task",
        "get_task",
        "wait_for_task",
        "cancel_task",
        "list_tasks",
        "context_set",
        "context_get",
        "suggest_role",
    ] {
        assert!(tool_names.contains(&expected), "missing tool: {expected}, got {tool_names:?}");
    }

    client.cancel().await?;
    server_handle.await??;
    Ok(())
}

#[tokio::test]
async fn create_task_then_wait_for_task_round_trips_over_the_wire() -> anyhow::Result<()> {
    let (server_transport, client_transport) = tokio::io::duplex(4096);

    let server = test_server();
    let server_handle = tokio::spawn(async move {
        let service = server.serve(server_transport).await?;
        service.waiting().await?;
        anyhow::Ok(())
    });

    let client = DummyClient.serve(client_transport).await?;

    let created = client
        .call_tool(CallToolRequestParams {
            meta: None,
            name: "create_task".into(),
            arguments: Some(
                serde_json::json!({ "request": "build something small" })
                    .as_object()
                    .unwrap()
                    .clone(),
            ),
            task: None,
        })
        .await?;
    let created_text = created
        .content
        .first()
        .and_then(|c| c.raw.as_text())
        .map(|t| t.text.as_str())
        .expect("expected text content");
    let created_json: serde_json::Value = serde_json::from_str(created_text)?;
    let task_id = created_json["task_id"].as_str().unwrap().to_string();

    let waited = client
        .call_tool(CallToolRequestParams {
            meta: None,
            name: "wait_for_task".into(),
            arguments: Some(
                serde_json::json!({ "task_id": task_id, "timeout_ms": 5000 })
                    .as_object()
                    .unwrap()
                    .clone(),
            ),
            task: None,
        })
        .await?;
    let waited_text = waited
        .content
        .first()
        .and_then(|c| c.raw.as_text())
        .map(|t| t.text.as_str())
        .expect("expected text content");
    let waited_json: serde_json::Value = serde_json::from_str(waited_text)?;

    assert_eq!(waited_json["status"], "completed");
    assert!(waited_json["report"]["aggregated"]["statistics"]["total"].as_u64().unwrap() >= 1);

    client.cancel().await?;
    server_handle.await??;
    Ok(())
}
