//! Agent Orchestrator MCP Server
//!
//! Model Context Protocol server exposing the agent orchestrator's
//! background-task tool API (spec §6) over stdio: create/poll/wait/cancel
//! orchestration runs, a shared context store, and role suggestion.

use orchestrator_shared::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_tracing();
    orchestrator_mcp::run().await
}
