//! # Agent Orchestrator Server
//!
//! Thin wrapper binary that boots the orchestrator and serves its MCP
//! tool-call API over stdio. Production deployment target.
//!
//! ## Usage
//!
//! ```bash
//! ANTHROPIC_API_KEY=... cargo run --bin agent-orchestrator
//! ```

use tokio::signal;
use tracing::{error, info};

use orchestrator_shared::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_tracing();

    info!("Starting Agent Orchestrator...");
    info!("   Version: {}", env!("CARGO_PKG_VERSION"));
    info!("   Build Mode: {}", if cfg!(debug_assertions) { "Debug" } else { "Release" });

    tokio::select! {
        result = orchestrator_mcp::run() => {
            if let Err(err) = result {
                error!("MCP server exited with an error: {err}");
                return Err(err);
            }
            info!("MCP server exited (client disconnected)");
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
