//! Model-agnostic agent orchestration server.
//!
//! This crate is a thin top-level facade: all orchestration logic lives in
//! [`orchestrator_core`] (decomposition, DAG scheduling, provider routing),
//! [`orchestrator_shared`] (config, errors, logging, the `Value` payload
//! type), and the tool-call surface lives in [`orchestrator_mcp`]. The
//! `agent-orchestrator` binary just wires environment configuration to
//! [`orchestrator_mcp::run`].

pub use orchestrator_core::{Orchestrator, OrchestrationReport};
pub use orchestrator_mcp::server::OrchestratorMcpServer;
pub use orchestrator_shared::config::OrchestratorConfig;
pub use orchestrator_shared::error::OrchestratorError;
