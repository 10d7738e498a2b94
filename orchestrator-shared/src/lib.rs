//! Shared primitives for the agent orchestrator: the error taxonomy, the
//! generic circuit breaker family, environment-driven configuration, and
//! structured logging setup.
//!
//! Nothing in this crate knows about tasks, agents, or LLM providers — those
//! live in `orchestrator-core`. This crate is the ambient stack every other
//! crate in the workspace builds on.

pub mod config;
pub mod error;
pub mod logging;
pub mod resilience;
pub mod retry;
pub mod value;

pub use error::OrchestratorError;
pub use value::Value;
