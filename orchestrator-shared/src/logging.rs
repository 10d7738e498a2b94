//! Structured logging bootstrap, in the manner of
//! `tasker_shared::logging::init_tracing` (referenced from the teacher's
//! `tasker-orchestration/src/bin/server.rs`).

use tracing_subscriber::EnvFilter;

/// Initialize the global `tracing` subscriber from `RUST_LOG`, defaulting to
/// `info` when unset. Writes to stderr so stdout stays free for any
/// stdio-transport protocol traffic (the MCP server uses stdout for the
/// wire protocol itself).
///
/// Safe to call more than once; subsequent calls are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
