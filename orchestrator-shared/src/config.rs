//! Environment-driven configuration (spec §6).
//!
//! Every knob here has a documented default and is read once at startup.
//! Provider credentials are read the same way: missing credentials disable
//! that provider without aborting startup.

use std::env;
use std::time::Duration;

/// Orchestration-wide execution limits, loaded from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorConfig {
    /// `MAX_PARALLEL_AGENTS` — process-wide ceiling on concurrently running
    /// agents, enforced by the `AgentManager`'s semaphore.
    pub max_parallel_agents: usize,
    /// `MAX_PARALLEL_TASKS` — the executor's per-level batch size.
    pub max_parallel_tasks: usize,
    /// `TASK_TIMEOUT` — per-task wall-clock timeout.
    pub task_timeout: Duration,
    /// `MAX_RETRIES` — max attempts per task (including the first).
    pub max_retries: u32,
    /// `CIRCUIT_FAILURE_THRESHOLD` — default circuit breaker failure
    /// threshold for provider health management.
    pub circuit_failure_threshold: u32,
    /// `CIRCUIT_RESET_TIMEOUT` — default circuit breaker reset timeout.
    pub circuit_reset_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_parallel_agents: 5,
            max_parallel_tasks: 5,
            task_timeout: Duration::from_millis(300_000),
            max_retries: 3,
            circuit_failure_threshold: 5,
            circuit_reset_timeout: Duration::from_millis(60_000),
        }
    }
}

impl OrchestratorConfig {
    /// Load from environment variables, falling back to the documented
    /// defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_parallel_agents: env_usize("MAX_PARALLEL_AGENTS", defaults.max_parallel_agents),
            max_parallel_tasks: env_usize("MAX_PARALLEL_TASKS", defaults.max_parallel_tasks),
            task_timeout: Duration::from_millis(env_u64(
                "TASK_TIMEOUT",
                defaults.task_timeout.as_millis() as u64,
            )),
            max_retries: env_u32("MAX_RETRIES", defaults.max_retries),
            circuit_failure_threshold: env_u32(
                "CIRCUIT_FAILURE_THRESHOLD",
                defaults.circuit_failure_threshold,
            ),
            circuit_reset_timeout: Duration::from_millis(env_u64(
                "CIRCUIT_RESET_TIMEOUT",
                defaults.circuit_reset_timeout.as_millis() as u64,
            )),
        }
    }
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// Read a provider credential from the environment. Returns `None` (rather
/// than erroring) when unset, so provider init can disable the provider
/// instead of aborting startup (spec §6).
pub fn provider_credential(env_var: &str) -> Option<String> {
    env::var(env_var).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn defaults_match_spec() {
        let cfg = OrchestratorConfig::default();
        assert_eq!(cfg.max_parallel_agents, 5);
        assert_eq!(cfg.max_parallel_tasks, 5);
        assert_eq!(cfg.task_timeout, Duration::from_millis(300_000));
        assert_eq!(cfg.max_retries, 3);
        assert_eq!(cfg.circuit_failure_threshold, 5);
        assert_eq!(cfg.circuit_reset_timeout, Duration::from_millis(60_000));
    }

    #[test]
    fn reads_overrides_from_env() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::set_var("MAX_RETRIES", "7");
        let cfg = OrchestratorConfig::from_env();
        assert_eq!(cfg.max_retries, 7);
        env::remove_var("MAX_RETRIES");
    }

    #[test]
    fn missing_credential_is_none_not_error() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::remove_var("DOES_NOT_EXIST_PROVIDER_KEY");
        assert_eq!(provider_credential("DOES_NOT_EXIST_PROVIDER_KEY"), None);
    }
}
