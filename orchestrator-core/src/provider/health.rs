//! Provider Health Manager (spec §4.8, data model §3 "Provider State").
//!
//! Each provider gets a rate-limit cooldown timer (independent of the
//! generic circuit breaker) plus an `orchestrator_shared::resilience::CircuitBreaker`
//! configured to the spec's `MAX_CONSECUTIVE_ERRORS` / reset-timeout pair —
//! reusing the same primitive used for "any guarded call" (spec §9) rather
//! than hand-rolling a second state machine.

use crate::provider::ModelApiError;
use orchestrator_shared::error::ModelApiErrorKind;
use orchestrator_shared::resilience::{CircuitBreaker, CircuitBreakerBehavior, CircuitBreakerConfig, CircuitState};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

const MAX_CONSECUTIVE_ERRORS: u32 = 3;
const CIRCUIT_RESET_TIMEOUT: Duration = Duration::from_millis(300_000);
const DEFAULT_RATE_LIMIT_COOLDOWN: Duration = Duration::from_millis(60_000);

/// Snapshot of one provider's health, safe to hand out to callers (spec §3).
#[derive(Debug, Clone)]
pub struct ProviderStateSnapshot {
    pub available: bool,
    pub consecutive_errors: u32,
    pub last_error: Option<String>,
    pub has_last_success: bool,
    pub cooldown_remaining: Option<Duration>,
    pub circuit_open: bool,
}

struct ProviderState {
    consecutive_errors: u32,
    last_error: Option<String>,
    last_success_at: Option<Instant>,
    cooldown_until: Option<Instant>,
    breaker: CircuitBreaker,
}

impl ProviderState {
    fn new(name: &str) -> Self {
        Self {
            consecutive_errors: 0,
            last_error: None,
            last_success_at: None,
            cooldown_until: None,
            breaker: CircuitBreaker::new(
                name.to_string(),
                CircuitBreakerConfig {
                    failure_threshold: MAX_CONSECUTIVE_ERRORS,
                    timeout: CIRCUIT_RESET_TIMEOUT,
                    success_threshold: 1,
                    half_open_max_attempts: 1,
                },
            ),
        }
    }
}

/// Parses a `retry-after: N` directive (seconds) out of an error message,
/// falling back to the default cooldown when absent.
fn parse_retry_after(message: &str) -> Duration {
    let lowered = message.to_lowercase();
    if let Some(idx) = lowered.find("retry-after:") {
        let rest = lowered[idx + "retry-after:".len()..].trim();
        let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
        if let Ok(seconds) = digits.parse::<u64>() {
            return Duration::from_secs(seconds);
        }
    }
    DEFAULT_RATE_LIMIT_COOLDOWN
}

/// Tracks per-provider health: consecutive errors, cooldowns, and a circuit
/// breaker, gating whether the Model Router should attempt a given provider.
#[derive(Debug)]
pub struct ProviderHealthManager {
    states: Mutex<HashMap<String, ProviderState>>,
}

impl std::fmt::Debug for ProviderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderState")
            .field("consecutive_errors", &self.consecutive_errors)
            .field("circuit_state", &self.breaker.state())
            .finish()
    }
}

impl Default for ProviderHealthManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderHealthManager {
    pub fn new() -> Self {
        Self {
            states: Mutex::new(HashMap::new()),
        }
    }

    fn with_state<R>(&self, provider: &str, f: impl FnOnce(&mut ProviderState) -> R) -> R {
        let mut states = self.states.lock().unwrap();
        let state = states
            .entry(provider.to_string())
            .or_insert_with(|| ProviderState::new(provider));
        f(state)
    }

    /// Resets consecutive errors, clears circuit-open/cooldown, records
    /// `lastSuccess` (spec §4.8 `markSuccess`).
    pub fn mark_success(&self, provider: &str) {
        self.with_state(provider, |state| {
            state.consecutive_errors = 0;
            state.last_success_at = Some(Instant::now());
            state.cooldown_until = None;
            state.breaker.record_success_manual(Duration::from_millis(0));
        });
    }

    /// Classifies and records a provider error (spec §4.8 `markError`).
    pub fn mark_error(&self, provider: &str, error: &ModelApiError) {
        self.with_state(provider, |state| {
            state.consecutive_errors += 1;
            state.last_error = Some(error.message.clone());

            if error.kind == ModelApiErrorKind::RateLimit {
                let cooldown = parse_retry_after(&error.message);
                state.cooldown_until = Some(Instant::now() + cooldown);
            }

            state.breaker.record_failure_manual(Duration::from_millis(0));
        });
    }

    /// Whether this provider should be attempted right now (spec §4.8
    /// `checkHealth`): unhealthy while an active rate-limit cooldown exists;
    /// otherwise gated by the circuit breaker, which self-transitions
    /// Open → HalfOpen once its reset timeout elapses (the "single
    /// half-open probe").
    pub fn check_health(&self, provider: &str) -> bool {
        self.with_state(provider, |state| {
            if let Some(until) = state.cooldown_until {
                if Instant::now() < until {
                    return false;
                }
                state.cooldown_until = None;
            }
            state.breaker.should_allow()
        })
    }

    pub fn snapshot(&self, provider: &str) -> ProviderStateSnapshot {
        self.with_state(provider, |state| {
            let now = Instant::now();
            ProviderStateSnapshot {
                available: state.cooldown_until.map(|u| now >= u).unwrap_or(true) && state.breaker.should_allow(),
                consecutive_errors: state.consecutive_errors,
                last_error: state.last_error.clone(),
                has_last_success: state.last_success_at.is_some(),
                cooldown_remaining: state.cooldown_until.map(|u| u.saturating_duration_since(now)),
                circuit_open: state.breaker.state() == CircuitState::Open,
            }
        })
    }
}
