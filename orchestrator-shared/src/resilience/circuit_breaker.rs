//! Circuit breaker state machine.
//!
//! Closed → Open on `failure_threshold` consecutive failures. Open → HalfOpen
//! once `timeout` has elapsed since the circuit opened. HalfOpen → Closed
//! after `success_threshold` consecutive successes; any failure while
//! HalfOpen reopens immediately. `force_open`/`force_closed` override the
//! state machine at any time.

use crate::resilience::behavior::CircuitBreakerBehavior;
use crate::resilience::config::CircuitBreakerConfig;
use crate::resilience::metrics::CircuitBreakerMetrics;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// The three states a circuit breaker can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl From<u8> for CircuitState {
    /// Invalid byte values default to `Open` — a corrupt state should fail
    /// closed against traffic, not open.
    fn from(value: u8) -> Self {
        match value {
            0 => CircuitState::Closed,
            2 => CircuitState::HalfOpen,
            1 => CircuitState::Open,
            _ => CircuitState::Open,
        }
    }
}

impl From<CircuitState> for u8 {
    fn from(state: CircuitState) -> Self {
        match state {
            CircuitState::Closed => 0,
            CircuitState::Open => 1,
            CircuitState::HalfOpen => 2,
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    total_calls: AtomicU64,
    success_count: AtomicU64,
    failure_count: AtomicU64,
    consecutive_failures: AtomicU64,
    consecutive_successes: AtomicU64,
    half_open_calls: AtomicU64,
    total_duration_millis: AtomicU64,
}

/// A single guarded resource's circuit breaker.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    state: AtomicU8,
    opened_at: Mutex<Option<Instant>>,
    counters: Counters,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            state: AtomicU8::new(CircuitState::Closed.into()),
            opened_at: Mutex::new(None),
            counters: Counters::default(),
        }
    }

    fn raw_state(&self) -> CircuitState {
        CircuitState::from(self.state.load(Ordering::SeqCst))
    }

    fn transition(&self, to: CircuitState) {
        let from = self.raw_state();
        if from == to {
            return;
        }
        self.state.store(to.into(), Ordering::SeqCst);
        if to == CircuitState::Open {
            *self.opened_at.lock().unwrap() = Some(Instant::now());
        }
        if to == CircuitState::Closed || to == CircuitState::HalfOpen {
            self.counters.consecutive_failures.store(0, Ordering::SeqCst);
            self.counters.consecutive_successes.store(0, Ordering::SeqCst);
        }
        if to == CircuitState::HalfOpen {
            self.counters.half_open_calls.store(0, Ordering::SeqCst);
        }
        tracing::info!(
            circuit_breaker = %self.name,
            from_state = ?from,
            to_state = ?to,
            "circuit breaker state transition"
        );
    }

    /// Re-evaluates Open → HalfOpen on elapsed timeout, then reports whether
    /// a call should be let through.
    pub fn should_allow(&self) -> bool {
        match self.raw_state() {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => {
                self.counters.half_open_calls.load(Ordering::SeqCst) < self.config.half_open_max_attempts as u64
            }
            CircuitState::Open => {
                let elapsed = self
                    .opened_at
                    .lock()
                    .unwrap()
                    .map(|at| at.elapsed() >= self.config.timeout)
                    .unwrap_or(false);
                if elapsed {
                    self.transition(CircuitState::HalfOpen);
                    true
                } else {
                    false
                }
            }
        }
    }

    fn record_duration(&self, duration: Duration) {
        self.counters.total_calls.fetch_add(1, Ordering::SeqCst);
        self.counters
            .total_duration_millis
            .fetch_add(duration.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn record_success_manual(&self, duration: Duration) {
        self.record_duration(duration);
        self.counters.success_count.fetch_add(1, Ordering::SeqCst);
        self.counters.consecutive_failures.store(0, Ordering::SeqCst);

        match self.raw_state() {
            CircuitState::HalfOpen => {
                self.counters.half_open_calls.fetch_add(1, Ordering::SeqCst);
                let successes = self.counters.consecutive_successes.fetch_add(1, Ordering::SeqCst) + 1;
                if successes >= self.config.success_threshold as u64 {
                    self.transition(CircuitState::Closed);
                }
            }
            CircuitState::Closed => {
                self.counters.consecutive_successes.fetch_add(1, Ordering::SeqCst);
            }
            CircuitState::Open => {}
        }
    }

    pub fn record_failure_manual(&self, duration: Duration) {
        self.record_duration(duration);
        self.counters.failure_count.fetch_add(1, Ordering::SeqCst);
        self.counters.consecutive_successes.store(0, Ordering::SeqCst);

        match self.raw_state() {
            CircuitState::HalfOpen => {
                self.counters.half_open_calls.fetch_add(1, Ordering::SeqCst);
                self.transition(CircuitState::Open);
            }
            CircuitState::Closed => {
                let failures = self.counters.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
                if failures >= self.config.failure_threshold as u64 {
                    self.transition(CircuitState::Open);
                }
            }
            CircuitState::Open => {}
        }
    }

    pub fn force_open(&self) {
        self.transition(CircuitState::Open);
    }

    pub fn force_closed(&self) {
        self.transition(CircuitState::Closed);
        self.counters.consecutive_failures.store(0, Ordering::SeqCst);
    }
}

impl CircuitBreakerBehavior for CircuitBreaker {
    fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> CircuitState {
        self.raw_state()
    }

    fn should_allow(&self) -> bool {
        CircuitBreaker::should_allow(self)
    }

    fn record_success(&self, duration: Duration) {
        self.record_success_manual(duration)
    }

    fn record_failure(&self, duration: Duration) {
        self.record_failure_manual(duration)
    }

    fn is_healthy(&self) -> bool {
        self.raw_state() != CircuitState::Open
    }

    fn force_open(&self) {
        CircuitBreaker::force_open(self)
    }

    fn force_closed(&self) {
        CircuitBreaker::force_closed(self)
    }

    fn metrics(&self) -> CircuitBreakerMetrics {
        let total_calls = self.counters.total_calls.load(Ordering::SeqCst);
        let success_count = self.counters.success_count.load(Ordering::SeqCst);
        let failure_count = self.counters.failure_count.load(Ordering::SeqCst);
        let total_duration = Duration::from_millis(self.counters.total_duration_millis.load(Ordering::SeqCst));
        let average_duration = if total_calls > 0 {
            total_duration / total_calls as u32
        } else {
            Duration::ZERO
        };
        CircuitBreakerMetrics {
            total_calls,
            success_count,
            failure_count,
            consecutive_failures: self.counters.consecutive_failures.load(Ordering::SeqCst),
            half_open_calls: self.counters.half_open_calls.load(Ordering::SeqCst),
            total_duration,
            current_state: self.raw_state(),
            failure_rate: if total_calls > 0 {
                failure_count as f64 / total_calls as f64
            } else {
                0.0
            },
            success_rate: if total_calls > 0 {
                success_count as f64 / total_calls as f64
            } else {
                0.0
            },
            average_duration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(failure_threshold: u32, success_threshold: u32, timeout: Duration) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold,
            timeout,
            success_threshold,
            half_open_max_attempts: success_threshold.max(1),
        }
    }

    #[test]
    fn circuit_state_from_u8_conversion() {
        assert_eq!(CircuitState::from(0), CircuitState::Closed);
        assert_eq!(CircuitState::from(1), CircuitState::Open);
        assert_eq!(CircuitState::from(2), CircuitState::HalfOpen);
        assert_eq!(CircuitState::from(3), CircuitState::Open);
        assert_eq!(CircuitState::from(255), CircuitState::Open);
    }

    #[test]
    fn opens_at_exact_failure_threshold() {
        let cb = CircuitBreaker::new("test", config(3, 1, Duration::from_secs(60)));
        cb.record_failure_manual(Duration::from_millis(1));
        cb.record_failure_manual(Duration::from_millis(1));
        assert_eq!(cb.state(), CircuitState::Closed);
        cb.record_failure_manual(Duration::from_millis(1));
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(!cb.should_allow());
    }

    #[test]
    fn half_open_closes_after_success_threshold() {
        let cb = CircuitBreaker::new("test", config(1, 2, Duration::from_millis(0)));
        cb.record_failure_manual(Duration::from_millis(1));
        assert_eq!(cb.state(), CircuitState::Open);

        assert!(cb.should_allow());
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        cb.record_success_manual(Duration::from_millis(1));
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        cb.record_success_manual(Duration::from_millis(1));
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn failure_in_half_open_reopens_immediately() {
        let cb = CircuitBreaker::new("test", config(1, 3, Duration::from_millis(0)));
        cb.record_failure_manual(Duration::from_millis(1));
        assert!(cb.should_allow());
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        cb.record_failure_manual(Duration::from_millis(1));
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[test]
    fn force_open_and_force_closed_override_at_any_time() {
        let cb = CircuitBreaker::new("test", CircuitBreakerConfig::default());
        cb.force_open();
        assert_eq!(cb.state(), CircuitState::Open);
        cb.force_closed();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn stays_open_before_timeout_elapses() {
        let cb = CircuitBreaker::new("test", config(1, 1, Duration::from_secs(60)));
        cb.record_failure_manual(Duration::from_millis(1));
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(!cb.should_allow());
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[test]
    fn metrics_report_failure_and_success_rates() {
        let cb = CircuitBreaker::new("test", config(10, 1, Duration::from_secs(60)));
        cb.record_success_manual(Duration::from_millis(10));
        cb.record_failure_manual(Duration::from_millis(20));
        let metrics = cb.metrics();
        assert_eq!(metrics.total_calls, 2);
        assert_eq!(metrics.success_count, 1);
        assert_eq!(metrics.failure_count, 1);
        assert_eq!(metrics.average_duration, Duration::from_millis(15));
    }
}
