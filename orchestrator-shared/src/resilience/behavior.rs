//! Circuit breaker behavior trait.
//!
//! Defines the `CircuitBreakerBehavior` trait that unifies all circuit
//! breaker implementations in the system. Each specialized circuit breaker
//! (provider health, any future guarded resource) implements this trait
//! while retaining domain-specific convenience methods.
//!
//! The trait is object-safe (`Send + Sync + Debug`) so that consumers can
//! work with `&dyn CircuitBreakerBehavior` when uniform access to any
//! breaker is needed (e.g. health reporting). Concrete types are preferred
//! in hot paths for zero-cost dispatch.

use crate::resilience::{CircuitBreakerMetrics, CircuitState};
use std::time::Duration;

/// Unified interface for all circuit breaker implementations.
pub trait CircuitBreakerBehavior: Send + Sync + std::fmt::Debug {
    /// The component name this circuit breaker protects.
    fn name(&self) -> &str;

    /// The current circuit state.
    fn state(&self) -> CircuitState;

    /// Whether the circuit allows the next call. `true` for Closed, `true`
    /// for HalfOpen (limited), and `true` for Open only once the recovery
    /// timeout has elapsed (transitioning to HalfOpen).
    fn should_allow(&self) -> bool;

    /// Record a successful operation with its duration.
    fn record_success(&self, duration: Duration);

    /// Record a failed operation with its duration.
    fn record_failure(&self, duration: Duration);

    /// Whether the circuit breaker considers the component healthy.
    fn is_healthy(&self) -> bool;

    /// Force the circuit to open state (emergency kill switch).
    fn force_open(&self);

    /// Force the circuit to closed state (emergency recovery).
    fn force_closed(&self);

    /// A metrics snapshot for observability.
    fn metrics(&self) -> CircuitBreakerMetrics;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time proof that CircuitBreakerBehavior is object-safe.
    fn _assert_object_safe(_: &dyn CircuitBreakerBehavior) {}
}
