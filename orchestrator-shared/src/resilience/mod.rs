//! Generic circuit breaker primitive shared by every guarded call in the
//! system — not just LLM providers (spec §4.8: "The generic Circuit Breaker
//! primitive... used for any guarded call").
//!
//! Grounded on `tasker_shared::resilience`: the `behavior.rs` trait and
//! `metrics.rs` metrics struct are carried over close to verbatim; the
//! `CircuitBreaker` state machine itself (`circuit_breaker.rs`) is written
//! fresh here since the teacher's concrete implementation wasn't retrieved,
//! following the shape its specialized wrappers (`WebDatabaseCircuitBreaker`,
//! `TaskReadinessCircuitBreaker`) expect of it.

pub mod behavior;
pub mod circuit_breaker;
pub mod config;
pub mod metrics;

pub use behavior::CircuitBreakerBehavior;
pub use circuit_breaker::{CircuitBreaker, CircuitState};
pub use config::{CircuitBreakerConfig, GlobalCircuitBreakerSettings};
pub use metrics::{CircuitBreakerMetrics, MetricsCollector, TracingMetricsCollector};
