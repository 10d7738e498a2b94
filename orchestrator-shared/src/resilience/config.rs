//! Circuit breaker configuration.

use std::time::Duration;
use thiserror::Error;

/// Configuration for one `CircuitBreaker` instance (spec §4.8).
#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures needed to open the circuit.
    pub failure_threshold: u32,
    /// How long to stay open before allowing a half-open probe.
    pub timeout: Duration,
    /// Successes needed in half-open to close the circuit.
    pub success_threshold: u32,
    /// Maximum number of probe attempts allowed while half-open.
    pub half_open_max_attempts: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            timeout: Duration::from_millis(60_000),
            success_threshold: 1,
            half_open_max_attempts: 1,
        }
    }
}

#[derive(Debug, Error)]
pub enum CircuitBreakerConfigError {
    #[error("failure_threshold must be positive")]
    NonPositiveFailureThreshold,
    #[error("success_threshold must be positive")]
    NonPositiveSuccessThreshold,
    #[error("half_open_max_attempts must be positive")]
    NonPositiveHalfOpenMaxAttempts,
    #[error("success_threshold ({success_threshold}) cannot exceed half_open_max_attempts ({half_open_max_attempts})")]
    SuccessThresholdExceedsHalfOpenAttempts {
        success_threshold: u32,
        half_open_max_attempts: u32,
    },
}

impl CircuitBreakerConfig {
    /// Validate thresholds per spec §4.8: "Config validation must reject
    /// `successThreshold > halfOpenMaxAttempts` and any non-positive
    /// thresholds."
    pub fn validate(&self) -> Result<(), CircuitBreakerConfigError> {
        if self.failure_threshold == 0 {
            return Err(CircuitBreakerConfigError::NonPositiveFailureThreshold);
        }
        if self.success_threshold == 0 {
            return Err(CircuitBreakerConfigError::NonPositiveSuccessThreshold);
        }
        if self.half_open_max_attempts == 0 {
            return Err(CircuitBreakerConfigError::NonPositiveHalfOpenMaxAttempts);
        }
        if self.success_threshold > self.half_open_max_attempts {
            return Err(CircuitBreakerConfigError::SuccessThresholdExceedsHalfOpenAttempts {
                success_threshold: self.success_threshold,
                half_open_max_attempts: self.half_open_max_attempts,
            });
        }
        Ok(())
    }
}

/// Process-wide circuit breaker settings not specific to any one instance.
#[derive(Debug, Clone, Copy)]
pub struct GlobalCircuitBreakerSettings {
    pub max_circuit_breakers: usize,
    pub metrics_collection_interval: Duration,
    pub min_state_transition_interval: Duration,
}

impl Default for GlobalCircuitBreakerSettings {
    fn default() -> Self {
        Self {
            max_circuit_breakers: 50,
            metrics_collection_interval: Duration::from_secs(30),
            min_state_transition_interval: Duration::from_millis(100),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(CircuitBreakerConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_zero_thresholds() {
        let mut cfg = CircuitBreakerConfig::default();
        cfg.failure_threshold = 0;
        assert!(matches!(
            cfg.validate(),
            Err(CircuitBreakerConfigError::NonPositiveFailureThreshold)
        ));
    }

    #[test]
    fn rejects_success_threshold_over_half_open_attempts() {
        let cfg = CircuitBreakerConfig {
            success_threshold: 3,
            half_open_max_attempts: 2,
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(CircuitBreakerConfigError::SuccessThresholdExceedsHalfOpenAttempts { .. })
        ));
    }
}
