//! The error taxonomy shared across the orchestrator (spec §7).
//!
//! Task-level failures never surface as a Rust `Err` once they reach the
//! executor — they are captured as an `ExecutionResult` instead. Only
//! configuration and DAG-validation errors propagate by throwing; this enum
//! is for the cases that do.

use thiserror::Error;

/// Top-level error kind shared across crate boundaries.
///
/// Individual components (the decomposer, the DAG builder, the provider
/// router, ...) define their own narrower `thiserror` enums and convert into
/// this one at the points where a caller outside the component needs a
/// single type to match on.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Malformed input: path traversal, oversized strings, bad enum values.
    /// Never retried.
    #[error("validation error: {0}")]
    Validation(String),

    /// Missing credential or invalid circuit breaker configuration. Never
    /// retried.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A referenced agent, task, or context entry does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A model API call failed; see `ModelApiErrorKind` for the
    /// classification used by the health manager and router.
    #[error("model API error ({kind:?}): {message}")]
    ModelApi {
        kind: ModelApiErrorKind,
        message: String,
    },

    /// A guarded call was rejected by an open circuit breaker without
    /// invoking the guarded function.
    #[error("circuit breaker '{0}' is open")]
    CircuitOpen(String),

    /// Per-task wall-clock timeout exceeded.
    #[error("task '{0}' timed out after {1}ms")]
    TaskTimeout(String, u64),

    /// The decomposer's LLM output was unparseable or produced zero tasks.
    #[error("decomposition failed: {0}")]
    Decomposition(String),

    /// The DAG contains a cycle or references an unknown task id.
    #[error("DAG validation failed: {0}")]
    DagValidation(String),
}

/// Classification of a model API failure (spec §4.8 table).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelApiErrorKind {
    RateLimit,
    Timeout,
    ServerError,
    Unknown,
}

impl ModelApiErrorKind {
    /// Classify a vendor error message using the keyword table in spec §4.8.
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();
        if lower.contains("rate limit") || lower.contains("too many requests") || lower.contains("429")
        {
            ModelApiErrorKind::RateLimit
        } else if lower.contains("timeout") || lower.contains("timed out") || lower.contains("econnreset")
        {
            ModelApiErrorKind::Timeout
        } else if ["500", "502", "503", "504", "internal server error", "service unavailable"]
            .iter()
            .any(|needle| lower.contains(needle))
        {
            ModelApiErrorKind::ServerError
        } else {
            ModelApiErrorKind::Unknown
        }
    }

    /// Whether the default retry predicate should retry this kind (spec §4.4
    /// step 2: "retry on rate-limit, timeout, 5xx; don't retry on
    /// validation, auth, config").
    pub fn is_retryable_by_default(&self) -> bool {
        !matches!(self, ModelApiErrorKind::Unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_rate_limit() {
        assert_eq!(
            ModelApiErrorKind::classify("429 Too Many Requests, retry-after: 2"),
            ModelApiErrorKind::RateLimit
        );
    }

    #[test]
    fn classifies_timeout() {
        assert_eq!(
            ModelApiErrorKind::classify("upstream request timed out"),
            ModelApiErrorKind::Timeout
        );
        assert_eq!(
            ModelApiErrorKind::classify("ECONNRESET"),
            ModelApiErrorKind::Timeout
        );
    }

    #[test]
    fn classifies_server_error() {
        assert_eq!(
            ModelApiErrorKind::classify("503 Service Unavailable"),
            ModelApiErrorKind::ServerError
        );
    }

    #[test]
    fn classifies_unknown_and_non_retryable() {
        let kind = ModelApiErrorKind::classify("invalid api key");
        assert_eq!(kind, ModelApiErrorKind::Unknown);
        assert!(!kind.is_retryable_by_default());
        assert!(ModelApiErrorKind::RateLimit.is_retryable_by_default());
    }
}
