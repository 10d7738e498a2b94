//! Generic retry with a classified error predicate and exponential backoff
//! (spec §2 "Retry Strategy" component).

use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Whether a given attempt's error should be retried, and how the caller's
/// error type maps onto that decision.
pub trait RetryClassifier<E> {
    /// `true` if another attempt should be made for this error.
    fn should_retry(&self, error: &E) -> bool;
}

/// A classifier built from a plain closure, for ad-hoc use.
impl<E, F: Fn(&E) -> bool> RetryClassifier<E> for F {
    fn should_retry(&self, error: &E) -> bool {
        self(error)
    }
}

/// Configuration for one retry run.
#[derive(Debug, Clone, Copy)]
pub struct RetryStrategy {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Base delay for exponential backoff between attempts.
    pub base_delay: Duration,
    /// Upper bound on the computed backoff delay.
    pub max_delay: Duration,
}

impl Default for RetryStrategy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(10),
        }
    }
}

/// Outcome of a retried operation.
#[derive(Debug, Clone)]
pub enum RetryOutcome<T, E> {
    Success { value: T, attempts: u32 },
    Failure { error: E, attempts: u32 },
}

impl RetryStrategy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    fn backoff_for(&self, attempt: u32) -> Duration {
        let scaled = self.base_delay.saturating_mul(1u32 << attempt.min(16));
        scaled.min(self.max_delay)
    }

    /// Run `operation` up to `max_attempts` times, sleeping with exponential
    /// backoff between attempts for which `classifier` says to retry.
    /// Never returns `Err` — failures become `RetryOutcome::Failure` so
    /// callers can build an `ExecutionResult` directly (spec §9: "Use
    /// explicit result types at the executor boundary").
    pub async fn run<T, E, Fut, Op, C>(&self, classifier: &C, mut operation: Op) -> RetryOutcome<T, E>
    where
        Op: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: RetryClassifier<E>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match operation(attempt).await {
                Ok(value) => return RetryOutcome::Success { value, attempts: attempt },
                Err(error) => {
                    let retryable = classifier.should_retry(&error);
                    if !retryable || attempt >= self.max_attempts {
                        return RetryOutcome::Failure {
                            error,
                            attempts: attempt,
                        };
                    }
                    let delay = self.backoff_for(attempt);
                    debug!(attempt, delay_ms = delay.as_millis() as u64, "retrying after backoff");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
