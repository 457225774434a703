//! Retry executor: the attempt loop
//!
//! Each call to [`RetryExecutor::run`] is one independent run:
//!
//! 1. **Attempting**: invoke the operation. Success ends the run.
//! 2. **Evaluating**: a failure the policy does not classify as retryable
//!    ends the run with that raw error. A retryable failure on the last
//!    allowed attempt ends the run with the raw error or the wrapping
//!    "exhausted" error, as the policy says.
//! 3. **Retrying**: otherwise compute the backoff delay, notify the
//!    observer, sleep, and go back to 1 with the next attempt number.
//!
//! Runs share nothing but the immutable policy. The sleep is
//! `tokio::time::sleep`, so a waiting run holds no thread and no lock.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, instrument, warn};

use crate::error::{RetryError, RetryResult};
use crate::kind::ErrorClassification;
use crate::observer;
use crate::policy::RetryPolicy;

/// Result of a run together with summary statistics
///
/// Only the terminal result survives a run; intermediate errors are
/// logged and dropped.
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    pub result: RetryResult<T, E>,
    /// Attempts performed, including the first
    pub attempts: u32,
    /// Sum of the backoff delays slept
    pub total_delay: Duration,
}

impl<T, E> RetryOutcome<T, E> {
    /// Consume the outcome and return only the result.
    pub fn into_result(self) -> RetryResult<T, E> {
        self.result
    }

    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }

    /// Number of retries, i.e. attempts after the first
    pub fn retries(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }

    /// Get the average delay between attempts (excludes operation execution
    /// time).
    pub fn average_delay(&self) -> Duration {
        if self.attempts <= 1 {
            return Duration::ZERO;
        }
        self.total_delay / (self.attempts - 1)
    }
}

/// Runs operations under a [`RetryPolicy`]
pub struct RetryExecutor<E> {
    policy: Arc<RetryPolicy<E>>,
}

impl<E> Clone for RetryExecutor<E> {
    fn clone(&self) -> Self {
        Self { policy: Arc::clone(&self.policy) }
    }
}

impl<E> fmt::Debug for RetryExecutor<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryExecutor").field("policy", &self.policy).finish()
    }
}

impl<E> Default for RetryExecutor<E> {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

impl<E> RetryExecutor<E> {
    pub fn new(policy: RetryPolicy<E>) -> Self {
        Self { policy: Arc::new(policy) }
    }

    /// Create an executor sharing an already-allocated policy
    pub fn from_shared(policy: Arc<RetryPolicy<E>>) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy<E> {
        &self.policy
    }
}

impl<E> RetryExecutor<E>
where
    E: ErrorClassification + fmt::Display,
{
    /// Execute an operation with retry logic
    pub async fn run<F, Fut, T>(&self, operation: F) -> RetryResult<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.run_with_outcome(operation).await.into_result()
    }

    /// Execute an operation with retry logic and return outcome statistics.
    #[instrument(skip_all, fields(max_attempts = self.policy.max_attempts()))]
    pub async fn run_with_outcome<F, Fut, T>(&self, mut operation: F) -> RetryOutcome<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let policy = &*self.policy;
        let max_attempts = policy.max_attempts();
        let mut attempt = 1;
        let mut total_delay = Duration::ZERO;

        loop {
            debug!("Executing operation (attempt {}/{})", attempt, max_attempts);

            let error = match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("Operation succeeded after {} retries", attempt - 1);
                    }
                    return RetryOutcome { result: Ok(value), attempts: attempt, total_delay };
                }
                Err(error) => error,
            };

            if !policy.is_retryable(&error) {
                debug!(attempt, error = %error, "Error is not retryable");
                return RetryOutcome {
                    result: Err(RetryError::Operation(error)),
                    attempts: attempt,
                    total_delay,
                };
            }

            if attempt >= max_attempts {
                warn!(
                    attempts = attempt,
                    total_delay_ms = total_delay.as_millis() as u64,
                    error = %error,
                    "All retry attempts exhausted"
                );
                let failure = if policy.surface_original_error() {
                    RetryError::Operation(error)
                } else {
                    RetryError::exhausted(attempt, error)
                };
                return RetryOutcome { result: Err(failure), attempts: attempt, total_delay };
            }

            let delay = policy.delay_for(attempt);
            warn!(
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Operation failed, retrying after backoff"
            );

            if let Some(observer) = policy.on_retry() {
                observer::notify(observer, &error, attempt, delay);
            }
            drop(error);

            tokio::time::sleep(delay).await;
            total_delay += delay;
            attempt += 1;
        }
    }
}

/// Convenience function to run `operation` under `policy`
pub async fn retry<F, Fut, T, E>(policy: RetryPolicy<E>, operation: F) -> RetryResult<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: ErrorClassification + fmt::Display,
{
    RetryExecutor::new(policy).run(operation).await
}

/// Convenience function to retry with the default policy
pub async fn retry_with_defaults<F, Fut, T, E>(operation: F) -> RetryResult<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: ErrorClassification + fmt::Display,
{
    retry(RetryPolicy::default(), operation).await
}
