//! Retry policy configuration
//!
//! A [`RetryPolicy`] is an immutable value: build it once with
//! [`RetryPolicyBuilder`], hand it to an executor or a binding, and share it
//! freely between tasks. Construction validates every parameter, so a
//! policy that exists is a policy the executor can run.

use std::fmt;
use std::time::Duration;

use crate::backoff::Backoff;
use crate::binding::RetryBinding;
use crate::classify;
use crate::constants::{DEFAULT_MAX_ATTEMPTS, MIN_MAX_ATTEMPTS};
use crate::error::{PolicyError, PolicyResult};
use crate::executor::RetryExecutor;
use crate::kind::{ErrorClassification, ErrorKind};
use crate::observer::{ObserverResult, RetryObserver};

/// Configuration for retry behavior
pub struct RetryPolicy<E> {
    max_attempts: u32,
    backoff: Backoff,
    retryable_kinds: Vec<ErrorKind>,
    on_retry: Option<RetryObserver<E>>,
    surface_original_error: bool,
}

impl<E> Default for RetryPolicy<E> {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: Backoff::default(),
            retryable_kinds: Vec::new(),
            on_retry: None,
            surface_original_error: true,
        }
    }
}

impl<E> Clone for RetryPolicy<E> {
    fn clone(&self) -> Self {
        Self {
            max_attempts: self.max_attempts,
            backoff: self.backoff,
            retryable_kinds: self.retryable_kinds.clone(),
            on_retry: self.on_retry.clone(),
            surface_original_error: self.surface_original_error,
        }
    }
}

impl<E> fmt::Debug for RetryPolicy<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("backoff", &self.backoff)
            .field("retryable_kinds", &self.retryable_kinds)
            .field("on_retry", &self.on_retry.as_ref().map(|_| "<observer>"))
            .field("surface_original_error", &self.surface_original_error)
            .finish()
    }
}

impl<E> RetryPolicy<E> {
    /// Create a policy builder starting from the defaults
    pub fn builder() -> RetryPolicyBuilder<E> {
        RetryPolicyBuilder::new()
    }

    /// Total attempts including the first
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    /// Allow-list of retryable kinds; empty means every failure is retried
    pub fn retryable_kinds(&self) -> &[ErrorKind] {
        &self.retryable_kinds
    }

    pub fn on_retry(&self) -> Option<&RetryObserver<E>> {
        self.on_retry.as_ref()
    }

    /// Whether an exhausted run fails with the raw last error
    pub fn surface_original_error(&self) -> bool {
        self.surface_original_error
    }

    /// Check the policy invariants
    pub fn validate(&self) -> PolicyResult<()> {
        if self.max_attempts < MIN_MAX_ATTEMPTS {
            return Err(PolicyError::InvalidMaxAttempts {
                value: self.max_attempts,
                min: MIN_MAX_ATTEMPTS,
            });
        }

        self.backoff.validate()
    }

    /// Whether `error` is eligible for retry under this policy
    pub fn is_retryable(&self, error: &E) -> bool
    where
        E: ErrorClassification,
    {
        classify::is_retryable(error, &self.retryable_kinds)
    }

    /// Delay to wait after `attempt` failed
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff.delay_for(attempt)
    }

    /// Turn this policy into an executor
    pub fn into_executor(self) -> RetryExecutor<E> {
        RetryExecutor::new(self)
    }

    /// Bind `operation` so every call to it runs under this policy
    pub fn bind<F>(self, operation: F) -> RetryBinding<F, E> {
        RetryBinding::new(self, operation)
    }
}

/// Builder for [`RetryPolicy`] with fluent API
pub struct RetryPolicyBuilder<E> {
    policy: RetryPolicy<E>,
}

impl<E> Default for RetryPolicyBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for RetryPolicyBuilder<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicyBuilder").field("policy", &self.policy).finish()
    }
}

impl<E> RetryPolicyBuilder<E> {
    pub fn new() -> Self {
        Self { policy: RetryPolicy::default() }
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.policy.max_attempts = attempts;
        self
    }

    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.policy.backoff.base_delay = delay;
        self
    }

    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.policy.backoff.max_delay = delay;
        self
    }

    pub fn exponential_base(mut self, base: f64) -> Self {
        self.policy.backoff.exponential_base = base;
        self
    }

    pub fn jitter_factor(mut self, factor: f64) -> Self {
        self.policy.backoff.jitter_factor = factor;
        self
    }

    pub fn no_jitter(self) -> Self {
        self.jitter_factor(0.0)
    }

    /// Replace all backoff parameters at once
    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.policy.backoff = backoff;
        self
    }

    /// Add a kind to the allow-list
    pub fn retry_on(mut self, kind: ErrorKind) -> Self {
        if !self.policy.retryable_kinds.contains(&kind) {
            self.policy.retryable_kinds.push(kind);
        }
        self
    }

    /// Replace the allow-list; an empty list retries every failure
    pub fn retryable_kinds<I>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = ErrorKind>,
    {
        self.policy.retryable_kinds.clear();
        kinds.into_iter().fold(self, Self::retry_on)
    }

    /// Notify `callback` before each retry
    pub fn on_retry<F>(mut self, callback: F) -> Self
    where
        F: Fn(&E, u32, Duration) + Send + Sync + 'static,
    {
        self.policy.on_retry = Some(RetryObserver::new(callback));
        self
    }

    /// Notify a callback that may itself fail; its failures are logged only
    pub fn try_on_retry<F>(mut self, callback: F) -> Self
    where
        F: Fn(&E, u32, Duration) -> ObserverResult + Send + Sync + 'static,
    {
        self.policy.on_retry = Some(RetryObserver::fallible(callback));
        self
    }

    pub fn observer(mut self, observer: RetryObserver<E>) -> Self {
        self.policy.on_retry = Some(observer);
        self
    }

    /// Choose between the raw last error (`true`) and a wrapping
    /// "exhausted" error (`false`) when attempts run out
    pub fn surface_original_error(mut self, surface: bool) -> Self {
        self.policy.surface_original_error = surface;
        self
    }

    pub fn build(self) -> PolicyResult<RetryPolicy<E>> {
        self.policy.validate()?;
        Ok(self.policy)
    }
}
