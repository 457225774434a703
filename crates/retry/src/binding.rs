//! Binding a retry policy to an operation
//!
//! A [`RetryBinding`] pairs an operation with an executor. Calling the
//! binding calls the operation under the policy while keeping the
//! operation's contract: the same argument value reaches every attempt,
//! whatever state the operation captured is used as-is, and the success
//! type is unchanged.
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use resilient_retry::{ErrorKind, RetryExt, RetryPolicy, TransientError};
//!
//! async fn fetch(region: String) -> Result<Vec<String>, TransientError> {
//!     Err(TransientError::timeout(format!("{region} did not answer")))
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let policy = RetryPolicy::builder()
//!     .max_attempts(3)
//!     .base_delay(Duration::from_millis(1000))
//!     .retryable_kinds([ErrorKind::Network, ErrorKind::Timeout])
//!     .build()?;
//!
//! let describe_regions = fetch.with_retry(policy);
//! let regions = describe_regions.call("cn-hangzhou".to_string()).await?;
//! # let _ = regions;
//! # Ok(())
//! # }
//! ```
//!
//! Methods of a service keep their call sites by routing their bodies
//! through a [`RetryExecutor`] owned by the service; the closure captures
//! `self`, so the retried code sees exactly the state a direct call would.

use std::fmt;
use std::future::Future;

use crate::error::RetryResult;
use crate::executor::{RetryExecutor, RetryOutcome};
use crate::kind::ErrorClassification;
use crate::policy::RetryPolicy;

/// An operation whose calls run under a retry policy
pub struct RetryBinding<F, E> {
    executor: RetryExecutor<E>,
    operation: F,
}

impl<F: Clone, E> Clone for RetryBinding<F, E> {
    fn clone(&self) -> Self {
        Self { executor: self.executor.clone(), operation: self.operation.clone() }
    }
}

impl<F, E> fmt::Debug for RetryBinding<F, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryBinding")
            .field("executor", &self.executor)
            .field("operation", &std::any::type_name::<F>())
            .finish()
    }
}

impl<F, E> RetryBinding<F, E> {
    pub fn new(policy: RetryPolicy<E>, operation: F) -> Self {
        Self::with_executor(RetryExecutor::new(policy), operation)
    }

    /// Bind using an existing executor, sharing its policy
    pub fn with_executor(executor: RetryExecutor<E>, operation: F) -> Self {
        Self { executor, operation }
    }

    pub fn policy(&self) -> &RetryPolicy<E> {
        self.executor.policy()
    }

    /// Remove the policy and get the bare operation back
    pub fn into_inner(self) -> F {
        self.operation
    }
}

impl<F, E> RetryBinding<F, E>
where
    E: ErrorClassification + fmt::Display,
{
    /// Call a zero-argument operation under the policy
    pub async fn invoke<Fut, T>(&self) -> RetryResult<T, E>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.executor.run(|| (self.operation)()).await
    }

    /// Call the operation with `args` under the policy
    ///
    /// Every attempt receives a clone of the same `args` value; nothing is
    /// rebuilt between attempts. Pass a tuple for several arguments.
    pub async fn call<A, Fut, T>(&self, args: A) -> RetryResult<T, E>
    where
        F: Fn(A) -> Fut,
        A: Clone,
        Fut: Future<Output = Result<T, E>>,
    {
        self.call_with_outcome(args).await.into_result()
    }

    /// Like [`call`](Self::call), also reporting attempts and total delay
    pub async fn call_with_outcome<A, Fut, T>(&self, args: A) -> RetryOutcome<T, E>
    where
        F: Fn(A) -> Fut,
        A: Clone,
        Fut: Future<Output = Result<T, E>>,
    {
        self.executor.run_with_outcome(|| (self.operation)(args.clone())).await
    }
}

/// Attach a retry policy to an operation
pub trait RetryExt<E>: Sized {
    fn with_retry(self, policy: RetryPolicy<E>) -> RetryBinding<Self, E> {
        RetryBinding::new(policy, self)
    }

    /// Attach an existing executor, sharing its policy with other bindings
    fn with_executor(self, executor: &RetryExecutor<E>) -> RetryBinding<Self, E> {
        RetryBinding::with_executor(executor.clone(), self)
    }
}

impl<F, E> RetryExt<E> for F {}
