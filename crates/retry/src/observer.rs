//! Retry observers and their isolated invocation
//!
//! An observer is told about every retry before the executor suspends:
//! the error that triggered it, the 1-based number of the attempt that
//! failed, and the delay about to be slept. Observers are best-effort. An
//! `Err` returned by an observer or a panic raised inside one is logged and
//! swallowed; the retry sequence continues as if the call had succeeded.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::error::BoxError;

/// Result returned by fallible observers
pub type ObserverResult = Result<(), BoxError>;

type ObserverFn<E> = dyn Fn(&E, u32, Duration) -> ObserverResult + Send + Sync;

/// Callback invoked before each retry
pub struct RetryObserver<E> {
    callback: Arc<ObserverFn<E>>,
}

impl<E> RetryObserver<E> {
    /// Wrap an infallible callback
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&E, u32, Duration) + Send + Sync + 'static,
    {
        Self::fallible(move |error, attempt, delay| {
            callback(error, attempt, delay);
            Ok(())
        })
    }

    /// Wrap a callback that may report its own failure
    pub fn fallible<F>(callback: F) -> Self
    where
        F: Fn(&E, u32, Duration) -> ObserverResult + Send + Sync + 'static,
    {
        Self { callback: Arc::new(callback) }
    }

    /// Invoke the callback without isolation
    pub fn call(&self, error: &E, attempt: u32, delay: Duration) -> ObserverResult {
        (self.callback)(error, attempt, delay)
    }
}

impl<E> Clone for RetryObserver<E> {
    fn clone(&self) -> Self {
        Self { callback: Arc::clone(&self.callback) }
    }
}

impl<E> fmt::Debug for RetryObserver<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RetryObserver(<function>)")
    }
}

/// Invoke `observer`, isolating the caller from its failures
///
/// Returns `true` when the observer completed normally.
pub fn notify<E>(observer: &RetryObserver<E>, error: &E, attempt: u32, delay: Duration) -> bool {
    let delay_ms = delay.as_millis() as u64;

    match panic::catch_unwind(AssertUnwindSafe(|| observer.call(error, attempt, delay))) {
        Ok(Ok(())) => true,
        Ok(Err(observer_error)) => {
            warn!(
                attempt,
                delay_ms,
                error = %observer_error,
                "Retry observer failed, continuing retry sequence"
            );
            false
        }
        Err(payload) => {
            warn!(
                attempt,
                delay_ms,
                panic = panic_message(payload.as_ref()),
                "Retry observer panicked, continuing retry sequence"
            );
            false
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "<non-string panic payload>"
    }
}
