//! Fixtures for exercising retry behavior in tests
//!
//! - [`ScriptedOperation`]: an operation that fails from a script, then
//!   succeeds (or keeps failing)
//! - [`RecordingObserver`]: an observer that records every notification
//! - [`assert_error_contains!`](crate::assert_error_contains): assert on the
//!   display form of an error
//!
//! ```rust
//! # #[cfg(feature = "test-utils")]
//! # {
//! use resilient_retry::testing::{RecordingObserver, ScriptedOperation};
//! use resilient_retry::{RetryPolicy, TransientError};
//!
//! # async fn example() {
//! let operation = ScriptedOperation::failing_times(2, TransientError::network("refused"), 42);
//! let recorder = RecordingObserver::new();
//! let policy = RetryPolicy::builder().observer(recorder.observer()).build().unwrap();
//!
//! let value = resilient_retry::retry(policy, || operation.call()).await.unwrap();
//! assert_eq!(value, 42);
//! assert_eq!(recorder.attempts(), vec![1, 2]);
//! # }
//! # }
//! ```

use std::collections::VecDeque;
use std::future::{self, Ready};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::observer::RetryObserver;

/// Assert that a `Result` is an error whose display form contains a
/// substring
#[macro_export]
macro_rules! assert_error_contains {
    ($result:expr, $substring:expr $(,)?) => {
        match &$result {
            Ok(_) => panic!("Expected error but got Ok"),
            Err(e) => {
                let error_msg = format!("{}", e);
                assert!(
                    error_msg.contains($substring),
                    "Error message '{}' does not contain '{}'",
                    error_msg,
                    $substring
                );
            }
        }
    };
}

/// Assert that `actual` lies within `[min, max]`
#[track_caller]
pub fn assert_duration_in_range(actual: Duration, min: Duration, max: Duration) {
    assert!(
        actual >= min && actual <= max,
        "Duration {actual:?} is not within [{min:?}, {max:?}]"
    );
}

/// Operation returning scripted failures before a fallback result
pub struct ScriptedOperation<T, E> {
    script: Mutex<VecDeque<E>>,
    fallback: Result<T, E>,
    calls: AtomicU32,
}

impl<T: Clone, E: Clone> ScriptedOperation<T, E> {
    /// Fail with each error of `failures` in order, then succeed with `value`
    pub fn new<I>(failures: I, value: T) -> Self
    where
        I: IntoIterator<Item = E>,
    {
        Self {
            script: Mutex::new(failures.into_iter().collect()),
            fallback: Ok(value),
            calls: AtomicU32::new(0),
        }
    }

    /// Fail `times` times with `error`, then succeed with `value`
    pub fn failing_times(times: u32, error: E, value: T) -> Self {
        Self::new((0..times).map(|_| error.clone()), value)
    }

    /// Fail with `error` on every call
    pub fn always_failing(error: E) -> Self {
        Self { script: Mutex::new(VecDeque::new()), fallback: Err(error), calls: AtomicU32::new(0) }
    }

    /// Run one attempt
    pub fn call(&self) -> Ready<Result<T, E>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = match self.script.lock().pop_front() {
            Some(error) => Err(error),
            None => self.fallback.clone(),
        };
        future::ready(next)
    }

    /// Number of attempts made so far
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Scripted failures not yet returned
    pub fn remaining_failures(&self) -> usize {
        self.script.lock().len()
    }
}

/// Observer recording `(attempt, delay)` for every retry notification
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    records: Arc<Mutex<Vec<(u32, Duration)>>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// An observer feeding this recorder
    pub fn observer<E>(&self) -> RetryObserver<E> {
        let records = Arc::clone(&self.records);
        RetryObserver::new(move |_: &E, attempt, delay| records.lock().push((attempt, delay)))
    }

    pub fn records(&self) -> Vec<(u32, Duration)> {
        self.records.lock().clone()
    }

    pub fn attempts(&self) -> Vec<u32> {
        self.records.lock().iter().map(|(attempt, _)| *attempt).collect()
    }

    pub fn delays(&self) -> Vec<Duration> {
        self.records.lock().iter().map(|(_, delay)| *delay).collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}
