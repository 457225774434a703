//! Integration tests for the retry executor
//!
//! Exercises the public API end to end: backoff bounds, attempt budgets,
//! classification short-circuits, observer isolation and concurrent runs.
//! Every async test runs on a paused tokio clock so backoff sleeps are
//! virtual.

mod common;

use std::io;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::{deterministic_policy, init_tracing};
use futures::future::join_all;
use resilient_retry::testing::{assert_duration_in_range, RecordingObserver, ScriptedOperation};
use resilient_retry::{
    assert_error_contains, compute_delay, retry, Backoff, ErrorKind, RetryError, RetryExecutor,
    RetryPolicy, TransientError,
};
use tokio::time::Instant;

/// Validates that jitter-free delays never decrease and settle at the cap.
#[test]
fn test_backoff_monotonic_until_cap() {
    let backoff = Backoff {
        base_delay: Duration::from_millis(100),
        max_delay: Duration::from_millis(5_000),
        exponential_base: 2.0,
        jitter_factor: 0.0,
    };

    let delays: Vec<Duration> = (1..=20).map(|attempt| compute_delay(attempt, &backoff)).collect();

    for pair in delays.windows(2) {
        assert!(pair[1] >= pair[0], "delays must not decrease: {pair:?}");
    }
    let first_capped = delays
        .iter()
        .position(|delay| *delay == backoff.max_delay)
        .expect("delay reaches the cap");
    assert!(delays[first_capped..].iter().all(|delay| *delay == backoff.max_delay));
}

/// Validates that jittered delays never exceed `max_delay * (1 + jitter)`.
#[test]
fn test_jittered_delay_respects_cap() {
    for jitter_factor in [0.1, 0.5, 1.0] {
        let backoff = Backoff {
            base_delay: Duration::from_millis(1_000),
            max_delay: Duration::from_millis(30_000),
            exponential_base: 2.0,
            jitter_factor,
        };
        let ceiling = Duration::from_secs_f64(30.0 * (1.0 + jitter_factor));

        for attempt in 0..40 {
            for _ in 0..25 {
                let delay = compute_delay(attempt, &backoff);
                assert!(delay <= ceiling, "attempt {attempt}: {delay:?} exceeds {ceiling:?}");
            }
        }
    }
}

/// Validates the exact attempt budget for an always-failing operation.
///
/// Assertions:
/// - The operation runs exactly `max_attempts` times, for every budget
/// - The observer fires once per retry, never after the last attempt
#[tokio::test(start_paused = true)]
async fn test_attempt_budget_is_exact() {
    init_tracing();

    for max_attempts in 1..=5 {
        let operation = ScriptedOperation::<(), _>::always_failing(TransientError::network("down"));
        let recorder = RecordingObserver::new();
        let policy = RetryPolicy::builder()
            .max_attempts(max_attempts)
            .base_delay(Duration::from_millis(10))
            .observer(recorder.observer())
            .build()
            .expect("valid policy");

        let result = retry(policy, || operation.call()).await;

        assert!(result.is_err());
        assert_eq!(operation.calls(), max_attempts);
        assert_eq!(recorder.len() as u32, max_attempts - 1);
    }
}

/// Validates that a first-attempt success never sleeps or notifies.
#[tokio::test(start_paused = true)]
async fn test_first_attempt_success_short_circuits() {
    init_tracing();
    let operation = ScriptedOperation::<_, TransientError>::new([], "ready");
    let recorder = RecordingObserver::new();
    let policy = RetryPolicy::builder()
        .max_attempts(5)
        .observer(recorder.observer())
        .build()
        .expect("valid policy");
    let start = Instant::now();

    let outcome = RetryExecutor::new(policy).run_with_outcome(|| operation.call()).await;

    assert_eq!(outcome.result.expect("first attempt succeeds"), "ready");
    assert_eq!(outcome.attempts, 1);
    assert_eq!(outcome.total_delay, Duration::ZERO);
    assert_eq!(operation.calls(), 1);
    assert!(recorder.is_empty());
    assert_eq!(start.elapsed(), Duration::ZERO);
}

/// Validates that an error outside the allow-list surfaces immediately.
#[tokio::test(start_paused = true)]
async fn test_non_retryable_error_short_circuits() {
    init_tracing();
    let operation = ScriptedOperation::<(), _>::always_failing(TransientError::network("refused"));
    let recorder = RecordingObserver::new();
    let policy = RetryPolicy::builder()
        .max_attempts(5)
        .retry_on(ErrorKind::Timeout)
        .surface_original_error(false)
        .observer(recorder.observer())
        .build()
        .expect("valid policy");

    let result = retry(policy, || operation.call()).await;

    let error = result.expect_err("network errors are not retryable here");
    assert!(!error.is_exhausted(), "non-retryable failures are never wrapped");
    assert_eq!(error.into_inner(), TransientError::network("refused"));
    assert_eq!(operation.calls(), 1);
    assert!(recorder.is_empty());
}

/// Validates that observer failures never disturb the retry sequence.
///
/// Assertions:
/// - An observer that always returns `Err` is still called once per retry
/// - An observer that always panics is still called once per retry
/// - Both runs complete with the success value
#[tokio::test(start_paused = true)]
async fn test_observer_failures_are_isolated() {
    init_tracing();

    let failing_calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&failing_calls);
    let failing = RetryPolicy::builder()
        .max_attempts(3)
        .base_delay(Duration::from_millis(10))
        .try_on_retry(move |_: &TransientError, _, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Err("metrics sink unavailable".into())
        })
        .build()
        .expect("valid policy");
    let operation = ScriptedOperation::failing_times(2, TransientError::temporary("busy"), 7);

    assert_eq!(retry(failing, || operation.call()).await.expect("third attempt succeeds"), 7);
    assert_eq!(failing_calls.load(Ordering::SeqCst), 2);

    let panicking_calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&panicking_calls);
    let panicking = RetryPolicy::builder()
        .max_attempts(3)
        .base_delay(Duration::from_millis(10))
        .on_retry(move |_: &TransientError, _, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            panic!("observer bug");
        })
        .build()
        .expect("valid policy");
    let operation = ScriptedOperation::failing_times(2, TransientError::temporary("busy"), 7);

    assert_eq!(retry(panicking, || operation.call()).await.expect("third attempt succeeds"), 7);
    assert_eq!(panicking_calls.load(Ordering::SeqCst), 2);
}

/// Validates the reference scenario: two failures, then `42`, with delays
/// of exactly 1000ms and 2000ms.
#[tokio::test(start_paused = true)]
async fn test_fails_twice_then_returns_42() {
    init_tracing();
    let operation = ScriptedOperation::failing_times(2, TransientError::timeout("slow"), 42);
    let recorder = RecordingObserver::new();
    let policy = RetryPolicy::builder()
        .max_attempts(3)
        .base_delay(Duration::from_millis(1000))
        .max_delay(Duration::from_millis(30_000))
        .exponential_base(2.0)
        .jitter_factor(0.0)
        .observer(recorder.observer())
        .build()
        .expect("valid policy");
    let start = Instant::now();

    let value = retry(policy, || operation.call()).await.expect("third attempt succeeds");

    assert_eq!(value, 42);
    assert_eq!(operation.calls(), 3);
    assert_eq!(
        recorder.records(),
        vec![(1, Duration::from_millis(1000)), (2, Duration::from_millis(2000))]
    );
    assert_duration_in_range(
        start.elapsed(),
        Duration::from_millis(3000),
        Duration::from_millis(3010),
    );
}

/// Validates the wrapping failure: two attempts of `"boom"` with original
/// errors hidden.
#[tokio::test(start_paused = true)]
async fn test_exhausted_failure_names_attempts_and_cause() {
    init_tracing();
    let operation = ScriptedOperation::<(), _>::always_failing("boom".to_string());
    let policy = RetryPolicy::builder()
        .max_attempts(2)
        .base_delay(Duration::from_millis(10))
        .surface_original_error(false)
        .build()
        .expect("valid policy");

    let result = retry(policy, || operation.call()).await;

    assert_error_contains!(result, "2");
    assert_error_contains!(result, "boom");
    match result {
        Err(RetryError::Exhausted { attempts, source, .. }) => {
            assert_eq!(attempts, 2);
            assert_eq!(source, "boom");
        }
        other => panic!("expected an exhausted failure, got {other:?}"),
    }
    assert_eq!(operation.calls(), 2);
}

/// Validates that io errors are classified by their `io::ErrorKind`.
#[tokio::test(start_paused = true)]
async fn test_io_errors_follow_allow_list() {
    let calls = Arc::new(AtomicU32::new(0));
    let policy = || {
        RetryPolicy::builder()
            .max_attempts(3)
            .base_delay(Duration::from_millis(10))
            .retry_on(ErrorKind::Network)
            .build()
            .expect("valid policy")
    };

    let counter = Arc::clone(&calls);
    let refused = retry(policy(), || {
        counter.fetch_add(1, Ordering::SeqCst);
        async { Err::<(), _>(io::Error::from(io::ErrorKind::ConnectionRefused)) }
    })
    .await;
    assert!(refused.is_err());
    assert_eq!(calls.swap(0, Ordering::SeqCst), 3);

    let counter = Arc::clone(&calls);
    let missing = retry(policy(), || {
        counter.fetch_add(1, Ordering::SeqCst);
        async { Err::<(), _>(io::Error::from(io::ErrorKind::NotFound)) }
    })
    .await;
    assert!(missing.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

/// Validates that concurrent runs sharing one executor do not interfere.
///
/// Twenty runs each fail once and then succeed. Their backoff sleeps
/// overlap, so the whole batch takes one delay, not twenty.
#[tokio::test(start_paused = true)]
async fn test_concurrent_runs_share_executor() {
    init_tracing();
    let executor: RetryExecutor<TransientError> = deterministic_policy(3, 100).into_executor();
    let operations: Vec<_> = (0..20)
        .map(|id| ScriptedOperation::failing_times(1, TransientError::network("reset"), id))
        .collect();
    let start = Instant::now();

    let results =
        join_all(operations.iter().map(|operation| executor.run(|| operation.call()))).await;

    let values: Vec<u32> =
        results.into_iter().map(|result| result.expect("second attempt succeeds")).collect();
    assert_eq!(values, (0..20).collect::<Vec<_>>());
    assert!(operations.iter().all(|operation| operation.calls() == 2));
    assert_duration_in_range(
        start.elapsed(),
        Duration::from_millis(100),
        Duration::from_millis(110),
    );
}

/// Validates that runs can be moved onto spawned tasks.
#[tokio::test(start_paused = true)]
async fn test_runs_on_spawned_tasks() -> anyhow::Result<()> {
    init_tracing();
    let executor: RetryExecutor<TransientError> = deterministic_policy(4, 50).into_executor();

    let handles: Vec<_> = (0..4_u32)
        .map(|failures| {
            let executor = executor.clone();
            tokio::spawn(async move {
                let busy = TransientError::temporary("busy");
                let operation = ScriptedOperation::failing_times(failures, busy, failures);
                executor.run(|| operation.call()).await
            })
        })
        .collect();

    for (expected, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.await??, expected as u32);
    }
    Ok(())
}

/// Validates that dropping a run stops further attempts.
#[tokio::test(start_paused = true)]
async fn test_dropping_run_stops_attempts() {
    init_tracing();
    let executor: RetryExecutor<TransientError> = deterministic_policy(10, 1000).into_executor();
    let operation = ScriptedOperation::<(), _>::always_failing(TransientError::network("down"));

    let abandoned =
        tokio::time::timeout(Duration::from_millis(1500), executor.run(|| operation.call())).await;

    assert!(abandoned.is_err(), "the run is still sleeping when abandoned");
    assert_eq!(operation.calls(), 2);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(operation.calls(), 2);
}
