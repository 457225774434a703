//! Shared helpers for retry integration tests

#![allow(dead_code)]

use std::time::Duration;

use resilient_retry::RetryPolicy;
use tracing_subscriber::EnvFilter;

/// Install a test-writer subscriber once per test binary
///
/// Honors `RUST_LOG`; defaults to debug output for this crate.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("resilient_retry=debug"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_test_writer().try_init();
}

/// Jitter-free policy with the given budget and base delay
pub fn deterministic_policy<E>(max_attempts: u32, base_delay_ms: u64) -> RetryPolicy<E> {
    RetryPolicy::builder()
        .max_attempts(max_attempts)
        .base_delay(Duration::from_millis(base_delay_ms))
        .no_jitter()
        .build()
        .expect("deterministic policy is valid")
}
