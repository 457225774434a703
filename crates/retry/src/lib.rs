//! Resilient retry execution for async operations.
//!
//! Wraps a fallible async operation so transient failures are retried with
//! exponential backoff and symmetric jitter, while permanent failures
//! surface immediately.
//!
//! - **[`backoff`]**: delay computation for a given attempt
//! - **[`classify`]** and **[`kind`]**: error-kind taxonomy and allow-list
//!   classification
//! - **[`observer`]**: best-effort retry notifications
//! - **[`executor`]**: the attempt/classify/wait loop
//! - **[`binding`]**: attaching a policy to an operation so every call runs
//!   under it
//! - **[`settings`]** (feature `serde`): loading policies from TOML or JSON
//! - **[`testing`]** (feature `test-utils`): fixtures for downstream tests
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use resilient_retry::{retry, ErrorKind, RetryPolicy, TransientError};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let policy = RetryPolicy::builder()
//!     .max_attempts(3)
//!     .base_delay(Duration::from_millis(1000))
//!     .retry_on(ErrorKind::Network)
//!     .retry_on(ErrorKind::Timeout)
//!     .on_retry(|error: &TransientError, attempt, delay| {
//!         eprintln!("attempt {attempt} failed ({error}), retrying in {delay:?}");
//!     })
//!     .build()?;
//!
//! let body = retry(policy, || async {
//!     Err::<String, _>(TransientError::network("connection refused"))
//! })
//! .await?;
//! # let _ = body;
//! # Ok(())
//! # }
//! ```
//!
//! Runs are independent: a policy or executor may be shared by any number of
//! concurrent runs and holds no per-run state.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod backoff;
pub mod binding;
pub mod classify;
pub mod constants;
pub mod error;
pub mod executor;
pub mod kind;
pub mod observer;
pub mod policy;
#[cfg(feature = "serde")]
pub mod settings;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// Re-export commonly used items
pub use backoff::{compute_delay, compute_delay_with_sample, Backoff};
pub use binding::{RetryBinding, RetryExt};
pub use classify::is_retryable;
pub use error::{BoxError, PolicyError, PolicyResult, RetryError, RetryResult};
pub use executor::{retry, retry_with_defaults, RetryExecutor, RetryOutcome};
pub use kind::{ErrorClassification, ErrorKind, TransientError};
pub use observer::{notify, ObserverResult, RetryObserver};
pub use policy::{RetryPolicy, RetryPolicyBuilder};
#[cfg(feature = "serde")]
pub use settings::RetrySettings;
