//! Error types for retry execution and policy configuration
//!
//! A run produces at most one failure. [`RetryError::Operation`] carries the
//! operation's own error untouched: it is what callers see for non-retryable
//! failures and for exhausted runs when the policy surfaces original errors.
//! [`RetryError::Exhausted`] is the wrapping shape used when the policy asks
//! for it instead.

use std::time::Duration;

use thiserror::Error;

/// Boxed error used by fallible observers and type-erased operations
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Terminal failure of a retry run
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// The operation's own error, surfaced unmodified
    #[error(transparent)]
    Operation(E),

    /// All attempts were consumed and the policy wraps the last error
    #[error("Operation failed after {attempts} attempts: {message}")]
    Exhausted {
        attempts: u32,
        /// Display form of the last error
        message: String,
        #[source]
        source: E,
    },
}

impl<E> RetryError<E> {
    /// Wrap the last error of an exhausted run
    pub fn exhausted(attempts: u32, source: E) -> Self
    where
        E: std::fmt::Display,
    {
        Self::Exhausted { attempts, message: source.to_string(), source }
    }

    /// Whether this is the wrapping "retries exhausted" shape
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }

    /// Attempt count carried by the wrapping shape
    pub fn attempts(&self) -> Option<u32> {
        match self {
            Self::Operation(_) => None,
            Self::Exhausted { attempts, .. } => Some(*attempts),
        }
    }

    /// Borrow the underlying operation error
    pub fn inner(&self) -> &E {
        match self {
            Self::Operation(error) | Self::Exhausted { source: error, .. } => error,
        }
    }

    /// Consume the failure and return the underlying operation error
    pub fn into_inner(self) -> E {
        match self {
            Self::Operation(error) | Self::Exhausted { source: error, .. } => error,
        }
    }
}

/// Result type for retry runs
pub type RetryResult<T, E> = Result<T, RetryError<E>>;

/// Invalid retry policy or settings
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PolicyError {
    #[error("max_attempts must be at least {min}, got {value}")]
    InvalidMaxAttempts { value: u32, min: u32 },

    #[error("max_delay ({max_delay:?}) cannot be less than base_delay ({base_delay:?})")]
    InvalidDelayRange { base_delay: Duration, max_delay: Duration },

    #[error("exponential_base must be a finite number greater than 1, got {0}")]
    InvalidExponentialBase(f64),

    #[error("jitter_factor must be within [0, 1], got {0}")]
    InvalidJitterFactor(f64),

    #[error("Unknown error kind '{0}'")]
    UnknownErrorKind(String),

    #[error("Failed to parse retry settings ({format}): {message}")]
    Parse { format: &'static str, message: String },
}

/// Result type for policy construction
pub type PolicyResult<T> = Result<T, PolicyError>;
