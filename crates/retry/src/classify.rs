//! Retry eligibility of a failed attempt

use crate::kind::{ErrorClassification, ErrorKind};

/// Decide whether `error` may be retried under `retryable_kinds`
///
/// An empty allow-list retries everything. Otherwise the error's kind must
/// be one of the listed kinds or a refinement of one; errors whose kind
/// cannot be determined are not retried.
pub fn is_retryable<E>(error: &E, retryable_kinds: &[ErrorKind]) -> bool
where
    E: ErrorClassification + ?Sized,
{
    if retryable_kinds.is_empty() {
        return true;
    }

    match error.error_kind() {
        Some(kind) => retryable_kinds.iter().any(|allowed| kind.is_a(*allowed)),
        None => false,
    }
}
