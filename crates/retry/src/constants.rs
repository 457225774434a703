// Constants for retry policies
use std::time::Duration;

/// Default total number of attempts, including the first
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default delay before the second attempt
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Default maximum delay cap
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

/// Default growth factor applied per attempt
pub const DEFAULT_EXPONENTIAL_BASE: f64 = 2.0;

/// Default jitter factor (0.0 = no jitter, 1.0 = up to ±100% of the delay)
pub const DEFAULT_JITTER_FACTOR: f64 = 0.1;

/// Minimum allowed max_attempts value
pub const MIN_MAX_ATTEMPTS: u32 = 1;
