//! Exponential backoff with symmetric jitter
//!
//! For attempt `n` (1-based, the attempt that just failed):
//!
//! ```text
//! exponential = base_delay * exponential_base^(n - 1)
//! capped      = min(exponential, max_delay)
//! jitter      = capped * jitter_factor * U(-1, +1)
//! delay       = round(capped + jitter), clamped to >= 0
//! ```
//!
//! The result always lies in `[0, max_delay * (1 + jitter_factor)]` and,
//! without jitter, never decreases as `n` grows.

use std::time::Duration;

use rand::Rng;

use crate::constants::{
    DEFAULT_BASE_DELAY, DEFAULT_EXPONENTIAL_BASE, DEFAULT_JITTER_FACTOR, DEFAULT_MAX_DELAY,
};
use crate::error::{PolicyError, PolicyResult};

/// Backoff parameters of a retry policy
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Backoff {
    /// Delay before the second attempt
    #[cfg_attr(
        feature = "serde",
        serde(rename = "base_delay_ms", with = "crate::settings::duration_millis")
    )]
    pub base_delay: Duration,
    /// Upper bound on the computed (pre-jitter) delay
    #[cfg_attr(
        feature = "serde",
        serde(rename = "max_delay_ms", with = "crate::settings::duration_millis")
    )]
    pub max_delay: Duration,
    /// Growth factor per attempt, greater than 1
    pub exponential_base: f64,
    /// Fraction of the capped delay randomized, within `[0, 1]`
    pub jitter_factor: f64,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            exponential_base: DEFAULT_EXPONENTIAL_BASE,
            jitter_factor: DEFAULT_JITTER_FACTOR,
        }
    }
}

impl Backoff {
    /// Check every parameter against its allowed range
    pub fn validate(&self) -> PolicyResult<()> {
        if self.max_delay < self.base_delay {
            return Err(PolicyError::InvalidDelayRange {
                base_delay: self.base_delay,
                max_delay: self.max_delay,
            });
        }

        if !self.exponential_base.is_finite() || self.exponential_base <= 1.0 {
            return Err(PolicyError::InvalidExponentialBase(self.exponential_base));
        }

        if !(0.0..=1.0).contains(&self.jitter_factor) {
            return Err(PolicyError::InvalidJitterFactor(self.jitter_factor));
        }

        Ok(())
    }

    /// Delay to wait after `attempt` failed, with a fresh random jitter draw
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if self.jitter_factor == 0.0 {
            return self.delay_with_sample(attempt, 0.0);
        }

        let sample = rand::thread_rng().gen_range(-1.0..=1.0);
        self.delay_with_sample(attempt, sample)
    }

    /// Delay for `attempt` using an explicit jitter draw in `[-1, 1]`
    ///
    /// Out-of-range samples are clamped. Attempt 0 is treated as attempt 1.
    pub fn delay_with_sample(&self, attempt: u32, sample: f64) -> Duration {
        let capped = self.capped_millis(attempt);
        if capped <= 0.0 {
            return Duration::ZERO;
        }

        let sample = if sample.is_nan() { 0.0 } else { sample.clamp(-1.0, 1.0) };
        let jitter = capped * self.jitter_factor * sample;
        let upper = (millis(self.max_delay) * (1.0 + self.jitter_factor)).floor();
        let delay = (capped + jitter).round().clamp(0.0, upper);

        Duration::from_millis(delay as u64)
    }

    /// Exponential delay capped at `max_delay`, before jitter, in milliseconds
    fn capped_millis(&self, attempt: u32) -> f64 {
        let base = millis(self.base_delay);
        if base <= 0.0 {
            return 0.0;
        }

        let exponent = f64::from(attempt.max(1) - 1);
        let exponential = base * self.exponential_base.powf(exponent);
        exponential.min(millis(self.max_delay))
    }
}

/// Compute the delay to wait after `attempt` failed
pub fn compute_delay(attempt: u32, backoff: &Backoff) -> Duration {
    backoff.delay_for(attempt)
}

/// [`compute_delay`] with the jitter draw supplied by the caller
pub fn compute_delay_with_sample(attempt: u32, backoff: &Backoff, sample: f64) -> Duration {
    backoff.delay_with_sample(attempt, sample)
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}
