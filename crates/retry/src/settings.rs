//! Plain-data retry settings
//!
//! [`RetrySettings`] is the serializable face of a [`RetryPolicy`]: it holds
//! every knob except the observer, which is code and cannot come from a
//! file. Delays are expressed in milliseconds and error kinds by their
//! snake_case names.
//!
//! ```toml
//! max_attempts = 5
//! base_delay_ms = 250
//! max_delay_ms = 10000
//! retryable_kinds = ["network", "timeout"]
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::backoff::Backoff;
use crate::constants::{
    DEFAULT_BASE_DELAY, DEFAULT_EXPONENTIAL_BASE, DEFAULT_JITTER_FACTOR, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_MAX_DELAY,
};
use crate::error::{PolicyError, PolicyResult};
use crate::kind::ErrorKind;
use crate::policy::{RetryPolicy, RetryPolicyBuilder};

/// Serialize a `Duration` as whole milliseconds
pub mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    type SerializeResult<S> = Result<<S as Serializer>::Ok, <S as Serializer>::Error>;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> SerializeResult<S>
    where
        S: Serializer,
    {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Retry configuration as loaded from TOML or JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySettings {
    pub max_attempts: u32,
    #[serde(rename = "base_delay_ms", with = "duration_millis")]
    pub base_delay: Duration,
    #[serde(rename = "max_delay_ms", with = "duration_millis")]
    pub max_delay: Duration,
    pub exponential_base: f64,
    pub jitter_factor: f64,
    /// Kind names; empty retries every failure
    pub retryable_kinds: Vec<String>,
    pub surface_original_error: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            exponential_base: DEFAULT_EXPONENTIAL_BASE,
            jitter_factor: DEFAULT_JITTER_FACTOR,
            retryable_kinds: Vec::new(),
            surface_original_error: true,
        }
    }
}

impl RetrySettings {
    pub fn from_toml_str(input: &str) -> PolicyResult<Self> {
        toml::from_str(input)
            .map_err(|e| PolicyError::Parse { format: "toml", message: e.to_string() })
    }

    pub fn from_json_str(input: &str) -> PolicyResult<Self> {
        serde_json::from_str(input)
            .map_err(|e| PolicyError::Parse { format: "json", message: e.to_string() })
    }

    pub fn to_toml_string(&self) -> PolicyResult<String> {
        toml::to_string(self)
            .map_err(|e| PolicyError::Parse { format: "toml", message: e.to_string() })
    }

    /// Capture the data portion of an existing policy
    pub fn from_policy<E>(policy: &RetryPolicy<E>) -> Self {
        let backoff = policy.backoff();
        Self {
            max_attempts: policy.max_attempts(),
            base_delay: backoff.base_delay,
            max_delay: backoff.max_delay,
            exponential_base: backoff.exponential_base,
            jitter_factor: backoff.jitter_factor,
            retryable_kinds: policy.retryable_kinds().iter().map(ToString::to_string).collect(),
            surface_original_error: policy.surface_original_error(),
        }
    }

    /// Resolve the kind names, rejecting any that are not built in
    pub fn kinds(&self) -> PolicyResult<Vec<ErrorKind>> {
        self.retryable_kinds.iter().map(|name| name.parse()).collect()
    }

    /// Start a builder from these settings so an observer can be attached
    pub fn into_builder<E>(self) -> PolicyResult<RetryPolicyBuilder<E>> {
        let kinds = self.kinds()?;
        Ok(RetryPolicy::builder()
            .max_attempts(self.max_attempts)
            .backoff(Backoff {
                base_delay: self.base_delay,
                max_delay: self.max_delay,
                exponential_base: self.exponential_base,
                jitter_factor: self.jitter_factor,
            })
            .retryable_kinds(kinds)
            .surface_original_error(self.surface_original_error))
    }

    pub fn into_policy<E>(self) -> PolicyResult<RetryPolicy<E>> {
        self.into_builder()?.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_yields_defaults() {
        let settings = RetrySettings::from_toml_str("").expect("empty TOML is valid");
        assert_eq!(settings, RetrySettings::default());

        let settings = RetrySettings::from_json_str("{}").expect("empty object is valid");
        assert_eq!(settings, RetrySettings::default());
    }

    #[test]
    fn test_kind_names_resolve() {
        let settings = RetrySettings {
            retryable_kinds: vec!["network".into(), "Device-Bridge".into()],
            ..RetrySettings::default()
        };

        assert_eq!(
            settings.kinds().expect("known kinds"),
            vec![ErrorKind::Network, ErrorKind::DeviceBridge]
        );
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let settings = RetrySettings {
            retryable_kinds: vec!["network".into(), "cosmic_ray".into()],
            ..RetrySettings::default()
        };

        assert_eq!(
            settings.into_policy::<String>().map(|_| ()),
            Err(PolicyError::UnknownErrorKind("cosmic_ray".into()))
        );
    }

    #[test]
    fn test_invalid_values_fail_policy_validation() {
        let settings = RetrySettings { max_attempts: 0, ..RetrySettings::default() };

        assert!(matches!(
            settings.into_policy::<String>(),
            Err(PolicyError::InvalidMaxAttempts { value: 0, .. })
        ));
    }

    #[test]
    fn test_backoff_serializes_delays_as_millis() {
        let json = serde_json::to_string(&Backoff::default()).expect("serializable");

        assert!(json.contains("\"base_delay_ms\":1000"), "got {json}");
        assert!(json.contains("\"max_delay_ms\":30000"), "got {json}");
    }

    #[test]
    fn test_from_policy_captures_data() {
        let policy = RetryPolicy::<String>::builder()
            .max_attempts(4)
            .base_delay(Duration::from_millis(50))
            .retry_on(ErrorKind::ServiceUnavailable)
            .surface_original_error(false)
            .build()
            .expect("valid policy");

        let settings = RetrySettings::from_policy(&policy);

        assert_eq!(settings.max_attempts, 4);
        assert_eq!(settings.base_delay, Duration::from_millis(50));
        assert_eq!(settings.retryable_kinds, vec!["service_unavailable".to_string()]);
        assert!(!settings.surface_original_error);
    }
}
