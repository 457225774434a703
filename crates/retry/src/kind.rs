//! Error-kind taxonomy consumed by the retry classifier
//!
//! The engine never inspects error messages. An error takes part in
//! allow-list classification by implementing [`ErrorClassification`] and
//! reporting at most one [`ErrorKind`]. Kinds form a small hierarchy:
//! [`ErrorKind::Container`] and [`ErrorKind::DeviceBridge`] are refinements
//! of [`ErrorKind::ExternalProcess`], so allowing the parent also allows
//! them. Consumer-defined categories use [`ErrorKind::Custom`] and need no
//! change to the engine.

use std::fmt;
use std::io;
use std::str::FromStr;

use thiserror::Error;

use crate::error::{BoxError, PolicyError};

/// Category of a transient failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Connection refused, reset, aborted or otherwise unreachable peer
    Network,
    /// Operation deadline elapsed
    Timeout,
    /// Generic temporary failure
    Temporary,
    /// A spawned process or external tool failed
    ExternalProcess,
    /// Container runtime failure (refines `ExternalProcess`)
    Container,
    /// Device bridge failure, e.g. a dropped ADB session (refines
    /// `ExternalProcess`)
    DeviceBridge,
    /// Storage backend temporarily unable to serve the request
    StorageTemporary,
    /// Upstream service unavailable
    ServiceUnavailable,
    /// Request rejected by rate limiting
    RateLimited,
    /// Consumer-defined category, compared by identity of the name
    Custom(&'static str),
}

impl ErrorKind {
    /// Built-in kinds, in declaration order
    pub const BUILTIN: [ErrorKind; 9] = [
        ErrorKind::Network,
        ErrorKind::Timeout,
        ErrorKind::Temporary,
        ErrorKind::ExternalProcess,
        ErrorKind::Container,
        ErrorKind::DeviceBridge,
        ErrorKind::StorageTemporary,
        ErrorKind::ServiceUnavailable,
        ErrorKind::RateLimited,
    ];

    /// Stable snake_case name used in logs and settings files
    pub const fn name(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Timeout => "timeout",
            Self::Temporary => "temporary",
            Self::ExternalProcess => "external_process",
            Self::Container => "container",
            Self::DeviceBridge => "device_bridge",
            Self::StorageTemporary => "storage_temporary",
            Self::ServiceUnavailable => "service_unavailable",
            Self::RateLimited => "rate_limited",
            Self::Custom(name) => name,
        }
    }

    /// The broader kind this one refines, if any
    pub const fn parent(self) -> Option<ErrorKind> {
        match self {
            Self::Container | Self::DeviceBridge => Some(Self::ExternalProcess),
            _ => None,
        }
    }

    /// Whether `self` is `other` or a refinement of it
    pub fn is_a(self, other: ErrorKind) -> bool {
        let mut current = Some(self);
        while let Some(kind) = current {
            if kind == other {
                return true;
            }
            current = kind.parent();
        }
        false
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ErrorKind {
    type Err = PolicyError;

    /// Parse a built-in kind name. Custom kinds cannot be parsed because
    /// their names are only known to the code that defines them.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::BUILTIN
            .into_iter()
            .find(|kind| kind.name() == normalized)
            .ok_or_else(|| PolicyError::UnknownErrorKind(s.to_string()))
    }
}

/// Capability for reporting the kind of an error
///
/// The default implementation reports no kind, which is enough for errors
/// only ever used with open (empty allow-list) policies.
pub trait ErrorClassification {
    /// The kind of this error, or `None` if it cannot be determined
    fn error_kind(&self) -> Option<ErrorKind> {
        None
    }
}

impl<T: ErrorClassification + ?Sized> ErrorClassification for &T {
    fn error_kind(&self) -> Option<ErrorKind> {
        (**self).error_kind()
    }
}

impl ErrorClassification for str {}

impl ErrorClassification for String {}

impl ErrorClassification for io::Error {
    fn error_kind(&self) -> Option<ErrorKind> {
        if let Some(kind) = self
            .get_ref()
            .and_then(|inner| inner.downcast_ref::<TransientError>())
            .map(TransientError::kind)
        {
            return Some(kind);
        }

        match self.kind() {
            io::ErrorKind::TimedOut => Some(ErrorKind::Timeout),
            io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::AddrNotAvailable => Some(ErrorKind::Network),
            io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock => Some(ErrorKind::Temporary),
            _ => None,
        }
    }
}

impl ErrorClassification for BoxError {
    fn error_kind(&self) -> Option<ErrorKind> {
        if let Some(error) = self.downcast_ref::<TransientError>() {
            return Some(error.kind());
        }
        self.downcast_ref::<io::Error>().and_then(ErrorClassification::error_kind)
    }
}

/// Ready-made error tagged with an [`ErrorKind`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} error: {message}")]
pub struct TransientError {
    kind: ErrorKind,
    message: String,
}

impl TransientError {
    pub fn new<S: Into<String>>(kind: ErrorKind, message: S) -> Self {
        Self { kind, message: message.into() }
    }

    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorKind::Network, message)
    }

    pub fn timeout<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    pub fn temporary<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorKind::Temporary, message)
    }

    pub fn container<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorKind::Container, message)
    }

    pub fn device_bridge<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorKind::DeviceBridge, message)
    }

    pub fn storage_temporary<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorKind::StorageTemporary, message)
    }

    pub fn service_unavailable<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorKind::ServiceUnavailable, message)
    }

    pub fn rate_limited<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorKind::RateLimited, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl ErrorClassification for TransientError {
    fn error_kind(&self) -> Option<ErrorKind> {
        Some(self.kind)
    }
}
