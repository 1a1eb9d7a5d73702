//! Error types for homelink-core.
//!
//! Every failure in the engine resolves to one of five classes, each with a
//! fixed handling policy:
//!
//! | Error | Policy |
//! |-------|--------|
//! | [`Error::TransportUnavailable`] | Not retried; logged once per attempt; presentation layer keeps its last-known value |
//! | [`Error::ParseMismatch`] | Triggers transport fallback where configured; never fatal |
//! | [`Error::RemoteRejected`] | Classified and logged; not retried automatically except via fallback |
//! | [`Error::TransportFailure`] | Retried up to the configured budget, then falls back transport-to-transport, then surfaced |
//! | [`Error::ConfigurationIncomplete`] | Reported; the operation is skipped |
//!
//! Nothing here is process-fatal: every path ends in a logged message and an
//! unchanged-or-fault-marked presentation state.

use std::time::Duration;

use thiserror::Error;

use homelink_types::ParseError;

/// Errors that can occur while reconciling or pushing device state.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A transport exists in configuration but cannot currently be used
    /// (missing credentials, feature disabled, no adapter).
    #[error("transport unavailable: {0}")]
    TransportUnavailable(TransportUnavailableReason),

    /// A payload did not match the expected device family or wire format.
    #[error("payload mismatch: {0}")]
    ParseMismatch(#[from] ParseError),

    /// The remote service answered with a non-success status code.
    #[error("remote rejected request (code {code}): {message}")]
    RemoteRejected {
        /// The envelope status code.
        code: i64,
        /// Classified human-readable meaning.
        message: String,
    },

    /// A transport call failed with a connection or I/O level error.
    #[error("transport failure: {0}")]
    TransportFailure(TransportFailureReason),

    /// An operation requires configuration the device does not have.
    #[error("configuration incomplete: {0}")]
    ConfigurationIncomplete(String),

    /// A transport call exceeded its time bound.
    #[error("operation '{operation}' timed out after {duration:?}")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// The timeout duration.
        duration: Duration,
    },

    /// Invalid engine configuration (not device configuration).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Structured reasons a transport is unavailable.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new reasons
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransportUnavailableReason {
    /// No radio transport is attached to this device.
    RadioMissing,
    /// No cloud transport is attached to this device.
    CloudMissing,
    /// A cloud transport is attached but has no credentials.
    CloudUnauthenticated,
    /// No transport in the device's configured set can currently be used.
    NoUsableTransport,
}

impl std::fmt::Display for TransportUnavailableReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RadioMissing => write!(f, "no radio transport attached"),
            Self::CloudMissing => write!(f, "no cloud transport attached"),
            Self::CloudUnauthenticated => write!(f, "cloud transport has no credentials"),
            Self::NoUsableTransport => write!(f, "no usable transport for this device"),
        }
    }
}

/// Structured reasons for transport-level failures.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new reasons
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransportFailureReason {
    /// Radio connection could not be established.
    ConnectionFailed(String),
    /// The device was not found during discovery.
    DeviceNotFound(String),
    /// A radio command write failed.
    CommandFailed(String),
    /// An HTTP request failed below the status-code level.
    Http(String),
    /// Generic radio stack error.
    Radio(String),
}

impl std::fmt::Display for TransportFailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConnectionFailed(msg) => write!(f, "connection failed: {msg}"),
            Self::DeviceNotFound(id) => write!(f, "device '{id}' not found"),
            Self::CommandFailed(msg) => write!(f, "command failed: {msg}"),
            Self::Http(msg) => write!(f, "HTTP error: {msg}"),
            Self::Radio(msg) => write!(f, "radio error: {msg}"),
        }
    }
}

impl Error {
    /// Create a device-not-found transport failure.
    pub fn device_not_found(identifier: impl Into<String>) -> Self {
        Self::TransportFailure(TransportFailureReason::DeviceNotFound(identifier.into()))
    }

    /// Create a timeout error with operation context.
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a configuration-incomplete error.
    pub fn configuration_incomplete(message: impl Into<String>) -> Self {
        Self::ConfigurationIncomplete(message.into())
    }

    /// Create an invalid engine configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Create a remote-rejected error from a classified status code.
    pub fn remote_rejected(code: i64, message: impl Into<String>) -> Self {
        Self::RemoteRejected {
            code,
            message: message.into(),
        }
    }

    /// Whether this error may succeed on a plain retry of the same transport.
    ///
    /// Only connection/I/O level failures and timeouts qualify; parse,
    /// classification and configuration errors will fail the same way again.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::TransportFailure(_) | Error::Timeout { .. })
    }

    /// Whether this error should trigger transport-to-transport fallback
    /// (when the device is configured for it): the preferred transport could
    /// not produce a usable answer, but another transport might.
    #[must_use]
    pub fn triggers_fallback(&self) -> bool {
        matches!(
            self,
            Error::ParseMismatch(_) | Error::TransportFailure(_) | Error::Timeout { .. }
        )
    }
}

impl From<btleplug::Error> for Error {
    fn from(err: btleplug::Error) -> Self {
        Error::TransportFailure(TransportFailureReason::Radio(err.to_string()))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::TransportFailure(TransportFailureReason::Http(err.to_string()))
    }
}

/// Result type alias using homelink-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;
