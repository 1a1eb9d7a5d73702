//! Parse errors shared by all transports.

use thiserror::Error;

/// Errors produced while parsing a transport payload.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// The model tag embedded in the payload does not match the expected
    /// device family. The device must be treated as unreachable via that
    /// transport for this attempt.
    #[error("model tag 0x{found:02X} does not match expected family {expected}")]
    ModelMismatch {
        /// Model tag found in the payload.
        found: u8,
        /// The family the caller expected.
        expected: &'static str,
    },

    /// The payload does not carry a known model tag at all.
    #[error("unknown model tag: 0x{0:02X}")]
    UnknownModelTag(u8),

    /// The payload is shorter than the family's wire format requires.
    #[error("payload truncated: expected at least {expected} bytes, got {actual}")]
    Truncated {
        /// Minimum length for the family's format.
        expected: usize,
        /// Actual payload length.
        actual: usize,
    },

    /// A JSON body is missing a field the family's format requires.
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// A field was present but carried a value outside its format.
    #[error("invalid value: {0}")]
    InvalidValue(String),
}

impl ParseError {
    /// Create an invalid-value error.
    pub fn invalid_value(message: impl Into<String>) -> Self {
        Self::InvalidValue(message.into())
    }
}
