//! Error types for the spectrum analyzer driver.
//!
//! Two layers are defined here:
//!
//! - **`DecodeError`**: failures of the pure trace codec. These are always
//!   permanent for the given input; retrying the decode cannot help, the trace
//!   has to be read again.
//! - **`OsaError`**: everything the driver can report, from a missing
//!   connection to an unexpected instrument reply. Decode failures convert
//!   into it with `?`.
//!
//! Neither layer ever carries a partially decoded trace.

use crate::trace::ScaleMode;
use std::time::Duration;
use thiserror::Error;

/// Convenience alias for driver results.
pub type OsaResult<T> = std::result::Result<T, OsaError>;

/// Failure while turning a raw trace payload into samples.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// The range descriptor is not `"start,stop,count"` with a positive whole count.
    #[error("Malformed range descriptor '{descriptor}': {reason}")]
    MalformedRange { descriptor: String, reason: String },

    /// The payload length disagrees with `count * record_width`.
    #[error("Truncated {mode} trace payload: expected {expected} bytes, got {actual}")]
    TruncatedPayload {
        expected: usize,
        actual: usize,
        mode: ScaleMode,
    },

    /// A linear record scales past the range of `f64`.
    #[error("Linear sample {index} overflows (exponent {exponent})")]
    NonFiniteSample { index: usize, exponent: i64 },

    /// The scale token names neither scale (strict policy only).
    #[error("Unsupported scale mode token '{0}'")]
    UnsupportedScaleMode(String),
}

impl DecodeError {
    pub(crate) fn malformed(descriptor: &str, reason: impl Into<String>) -> Self {
        DecodeError::MalformedRange {
            descriptor: descriptor.to_string(),
            reason: reason.into(),
        }
    }
}

/// Primary error type for driver operations.
#[derive(Error, Debug)]
pub enum OsaError {
    /// An operation was attempted before `connect` or after `disconnect`.
    #[error("Spectrum analyzer not connected")]
    NotConnected,

    /// A setter received a value outside its allowed set or range.
    ///
    /// Raised before anything is written to the instrument.
    #[error("Invalid value '{value}' for {property}: {reason}")]
    InvalidValue {
        property: &'static str,
        value: String,
        reason: String,
    },

    /// The instrument answered with something the driver cannot interpret.
    #[error("Unexpected response to '{command}': '{response}'")]
    UnexpectedResponse { command: String, response: String },

    /// No reply arrived within the link timeout.
    #[error("Timeout after {timeout:?} waiting for response to '{command}'")]
    Timeout { command: String, timeout: Duration },

    /// The transport cannot perform the requested operation.
    #[error("Operation not supported by transport: {0}")]
    Unsupported(&'static str),

    /// Serial link I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The binary trace could not be decoded.
    #[error("Trace decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Driver configuration is invalid.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl OsaError {
    /// Build an `InvalidValue` error.
    pub fn invalid(
        property: &'static str,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        OsaError::InvalidValue {
            property,
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// Build an `UnexpectedResponse` error.
    pub fn unexpected(command: impl Into<String>, response: impl Into<String>) -> Self {
        OsaError::UnexpectedResponse {
            command: command.into(),
            response: response.into(),
        }
    }

    /// Whether retrying the same operation could succeed.
    ///
    /// Link-level failures are transient; validation, decode and lifecycle
    /// errors are not.
    pub fn is_transient(&self) -> bool {
        matches!(self, OsaError::Timeout { .. } | OsaError::Io(_))
    }
}
