//! Hand Driver Error Types
//!
//! Three failure families surface to callers:
//! - [`ValidationError`]: rejected before any I/O
//! - [`TransportError`]: serial link problems
//! - [`FrameError`]: corrupted or unexpected responses
//!
//! [`HandError`] wraps all of them for the driver API.

use std::time::Duration;

use thiserror::Error;

use crate::registers::Quantity;

/// Result type for inspire-hand operations
pub type Result<T> = std::result::Result<T, HandError>;

/// Input rejected before encoding
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Finger id {0} out of range (expected 0-5)")]
    FingerOutOfRange(u8),

    #[error("Operation requires a single finger, got ALL")]
    AllFingersNotAllowed,

    #[error("Value {value} out of range (expected 0-{max})")]
    ValueOutOfRange { value: u16, max: u16 },

    #[error("{0} is read-only")]
    ReadOnly(Quantity),

    #[error("Unknown finger name: {0}")]
    UnknownFinger(String),
}

/// Serial link errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Not connected")]
    NotConnected,

    #[error("No response within {0:?}")]
    NoResponse(Duration),

    #[error("Failed to open serial port {device}: {reason}")]
    Open { device: String, reason: String },

    #[error("IO error: {0}")]
    Io(String),

    #[error("Serial connection closed")]
    Closed,

    #[error("Response exceeds buffer size ({0} bytes)")]
    Overflow(usize),
}

impl TransportError {
    /// Whether the transport dropped its port as a consequence of this error
    pub fn closes_session(&self) -> bool {
        matches!(
            self,
            TransportError::Io(_) | TransportError::Closed | TransportError::Overflow(_)
        )
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        TransportError::Io(err.to_string())
    }
}

/// Frame encoding/decoding errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("Invalid register range: {0}")]
    InvalidRange(String),

    #[error("Frame too short: {len} bytes (min {min})")]
    ShortFrame { len: usize, min: usize },

    #[error("Slave id mismatch: expected {expected}, got {actual}")]
    SlaveMismatch { expected: u8, actual: u8 },

    #[error("Function code mismatch: expected 0x{expected:02X}, got 0x{actual:02X}")]
    FunctionMismatch { expected: u8, actual: u8 },

    #[error("CRC mismatch: expected 0x{expected:04X}, got 0x{actual:04X}")]
    CrcMismatch { expected: u16, actual: u16 },

    #[error("Byte count mismatch: declared {declared}, payload has {actual}")]
    ByteCountMismatch { declared: usize, actual: usize },

    #[error("Device exception for FC{function:02X}: code 0x{code:02X}")]
    Exception { function: u8, code: u8 },

    #[error("PDU would exceed max size: {0} bytes")]
    PduOverflow(usize),
}

/// Driver-level error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HandError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl HandError {
    pub fn config(msg: impl Into<String>) -> Self {
        HandError::Config(msg.into())
    }

    /// Input was rejected without touching the wire
    pub fn is_validation(&self) -> bool {
        matches!(self, HandError::Validation(_))
    }

    /// A response timeout; the link is still open
    pub fn is_timeout(&self) -> bool {
        matches!(self, HandError::Transport(TransportError::NoResponse(_)))
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HandError::from(FrameError::CrcMismatch {
            expected: 0x1234,
            actual: 0xABCD,
        });
        assert_eq!(
            err.to_string(),
            "Frame error: CRC mismatch: expected 0x1234, got 0xABCD"
        );

        let err = HandError::from(ValidationError::ValueOutOfRange {
            value: 1001,
            max: 1000,
        });
        assert!(err.to_string().contains("1001"));
        assert!(err.is_validation());
    }

    #[test]
    fn test_closes_session() {
        assert!(TransportError::Io("broken pipe".into()).closes_session());
        assert!(TransportError::Closed.closes_session());
        assert!(!TransportError::NoResponse(Duration::from_millis(10)).closes_session());
        assert!(!TransportError::NotConnected.closes_session());
    }

    #[test]
    fn test_is_timeout() {
        let err = HandError::from(TransportError::NoResponse(Duration::from_secs(1)));
        assert!(err.is_timeout());
        assert!(!HandError::config("bad").is_timeout());
    }
}
