/// Shared error types for the agency protocol
///
/// Design:
/// - `ProtocolError` covers everything that makes a message impossible to
///   frame or to understand, on either side of the connection
/// - `ErrorCategory` classifies failures so callers can decide whether a
///   retry makes sense and map them to a process exit code
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::ValidationError;

/// Error categories that map to retry policy, log level and exit code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    /// Bad input record or bad configuration value
    Validation,

    /// Socket could not be opened, or broke mid-exchange
    Network,

    /// Message could not be framed or the peer sent something unexpected
    Protocol,

    /// Work was interrupted by a termination request
    Shutdown,

    /// Unexpected failures (file I/O, programming errors)
    Internal,
}

impl ErrorCategory {
    /// Whether an operation failing with this category may succeed if repeated
    pub fn is_transient(&self) -> bool {
        matches!(self, ErrorCategory::Network)
    }

    /// Map error category to process exit code
    pub fn exit_code(&self) -> i32 {
        match self {
            ErrorCategory::Shutdown => 0,
            _ => 1,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Payload too large: {len} bytes (max {max})")]
    PayloadTooLarge { len: usize, max: usize },

    #[error("Payload contains the frame delimiter")]
    EmbeddedDelimiter,

    #[error("Incomplete frame: expected {expected} bytes, got {available}")]
    IncompleteFrame { expected: usize, available: usize },

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Batch mixes agencies: expected {expected}, found {found}")]
    AgencyMismatch { expected: String, found: String },

    #[error("Malformed bet: {0}")]
    MalformedBet(#[from] ValidationError),

    #[error("Payload is not valid UTF-8")]
    InvalidUtf8,
}

impl ProtocolError {
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::Protocol
    }
}
