use shared::{ErrorCategory, ProtocolError};

use crate::source::SourceError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Could not connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Bet source error: {0}")]
    Source(#[from] SourceError),

    #[error("Cancelled by shutdown request")]
    Cancelled,

    #[error("Winners not available after {attempts} attempts")]
    PollExhausted { attempts: u32 },
}

impl ClientError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ClientError::Connect { .. } | ClientError::Io(_) => ErrorCategory::Network,
            ClientError::Protocol(_) => ErrorCategory::Protocol,
            ClientError::Source(_) => ErrorCategory::Internal,
            ClientError::Cancelled => ErrorCategory::Shutdown,
            ClientError::PollExhausted { .. } => ErrorCategory::Network,
        }
    }

    /// Connection and mid-exchange failures; a later attempt may succeed
    pub fn is_transient(&self) -> bool {
        !matches!(self, ClientError::PollExhausted { .. }) && self.category().is_transient()
    }

    /// Short label used for metrics and status lines
    pub fn kind(&self) -> &'static str {
        match self {
            ClientError::Connect { .. } => "connect",
            ClientError::Io(_) => "io",
            ClientError::Protocol(_) => "protocol",
            ClientError::Source(_) => "source",
            ClientError::Cancelled => "cancelled",
            ClientError::PollExhausted { .. } => "poll_exhausted",
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
