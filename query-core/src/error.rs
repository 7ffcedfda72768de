//! # Query Error Types
//!
//! Centralized error definitions for the query-core crate.
//! All errors implement `std::error::Error` and `std::fmt::Display`.

use thiserror::Error;

/// Failure reported by the transport capability for a single request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Request timeout after {timeout_ms}ms to {endpoint}")]
    Timeout { timeout_ms: u64, endpoint: String },

    #[error("Connection refused to {endpoint}: {reason}")]
    ConnectionRefused { endpoint: String, reason: String },

    #[error("HTTP error {status_code} from {endpoint}")]
    Http { status_code: u16, endpoint: String },

    #[error("Request cancelled")]
    Cancelled,

    #[error("I/O error: {msg}")]
    Io { msg: String },
}

/// Taxonomy class of a [`QueryError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    Decode,
    Protocol,
    CallerContract,
    RetryExhausted,
}

/// Terminal failure of a logical query.
///
/// Exactly one of these (or one success) is delivered per logical call. A
/// chunked query carries the first error any chunk observed, unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Failed to decode response: {reason}")]
    Decode { reason: String },

    #[error("Protocol error: {reason}")]
    Protocol { reason: String },

    /// The remote rejected a submission (HTTP 422), e.g. the resource exists.
    #[error("Submission rejected: {reason}")]
    Submission { reason: String },

    #[error("Invalid argument '{field}': {reason}")]
    InvalidArgument { field: String, reason: String },

    #[error("No data after {attempts} attempts")]
    RetryExhausted { attempts: u32 },

    #[error("Query abandoned before completion")]
    Abandoned,
}

impl QueryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QueryError::Transport(_) | QueryError::Abandoned => ErrorKind::Transport,
            QueryError::Decode { .. } => ErrorKind::Decode,
            QueryError::Protocol { .. } | QueryError::Submission { .. } => ErrorKind::Protocol,
            QueryError::InvalidArgument { .. } => ErrorKind::CallerContract,
            QueryError::RetryExhausted { .. } => ErrorKind::RetryExhausted,
        }
    }

    pub fn protocol(reason: impl Into<String>) -> Self {
        QueryError::Protocol {
            reason: reason.into(),
        }
    }

    pub fn invalid_argument(field: &str, reason: impl Into<String>) -> Self {
        QueryError::InvalidArgument {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for QueryError {
    fn from(e: serde_json::Error) -> Self {
        QueryError::Decode {
            reason: e.to_string(),
        }
    }
}

/// Configuration-related errors
#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Failed to load configuration from '{path}': {msg}")]
    Load { path: String, msg: String },
}
