/*
[INPUT]:  Error sources (validation, signing, auth, HTTP, stream, serialization)
[OUTPUT]: Structured error taxonomy with retry and validation hints
[POS]:    Error handling layer - unified error types for entire crate
[UPDATE]: When adding new error sources or changing retry classification
*/

use reqwest::StatusCode;
use thiserror::Error;

/// Main error type for the GRVT order adapter
#[derive(Error, Debug)]
pub enum GrvtError {
    /// Invalid or unknown configuration (e.g. unknown environment)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Order references an instrument that is not in the catalog
    #[error("Unknown instrument: {symbol}")]
    UnknownInstrument { symbol: String },

    /// Order failed validation before any signing or network call
    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    /// Key parsing, signing or recovery failed
    #[error("Signature error: {0}")]
    Signature(String),

    /// Session refresh rejected or timed out
    #[error("Authentication failed: {message}")]
    Auth { message: String },

    /// Transport-level HTTP failure
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Operation exceeded its bounded wait
    #[error("Timed out after {duration_ms}ms: {operation}")]
    Timeout { operation: String, duration_ms: u64 },

    /// Exchange returned a non-success response
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Malformed or unexpected message on a stream
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Streaming connection could not be (re)established
    #[error("Connection error: {0}")]
    Connection(String),

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL parsing failed
    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Local file access failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GrvtError {
    /// Check if the error is a transient failure worth retrying on idempotent reads
    pub fn is_retryable(&self) -> bool {
        match self {
            GrvtError::Network(err) => err.is_connect() || err.is_timeout() || err.is_request(),
            GrvtError::Timeout { .. } => true,
            GrvtError::Api { status, .. } => matches!(status, 429 | 502 | 503 | 504),
            _ => false,
        }
    }

    /// Check if the error was raised by local validation
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            GrvtError::UnknownInstrument { .. } | GrvtError::InvalidOrder(_)
        )
    }

    /// Check if error indicates authentication failure
    pub fn is_auth_error(&self) -> bool {
        match self {
            GrvtError::Auth { .. } => true,
            GrvtError::Api { status, .. } => *status == 401 || *status == 403,
            _ => false,
        }
    }

    /// Create an API error from status code and message
    pub fn api_error(status: StatusCode, message: impl Into<String>) -> Self {
        GrvtError::Api {
            status: status.as_u16(),
            message: message.into(),
        }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        GrvtError::Auth {
            message: message.into(),
        }
    }

    pub fn timeout(operation: impl Into<String>, duration: std::time::Duration) -> Self {
        GrvtError::Timeout {
            operation: operation.into(),
            duration_ms: duration.as_millis() as u64,
        }
    }
}

/// Result type alias for GRVT operations
pub type Result<T> = std::result::Result<T, GrvtError>;
