//! Error types for the relay service.

use thiserror::Error;

use crate::security::SignatureError;

/// Main error type for relay operations.
#[derive(Error, Debug)]
pub enum RelayError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Webhook signature errors
    #[error("Signature error: {0}")]
    Signature(#[from] SignatureError),

    /// Outbound HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A remote API answered with a non-success status
    #[error("API error: {status} - {body}")]
    Api { status: u16, body: String },

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for RelayError {
    fn from(err: config::ConfigError) -> Self {
        RelayError::Config(err.to_string())
    }
}

/// Result type alias for relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;
