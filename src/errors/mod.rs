//! Error types for the Chatty client.
//!
//! Covers the failure modes of the streaming pipeline: configuration problems
//! detected before any request is issued, transport and HTTP failures that end
//! a session, explicit cancellation, and per-frame decode failures that are
//! recovered locally.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for Chatty operations.
pub type ChattyResult<T> = Result<T, ChattyError>;

/// Error type for Chatty client operations.
#[derive(Debug, Error)]
pub enum ChattyError {
    /// Configuration error (missing API key, invalid base URL, etc.)
    #[error("Configuration error: {message}")]
    Configuration {
        /// Error message describing the configuration issue.
        message: String,
    },

    /// A streaming request is already in flight on this processor.
    #[error("A request is already in progress")]
    RequestInProgress,

    /// Authentication error (invalid or revoked API key).
    #[error("Authentication failed: {message}")]
    Authentication {
        /// Error message from the API.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("Rate limit exceeded: {message}")]
    RateLimit {
        /// Error message.
        message: String,
        /// Duration to wait before retrying, when the server sent one.
        retry_after: Option<Duration>,
    },

    /// Non-success HTTP status from the provider.
    #[error("Server error (HTTP {status_code}): {message}")]
    Server {
        /// Error message.
        message: String,
        /// HTTP status code.
        status_code: u16,
    },

    /// Network/connection error.
    #[error("Network error: {message}")]
    Network {
        /// Error message.
        message: String,
    },

    /// Timeout error.
    #[error("Request timeout: {message}")]
    Timeout {
        /// Error message.
        message: String,
    },

    /// A single SSE frame carried malformed JSON.
    #[error("Failed to parse stream frame: {message}")]
    FrameParse {
        /// Parser error message.
        message: String,
        /// The offending frame payload.
        payload: String,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message.
        message: String,
    },

    /// Unknown error.
    #[error("Unknown error (HTTP {status}): {message}")]
    Unknown {
        /// HTTP status code.
        status: u16,
        /// Error message.
        message: String,
    },
}

impl ChattyError {
    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        ChattyError::Configuration {
            message: message.into(),
        }
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        ChattyError::Network {
            message: message.into(),
        }
    }

    /// Maps an HTTP status and an optional provider error body to an error.
    pub fn from_status(status: u16, body: &[u8], retry_after: Option<Duration>) -> Self {
        let message = status_message(status, body);

        match status {
            401 | 403 => ChattyError::Authentication { message },
            429 => ChattyError::RateLimit {
                message,
                retry_after,
            },
            400..=599 => ChattyError::Server {
                message,
                status_code: status,
            },
            _ => ChattyError::Unknown { status, message },
        }
    }

    /// Returns true if this error was detected before any request was issued.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ChattyError::Configuration { .. } | ChattyError::RequestInProgress
        )
    }
}

/// Extracts the provider's error message from a body, falling back to a
/// description of the status.
pub(crate) fn status_message(status: u16, body: &[u8]) -> String {
    serde_json::from_slice::<ApiErrorResponse>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| default_status_message(status))
}

fn default_status_message(status: u16) -> String {
    match status {
        401 => "Invalid API key".to_string(),
        403 => "Forbidden".to_string(),
        404 => "Resource not found".to_string(),
        429 => "Rate limit exceeded".to_string(),
        _ => format!("Unexpected status: {}", status),
    }
}

/// API error response body as returned by OpenAI-compatible providers.
#[derive(Debug, serde::Deserialize)]
pub struct ApiErrorResponse {
    /// The error details.
    pub error: ApiErrorDetail,
}

/// Detailed API error information.
#[derive(Debug, serde::Deserialize)]
pub struct ApiErrorDetail {
    /// The error message.
    pub message: String,
    /// The error code, numeric or textual depending on the provider.
    #[serde(default)]
    pub code: Option<serde_json::Value>,
}

impl From<reqwest::Error> for ChattyError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ChattyError::Timeout {
                message: err.to_string(),
            }
        } else if err.is_connect() {
            ChattyError::Network {
                message: err.to_string(),
            }
        } else {
            ChattyError::Unknown {
                status: err.status().map(|s| s.as_u16()).unwrap_or(0),
                message: err.to_string(),
            }
        }
    }
}

impl From<serde_json::Error> for ChattyError {
    fn from(err: serde_json::Error) -> Self {
        ChattyError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<url::ParseError> for ChattyError {
    fn from(err: url::ParseError) -> Self {
        ChattyError::Configuration {
            message: format!("Invalid URL: {}", err),
        }
    }
}
