//! HTTP transport layer for the Chatty client.
//!
//! Provides the transport abstraction used by the services, a reqwest-backed
//! implementation, and the line framing used to decode streamed replies.

mod http;
mod streaming;

pub use http::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, HttpTransportImpl};
pub use streaming::{parse_line, ByteStream, LineBuffer, SseLine, StreamingResponse};

use std::time::Duration;

/// Transport error types.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// Connection error.
    #[error("Connection error: {message}")]
    Connection {
        /// Error message.
        message: String,
    },

    /// Timeout error.
    #[error("Timeout after {timeout:?}")]
    Timeout {
        /// Timeout duration.
        timeout: Duration,
    },

    /// Invalid response or broken body stream.
    #[error("Invalid response: {message}")]
    InvalidResponse {
        /// Error message.
        message: String,
    },
}

impl TransportError {
    /// Classifies a reqwest error.
    pub(crate) fn from_reqwest(err: &reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            TransportError::Timeout { timeout }
        } else if err.is_connect() {
            TransportError::Connection {
                message: err.to_string(),
            }
        } else {
            TransportError::InvalidResponse {
                message: err.to_string(),
            }
        }
    }
}

impl From<TransportError> for crate::errors::ChattyError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout { .. } => crate::errors::ChattyError::Timeout {
                message: err.to_string(),
            },
            other => crate::errors::ChattyError::network(other.to_string()),
        }
    }
}
