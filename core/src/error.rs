//! Error type shared by engines, transports and interceptors.
//!
//! # Design
//! The facade never wraps or inspects these values; whatever the engine or
//! an interceptor produced is what the caller receives. `Status` carries the
//! full `Response` so callers can still read the body of a rejected reply.

use thiserror::Error;

use crate::response::Response;

/// Errors produced while creating a client instance or dispatching a request.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// The transport could not complete the exchange.
    #[error("network error: {0}")]
    Network(String),

    #[error("timeout of {timeout_ms}ms exceeded")]
    Timeout { timeout_ms: u64 },

    /// The server answered with a status outside the accepted range.
    #[error("request failed with status code {status}")]
    Status {
        status: u16,
        response: Box<Response>,
    },

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("form encoding failed: {0}")]
    FormEncoding(#[from] serde_urlencoded::ser::Error),

    /// Raised by an interceptor to abort the pipeline.
    #[error("rejected: {0}")]
    Rejected(String),
}

impl ClientError {
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected(reason.into())
    }

    /// The server response attached to a `Status` failure.
    pub fn response(&self) -> Option<&Response> {
        match self {
            ClientError::Status { response, .. } => Some(response),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
