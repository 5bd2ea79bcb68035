//! Error types for the navigation API client.
//!
//! # Design
//! `RequestFailed` is the envelope-level failure: the server answered with
//! `ok == false`, and the message is either the server's `error` string or
//! the default for the operation. The remaining variants cover failures
//! before an envelope exists (transport, undecodable body, unencodable
//! payload). Every variant means the request failed; callers that only want
//! display text use [`ApiError::message`].

use thiserror::Error;

/// Errors returned by `NavClient` parse methods and the async `NavApi`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The envelope came back with `ok == false`.
    #[error("{message}")]
    RequestFailed { message: String },

    /// The transport rejected the request (connection refused, reset, TLS).
    #[error("transport failed: {0}")]
    Transport(String),

    /// The response body was not an envelope, or `data` had the wrong shape.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The request payload could not be serialized.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl ApiError {
    pub fn request_failed(message: impl Into<String>) -> Self {
        ApiError::RequestFailed {
            message: message.into(),
        }
    }

    /// Text suitable for showing to a user.
    pub fn message(&self) -> String {
        match self {
            ApiError::RequestFailed { message } => message.clone(),
            other => other.to_string(),
        }
    }

    pub fn is_request_failed(&self) -> bool {
        matches!(self, ApiError::RequestFailed { .. })
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Transport(err.to_string())
    }
}
