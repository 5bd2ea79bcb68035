//! The `{ok, data, error}` wrapper every endpoint answers with.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;
use crate::http::HttpResponse;

/// Default failure message for action-dispatch calls.
pub const REQUEST_FAILED: &str = "request failed";
/// Default failure message for SQL-passthrough calls.
pub const QUERY_FAILED: &str = "query failed";
pub const LOGIN_FAILED: &str = "login failed";
pub const NOT_AUTHENTICATED: &str = "not authenticated";
pub const UPLOAD_FAILED: &str = "upload failed";

/// Uniform response wrapper.
///
/// A missing `ok` field reads as `false`, so a body such as `{}` is a failure
/// rather than a silent success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Envelope {
    pub fn success(data: impl Into<Option<Value>>) -> Self {
        Self {
            ok: true,
            data: data.into(),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(error.into()),
        }
    }

    /// Turn `ok == false` into `ApiError::RequestFailed`. An absent or empty
    /// `error` falls back to `default_message`.
    pub fn into_result(self, default_message: &str) -> Result<Self, ApiError> {
        if self.ok {
            return Ok(self);
        }
        let message = self
            .error
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| default_message.to_string());
        Err(ApiError::RequestFailed { message })
    }

    /// Decode `data` into `T`. Absent data decodes from `null`.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        let data = self.data.clone().unwrap_or(Value::Null);
        serde_json::from_value(data).map_err(|e| ApiError::Deserialization(e.to_string()))
    }

    /// Decode `data` as a list of rows. Absent or `null` data is an empty
    /// list.
    pub fn rows<T: DeserializeOwned>(&self) -> Result<Vec<T>, ApiError> {
        match &self.data {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(_) => self.data_as(),
        }
    }
}

/// Parse a response body as an envelope and enforce the `ok` flag.
///
/// The HTTP status is not consulted: servers report failures with a JSON
/// envelope regardless of status, and a body that is not JSON fails to
/// parse either way.
pub fn parse_envelope(response: &HttpResponse, default_message: &str) -> Result<Envelope, ApiError> {
    let envelope: Envelope = serde_json::from_str(&response.body).map_err(|e| {
        let content_type = response.header("content-type").unwrap_or("no content-type");
        ApiError::Deserialization(format!("HTTP {} ({content_type}): {e}", response.status))
    })?;
    if !envelope.ok {
        tracing::debug!(status = response.status, error = ?envelope.error, "envelope reported failure");
    }
    envelope.into_result(default_message)
}
