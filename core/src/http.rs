//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! These types describe HTTP requests and responses as plain data. `NavClient`
//! builds `HttpRequest` values and parses `HttpResponse` values without
//! touching the network; a [`Transport`](crate::transport::Transport)
//! executes the round-trip. Keeping the two apart lets tests inspect every
//! request a composite operation issues.

/// HTTP method for a request. The API only ever reads with GET and writes
/// with POST.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// A single file part of a multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Request payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    /// Serialized JSON text; the matching `content-type` header is already
    /// part of the request headers.
    Json(String),
    /// A multipart form with one file part. The transport sets the
    /// boundary-carrying `content-type` itself.
    Multipart(FilePart),
}

impl RequestBody {
    pub fn as_json(&self) -> Option<&str> {
        match self {
            RequestBody::Json(text) => Some(text),
            RequestBody::Multipart(_) => None,
        }
    }
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<RequestBody>,
}

impl HttpRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The JSON body parsed back into a value, if the body is JSON.
    pub fn json_body(&self) -> Option<serde_json::Value> {
        let text = self.body.as_ref()?.as_json()?;
        serde_json::from_str(text).ok()
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn json(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: body.into(),
        }
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}
