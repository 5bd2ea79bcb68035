//! Executes `HttpRequest` values against the network.
//!
//! # Design
//! `Transport` is the only seam that performs I/O. `ReqwestTransport` is the
//! production implementation; tests swap in an in-process recorder. No retry
//! or timeout is layered on top of what the underlying client does.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, RequestBody};

#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request and return the raw response. Non-2xx statuses are
    /// returned as data; only transport-level failures are errors.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        (**self).send(request).await
    }
}

/// `Transport` backed by a shared `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        tracing::debug!(method = request.method.as_str(), path = %request.path, "sending request");

        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.path),
            HttpMethod::Post => self.client.post(&request.path),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = match request.body {
            Some(RequestBody::Json(text)) => builder.body(text),
            Some(RequestBody::Multipart(part)) => {
                let mut file = Part::bytes(part.bytes).file_name(part.file_name);
                if let Some(mime) = part.content_type {
                    file = file
                        .mime_str(&mime)
                        .map_err(|e| ApiError::Serialization(e.to_string()))?;
                }
                builder.multipart(Form::new().part(part.field, file))
            }
            None => builder,
        };

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
            .collect();
        let body = response.text().await?;
        tracing::debug!(status, "received response");

        Ok(HttpResponse { status, headers, body })
    }
}
