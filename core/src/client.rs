//! Stateless HTTP request builder and response parser for the navigation API.
//!
//! # Design
//! `NavClient` holds only its [`ClientConfig`] and carries no mutable state
//! between calls. Each endpoint is split into a `build_*` method that
//! produces an `HttpRequest` and a `parse_*` method that consumes an
//! `HttpResponse`. The round-trip itself belongs to a
//! [`Transport`](crate::transport::Transport); [`NavApi`](crate::api::NavApi)
//! strings the three together.
//!
//! The bearer token is a per-call argument. An empty token counts as absent
//! and suppresses the `Authorization` header.

use crate::config::ClientConfig;
use crate::envelope::{parse_envelope, Envelope, LOGIN_FAILED, NOT_AUTHENTICATED, UPLOAD_FAILED};
use crate::error::ApiError;
use crate::http::{FilePart, HttpMethod, HttpRequest, HttpResponse, RequestBody};
use crate::operation::Operation;
use crate::protocol::{Protocol, API_PREFIX};
use crate::types::{LinkUpdate, NewLink, UploadFile};

/// Multipart field name the upload endpoint reads.
pub const UPLOAD_FIELD: &str = "file";

/// Sans-IO client for the navigation backend.
///
/// Builds requests for the configured [`Protocol`] and turns responses back
/// into envelopes or typed rows. Pair it with a transport, or use
/// [`NavApi`](crate::api::NavApi) which does that for you.
#[derive(Debug, Clone)]
pub struct NavClient {
    config: ClientConfig,
}

impl NavClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_config(ClientConfig::new(base_url))
    }

    pub fn with_config(config: ClientConfig) -> Self {
        let config = ClientConfig {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            ..config
        };
        Self { config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn protocol(&self) -> Protocol {
        self.config.protocol
    }

    pub fn build_login(&self, username: &str, password: &str) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(&serde_json::json!({
            "username": username,
            "password": password,
        }))
        .map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(HttpRequest {
            method: HttpMethod::Post,
            path: self.url("/auth/login"),
            headers: json_headers(None),
            body: Some(RequestBody::Json(body)),
        })
    }

    pub fn build_me(&self, token: Option<&str>) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            path: self.url("/auth/me"),
            headers: auth_header(token).into_iter().collect(),
            body: None,
        }
    }

    /// Request for a data operation over the configured protocol.
    pub fn build_operation(&self, op: &Operation, token: Option<&str>) -> Result<HttpRequest, ApiError> {
        let protocol = self.config.protocol;
        Ok(HttpRequest {
            method: HttpMethod::Post,
            path: format!("{}{}", self.config.base_url, protocol.path(op)),
            headers: json_headers(token),
            body: Some(RequestBody::Json(protocol.body(op)?)),
        })
    }

    pub fn build_upload(&self, file: &UploadFile, token: Option<&str>) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Post,
            path: self.url("/upload"),
            headers: auth_header(token).into_iter().collect(),
            body: Some(RequestBody::Multipart(FilePart {
                field: UPLOAD_FIELD.to_string(),
                file_name: file.file_name.clone(),
                content_type: file.content_type.clone(),
                bytes: file.bytes.clone(),
            })),
        }
    }

    pub fn parse_login(&self, response: HttpResponse) -> Result<Envelope, ApiError> {
        parse_envelope(&response, LOGIN_FAILED)
    }

    pub fn parse_me(&self, response: HttpResponse) -> Result<Envelope, ApiError> {
        parse_envelope(&response, NOT_AUTHENTICATED)
    }

    pub fn parse_operation(&self, response: HttpResponse) -> Result<Envelope, ApiError> {
        parse_envelope(&response, self.config.protocol.default_error())
    }

    pub fn parse_upload(&self, response: HttpResponse) -> Result<Envelope, ApiError> {
        parse_envelope(&response, UPLOAD_FAILED)
    }

    pub fn add_link_operation(&self, user_id: i64, link: &NewLink) -> Operation {
        Operation::AddLink {
            user_id,
            title: link.title.clone(),
            url: link.url.clone(),
            category: self.category_or_default(link.category.as_deref()),
            note: link.note.clone().unwrap_or_default(),
        }
    }

    pub fn update_link_operation(&self, id: i64, link: &LinkUpdate) -> Operation {
        Operation::UpdateLink {
            title: link.title.clone(),
            url: link.url.clone(),
            category: self.category_or_default(link.category.as_deref()),
            note: link.note.clone().unwrap_or_default(),
            pinned: link.pinned,
            id,
        }
    }

    fn category_or_default(&self, category: Option<&str>) -> String {
        match category {
            Some(c) if !c.is_empty() => c.to_string(),
            _ => self.config.default_category.clone(),
        }
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{API_PREFIX}{endpoint}", self.config.base_url)
    }
}

fn auth_header(token: Option<&str>) -> Option<(String, String)> {
    token
        .filter(|t| !t.is_empty())
        .map(|t| ("authorization".to_string(), format!("Bearer {t}")))
}

fn json_headers(token: Option<&str>) -> Vec<(String, String)> {
    let mut headers = vec![("content-type".to_string(), "application/json".to_string())];
    headers.extend(auth_header(token));
    headers
}
