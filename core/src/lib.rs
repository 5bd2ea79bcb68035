//! Client for the personal navigation (bookmark) service.
//!
//! # Overview
//! Every call sends one request to the backend and unwraps the
//! `{ok, data, error}` envelope it answers with. The backend speaks one of
//! two interchangeable protocols, chosen in [`ClientConfig`]: named actions
//! posted to `/api/{action}`, or parameterised SQL posted to `/api/sql`.
//!
//! # Design
//! - `NavClient` is sans-IO: `build_*` produces an `HttpRequest`, `parse_*`
//!   consumes an `HttpResponse`.
//! - `Transport` performs the round-trip; `ReqwestTransport` is the real one.
//! - `NavApi` composes the two into async calls, including the batch writes
//!   that fan out concurrently.
//! - The bearer token is an explicit argument on every call and is never
//!   stored.

pub mod api;
pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod http;
pub mod operation;
pub mod protocol;
pub mod transport;
pub mod types;

pub use api::NavApi;
pub use client::NavClient;
pub use config::{ClientConfig, ConfigError};
pub use envelope::Envelope;
pub use error::ApiError;
pub use http::{FilePart, HttpMethod, HttpRequest, HttpResponse, RequestBody};
pub use operation::{Operation, OperationError, OperationKind};
pub use protocol::{Protocol, SqlRequest};
pub use transport::{ReqwestTransport, Transport};
pub use types::{CategoryOrder, Link, LinkUpdate, NavUser, NewLink, Setting, UploadFile};
