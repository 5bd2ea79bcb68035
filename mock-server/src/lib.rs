//! In-memory backend for the navigation API.
//!
//! Serves both wire protocols from the same tables so client tests can run
//! end-to-end against either. Every response is a `{ok, data, error}`
//! envelope; failures also carry a matching HTTP status.

pub mod store;

use std::sync::Arc;

use axum::{
    extract::{
        multipart::MultipartRejection,
        rejection::JsonRejection,
        Multipart, Path, State,
    },
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use nav_core::{Envelope, Operation, SqlRequest};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

use store::{RowStyle, Store, UploadRow};

pub type Db = Arc<RwLock<Store>>;

type Reply = (StatusCode, Json<Envelope>);

#[derive(Debug, Deserialize)]
pub struct LoginBody {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ActionBody {
    #[serde(default)]
    pub params: Map<String, Value>,
}

pub fn app() -> Router {
    app_with_state(Db::default())
}

/// Router over caller-owned state, so tests can inspect the tables.
pub fn app_with_state(db: Db) -> Router {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/me", get(me))
        .route("/api/upload", post(upload))
        .route("/api/sql", post(sql))
        .route("/api/{action}", post(action))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn ok(data: Option<Value>) -> Reply {
    (StatusCode::OK, Json(Envelope::success(data)))
}

fn fail(status: StatusCode, error: impl Into<String>) -> Reply {
    (status, Json(Envelope::failure(error)))
}

/// Extractor failures still answer with an envelope.
fn rejected(status: StatusCode, text: String) -> Reply {
    tracing::debug!(%status, error = %text, "request rejected");
    fail(status, text)
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .filter(|t| !t.is_empty())
}

/// Username behind the request's token, if the token was issued here.
async fn session(db: &Db, headers: &HeaderMap) -> Option<String> {
    let token = bearer(headers)?;
    db.read().await.sessions.get(token).cloned()
}

async fn login(State(db): State<Db>, body: Result<Json<LoginBody>, JsonRejection>) -> Reply {
    let Json(body) = match body {
        Ok(body) => body,
        Err(e) => return rejected(e.status(), e.body_text()),
    };
    if body.username.is_empty() || body.password.is_empty() {
        tracing::debug!("login rejected: empty credentials");
        return fail(StatusCode::UNAUTHORIZED, "invalid username or password");
    }
    let token = Uuid::new_v4().to_string();
    db.write()
        .await
        .sessions
        .insert(token.clone(), body.username.clone());
    tracing::info!(username = %body.username, "login");
    ok(Some(json!({"token": token, "user": {"username": body.username}})))
}

async fn me(State(db): State<Db>, headers: HeaderMap) -> Reply {
    match session(&db, &headers).await {
        Some(username) => ok(Some(json!({"username": username}))),
        None => fail(StatusCode::UNAUTHORIZED, "unauthorized"),
    }
}

async fn action(
    State(db): State<Db>,
    Path(action): Path<String>,
    headers: HeaderMap,
    body: Result<Json<ActionBody>, JsonRejection>,
) -> Reply {
    if session(&db, &headers).await.is_none() {
        return fail(StatusCode::UNAUTHORIZED, "unauthorized");
    }
    let Json(body) = match body {
        Ok(body) => body,
        Err(e) => return rejected(e.status(), e.body_text()),
    };
    match Operation::from_action(&action, &body.params) {
        Ok(op) => {
            tracing::debug!(action = %action, "action");
            ok(db.write().await.apply(op, RowStyle::Camel))
        }
        Err(e) => fail(StatusCode::BAD_REQUEST, e.to_string()),
    }
}

async fn sql(
    State(db): State<Db>,
    headers: HeaderMap,
    body: Result<Json<SqlRequest>, JsonRejection>,
) -> Reply {
    if session(&db, &headers).await.is_none() {
        return fail(StatusCode::UNAUTHORIZED, "unauthorized");
    }
    let Json(body) = match body {
        Ok(body) => body,
        Err(e) => return rejected(e.status(), e.body_text()),
    };
    match Operation::from_sql(&body.sql, body.params) {
        Ok(op) => {
            tracing::debug!(kind = op.kind().action(), "sql");
            ok(db.write().await.apply(op, RowStyle::Column))
        }
        Err(e) => fail(StatusCode::BAD_REQUEST, e.to_string()),
    }
}

async fn upload(
    State(db): State<Db>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Reply {
    if session(&db, &headers).await.is_none() {
        return fail(StatusCode::UNAUTHORIZED, "unauthorized");
    }
    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(e) => return rejected(e.status(), e.body_text()),
    };
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return fail(StatusCode::BAD_REQUEST, "missing file field"),
            Err(e) => return fail(StatusCode::BAD_REQUEST, e.to_string()),
        };
        if field.name() != Some("file") {
            continue;
        }
        let name = field.file_name().unwrap_or("upload.bin").to_string();
        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => return fail(StatusCode::BAD_REQUEST, e.to_string()),
        };

        let mut store = db.write().await;
        let url = format!("/uploads/{}-{name}", store.uploads.len() + 1);
        store.uploads.push(UploadRow {
            url: url.clone(),
            name: name.clone(),
            size: bytes.len(),
        });
        tracing::info!(%url, size = bytes.len(), "stored upload");
        return ok(Some(json!({"url": url, "name": name, "size": bytes.len()})));
    }
}
