//! Wire adapters for the two backend protocols.
//!
//! # Design
//! Both adapters turn an [`Operation`] into a `POST` with a JSON body and
//! differ only in path and body shape:
//!
//! - action dispatch: `POST /api/{action}` with `{"params": {...}}`
//! - SQL passthrough: `POST /api/sql` with `{"sql": "...", "params": [...]}`
//!
//! The SQL variant ships statement text from the client. A backend that
//! executes arbitrary client SQL is a trust boundary problem; the statements
//! here are a closed set so a server can whitelist them
//! (see [`Operation::from_sql`]).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::envelope::{QUERY_FAILED, REQUEST_FAILED};
use crate::error::ApiError;
use crate::operation::Operation;

pub const API_PREFIX: &str = "/api";
pub const SQL_PATH: &str = "/api/sql";

/// Which backend protocol a deployment speaks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Action,
    Sql,
}

/// Body of an SQL-passthrough request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlRequest {
    pub sql: String,
    #[serde(default)]
    pub params: Vec<Value>,
}

impl Protocol {
    /// Path the operation is posted to, without the base URL.
    pub fn path(&self, op: &Operation) -> String {
        match self {
            Protocol::Action => format!("{API_PREFIX}/{}", op.kind().action()),
            Protocol::Sql => SQL_PATH.to_string(),
        }
    }

    /// Serialized JSON body for the operation.
    pub fn body(&self, op: &Operation) -> Result<String, ApiError> {
        let value = match self {
            Protocol::Action => json!({ "params": op.named_params() }),
            Protocol::Sql => serde_json::to_value(SqlRequest {
                sql: op.kind().sql().to_string(),
                params: op.params(),
            })
            .map_err(|e| ApiError::Serialization(e.to_string()))?,
        };
        serde_json::to_string(&value).map_err(|e| ApiError::Serialization(e.to_string()))
    }

    /// Message used when a failed envelope carries no `error`.
    pub fn default_error(&self) -> &'static str {
        match self {
            Protocol::Action => REQUEST_FAILED,
            Protocol::Sql => QUERY_FAILED,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Action => write!(f, "action"),
            Protocol::Sql => write!(f, "sql"),
        }
    }
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "action" => Ok(Protocol::Action),
            "sql" => Ok(Protocol::Sql),
            other => Err(format!("unknown protocol '{other}', expected 'action' or 'sql'")),
        }
    }
}
