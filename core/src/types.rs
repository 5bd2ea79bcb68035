//! Domain DTOs for the navigation API.
//!
//! # Design
//! Rows come back from two kinds of backend: the action-dispatch server
//! answers in camelCase, while the SQL-passthrough server returns raw column
//! names. Every row type therefore accepts both spellings. `pinned` is stored
//! as `0`/`1` in the database and is accepted as a number or a boolean.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A bookmark row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub id: i64,
    #[serde(alias = "user_id")]
    pub user_id: i64,
    pub title: String,
    pub url: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub category: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub note: String,
    #[serde(default, deserialize_with = "flag")]
    pub pinned: bool,
    #[serde(default, alias = "sort_order")]
    pub sort_order: i64,
    #[serde(default, alias = "updated_at")]
    pub updated_at: Option<String>,
}

/// Input for creating a link. Empty `category` and `note` are replaced with
/// the configured default category and `""`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewLink {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

/// Input for replacing every editable field of a link.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LinkUpdate {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub pinned: bool,
}

/// Position of one category in a user's category list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CategoryOrder {
    #[serde(default, alias = "user_id")]
    pub user_id: i64,
    pub category: String,
    #[serde(alias = "sort_order")]
    pub sort_order: i64,
}

/// A per-user key/value setting. Values are always strings on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Setting {
    #[serde(default, alias = "user_id")]
    pub user_id: i64,
    #[serde(alias = "setting_key")]
    pub setting_key: String,
    #[serde(alias = "setting_value", deserialize_with = "nullable_string")]
    pub setting_value: String,
}

/// Row returned by the user lookup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NavUser {
    pub id: i64,
}

/// A file to send to the upload endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: None,
            bytes: bytes.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// String form of a setting value as sent to the backend.
///
/// Strings pass through untouched. Numbers with no fractional part print as
/// integers (`1.0` becomes `"1"`), and arrays join their elements with `,`
/// (a `null` element becomes empty). Objects and other values use their
/// compact JSON text.
pub fn setting_value_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => (f as i64).to_string(),
            _ => n.to_string(),
        },
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => setting_value_string(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        other => other.to_string(),
    }
}

fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_i64().map(|v| v != 0).unwrap_or(false),
        Value::String(s) => s == "1" || s.eq_ignore_ascii_case("true"),
        _ => false,
    })
}

fn nullable_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
