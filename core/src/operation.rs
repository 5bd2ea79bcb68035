//! Backend-agnostic description of every data operation.
//!
//! # Design
//! Each [`Operation`] has a fixed [`OperationKind`] that knows its action
//! name, its SQL statement and the names of its positional parameters. The
//! action-dispatch protocol sends the parameters as a JSON object whose keys
//! follow that same positional order, so the two protocols carry identical
//! values in identical order. Decoding is the mirror image and is what a
//! backend (or the mock server) uses to recognise an incoming request.

use serde_json::{Map, Value};
use thiserror::Error;

/// Password hash stored for users created through the gateway.
pub const GATEWAY_PASSWORD_HASH: &str = "__gateway__";
pub const DEFAULT_ROLE: &str = "user";
pub const DEFAULT_STATUS: &str = "active";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    GetNavUser,
    CreateNavUser,
    GetLinks,
    GetCategoryOrder,
    DeleteCategoryOrder,
    AddCategoryOrder,
    UpdateLinkOrder,
    AddLink,
    UpdateLink,
    DeleteLink,
    TogglePin,
    GetSettings,
    SaveSetting,
}

impl OperationKind {
    pub const ALL: [OperationKind; 13] = [
        OperationKind::GetNavUser,
        OperationKind::CreateNavUser,
        OperationKind::GetLinks,
        OperationKind::GetCategoryOrder,
        OperationKind::DeleteCategoryOrder,
        OperationKind::AddCategoryOrder,
        OperationKind::UpdateLinkOrder,
        OperationKind::AddLink,
        OperationKind::UpdateLink,
        OperationKind::DeleteLink,
        OperationKind::TogglePin,
        OperationKind::GetSettings,
        OperationKind::SaveSetting,
    ];

    pub fn action(&self) -> &'static str {
        match self {
            OperationKind::GetNavUser => "get-nav-user",
            OperationKind::CreateNavUser => "create-nav-user",
            OperationKind::GetLinks => "get-links",
            OperationKind::GetCategoryOrder => "get-category-order",
            OperationKind::DeleteCategoryOrder => "delete-category-order",
            OperationKind::AddCategoryOrder => "add-category-order",
            OperationKind::UpdateLinkOrder => "update-link-order",
            OperationKind::AddLink => "add-link",
            OperationKind::UpdateLink => "update-link",
            OperationKind::DeleteLink => "delete-link",
            OperationKind::TogglePin => "toggle-pin",
            OperationKind::GetSettings => "get-settings",
            OperationKind::SaveSetting => "save-setting",
        }
    }

    pub fn sql(&self) -> &'static str {
        match self {
            OperationKind::GetNavUser => "SELECT id FROM nav_users WHERE username = ?",
            OperationKind::CreateNavUser => {
                "INSERT INTO nav_users (username, password_hash, role, status) VALUES (?, '__gateway__', 'user', 'active')"
            }
            OperationKind::GetLinks => {
                "SELECT id, user_id, title, url, category, note, pinned, sort_order, updated_at FROM nav_links WHERE user_id = ? ORDER BY pinned DESC, sort_order ASC, id ASC"
            }
            OperationKind::GetCategoryOrder => {
                "SELECT user_id, category, sort_order FROM nav_category_sort WHERE user_id = ? ORDER BY sort_order ASC"
            }
            OperationKind::DeleteCategoryOrder => "DELETE FROM nav_category_sort WHERE user_id = ?",
            OperationKind::AddCategoryOrder => {
                "INSERT INTO nav_category_sort (user_id, category, sort_order) VALUES (?, ?, ?)"
            }
            OperationKind::UpdateLinkOrder => "UPDATE nav_links SET sort_order = ? WHERE id = ?",
            OperationKind::AddLink => {
                "INSERT INTO nav_links (user_id, title, url, category, note, pinned, sort_order, updated_at) VALUES (?, ?, ?, ?, ?, 0, 0, CURRENT_TIMESTAMP)"
            }
            OperationKind::UpdateLink => {
                "UPDATE nav_links SET title = ?, url = ?, category = ?, note = ?, pinned = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?"
            }
            OperationKind::DeleteLink => "DELETE FROM nav_links WHERE id = ?",
            OperationKind::TogglePin => {
                "UPDATE nav_links SET pinned = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?"
            }
            OperationKind::GetSettings => {
                "SELECT user_id, setting_key, setting_value FROM nav_settings WHERE user_id = ?"
            }
            OperationKind::SaveSetting => {
                "INSERT INTO nav_settings (user_id, setting_key, setting_value) VALUES (?, ?, ?) ON CONFLICT(user_id, setting_key) DO UPDATE SET setting_value = excluded.setting_value"
            }
        }
    }

    /// Parameter names in placeholder order.
    pub fn param_names(&self) -> &'static [&'static str] {
        match self {
            OperationKind::GetNavUser | OperationKind::CreateNavUser => &["username"],
            OperationKind::GetLinks
            | OperationKind::GetCategoryOrder
            | OperationKind::DeleteCategoryOrder
            | OperationKind::GetSettings => &["userId"],
            OperationKind::AddCategoryOrder => &["userId", "category", "sortOrder"],
            OperationKind::UpdateLinkOrder => &["sortOrder", "id"],
            OperationKind::AddLink => &["userId", "title", "url", "category", "note"],
            OperationKind::UpdateLink => &["title", "url", "category", "note", "pinned", "id"],
            OperationKind::DeleteLink => &["id"],
            OperationKind::TogglePin => &["pinned", "id"],
            OperationKind::SaveSetting => &["userId", "settingKey", "settingValue"],
        }
    }

    pub fn from_action(action: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.action() == action)
    }

    pub fn from_sql(sql: &str) -> Option<Self> {
        let sql = sql.trim();
        Self::ALL.into_iter().find(|k| k.sql() == sql)
    }
}

/// A fully-parameterised data operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    GetNavUser { username: String },
    CreateNavUser { username: String },
    GetLinks { user_id: i64 },
    GetCategoryOrder { user_id: i64 },
    DeleteCategoryOrder { user_id: i64 },
    AddCategoryOrder { user_id: i64, category: String, sort_order: i64 },
    UpdateLinkOrder { sort_order: i64, id: i64 },
    AddLink { user_id: i64, title: String, url: String, category: String, note: String },
    UpdateLink { title: String, url: String, category: String, note: String, pinned: bool, id: i64 },
    DeleteLink { id: i64 },
    TogglePin { pinned: bool, id: i64 },
    GetSettings { user_id: i64 },
    SaveSetting { user_id: i64, setting_key: String, setting_value: String },
}

/// Why an incoming request could not be turned into an `Operation`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OperationError {
    #[error("unknown action: {0}")]
    UnknownAction(String),
    #[error("unsupported statement")]
    UnknownStatement,
    #[error("{kind} expects {expected} params, got {got}")]
    Arity { kind: &'static str, expected: usize, got: usize },
    #[error("missing param: {0}")]
    MissingParam(&'static str),
    #[error("invalid param: {0}")]
    InvalidParam(&'static str),
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::GetNavUser { .. } => OperationKind::GetNavUser,
            Operation::CreateNavUser { .. } => OperationKind::CreateNavUser,
            Operation::GetLinks { .. } => OperationKind::GetLinks,
            Operation::GetCategoryOrder { .. } => OperationKind::GetCategoryOrder,
            Operation::DeleteCategoryOrder { .. } => OperationKind::DeleteCategoryOrder,
            Operation::AddCategoryOrder { .. } => OperationKind::AddCategoryOrder,
            Operation::UpdateLinkOrder { .. } => OperationKind::UpdateLinkOrder,
            Operation::AddLink { .. } => OperationKind::AddLink,
            Operation::UpdateLink { .. } => OperationKind::UpdateLink,
            Operation::DeleteLink { .. } => OperationKind::DeleteLink,
            Operation::TogglePin { .. } => OperationKind::TogglePin,
            Operation::GetSettings { .. } => OperationKind::GetSettings,
            Operation::SaveSetting { .. } => OperationKind::SaveSetting,
        }
    }

    /// Parameter values in placeholder order. Booleans travel as `1`/`0`.
    pub fn params(&self) -> Vec<Value> {
        match self {
            Operation::GetNavUser { username } | Operation::CreateNavUser { username } => {
                vec![username.as_str().into()]
            }
            Operation::GetLinks { user_id }
            | Operation::GetCategoryOrder { user_id }
            | Operation::DeleteCategoryOrder { user_id }
            | Operation::GetSettings { user_id } => vec![(*user_id).into()],
            Operation::AddCategoryOrder { user_id, category, sort_order } => {
                vec![(*user_id).into(), category.as_str().into(), (*sort_order).into()]
            }
            Operation::UpdateLinkOrder { sort_order, id } => vec![(*sort_order).into(), (*id).into()],
            Operation::AddLink { user_id, title, url, category, note } => vec![
                (*user_id).into(),
                title.as_str().into(),
                url.as_str().into(),
                category.as_str().into(),
                note.as_str().into(),
            ],
            Operation::UpdateLink { title, url, category, note, pinned, id } => vec![
                title.as_str().into(),
                url.as_str().into(),
                category.as_str().into(),
                note.as_str().into(),
                pin_flag(*pinned),
                (*id).into(),
            ],
            Operation::DeleteLink { id } => vec![(*id).into()],
            Operation::TogglePin { pinned, id } => vec![pin_flag(*pinned), (*id).into()],
            Operation::SaveSetting { user_id, setting_key, setting_value } => vec![
                (*user_id).into(),
                setting_key.as_str().into(),
                setting_value.as_str().into(),
            ],
        }
    }

    /// Named parameters for the action-dispatch body, keys in placeholder
    /// order.
    pub fn named_params(&self) -> Map<String, Value> {
        self.kind()
            .param_names()
            .iter()
            .map(|name| name.to_string())
            .zip(self.params())
            .collect()
    }

    /// Decode an action-dispatch request.
    pub fn from_action(action: &str, params: &Map<String, Value>) -> Result<Self, OperationError> {
        let kind = OperationKind::from_action(action)
            .ok_or_else(|| OperationError::UnknownAction(action.to_string()))?;
        let values = kind
            .param_names()
            .iter()
            .map(|name| params.get(*name).cloned().ok_or(OperationError::MissingParam(*name)))
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_values(kind, values)
    }

    /// Decode a SQL-passthrough request. Only the known statements are
    /// accepted, compared after trimming surrounding whitespace.
    pub fn from_sql(sql: &str, params: Vec<Value>) -> Result<Self, OperationError> {
        let kind = OperationKind::from_sql(sql).ok_or(OperationError::UnknownStatement)?;
        let expected = kind.param_names().len();
        if params.len() != expected {
            return Err(OperationError::Arity {
                kind: kind.action(),
                expected,
                got: params.len(),
            });
        }
        Self::from_values(kind, params)
    }

    fn from_values(kind: OperationKind, values: Vec<Value>) -> Result<Self, OperationError> {
        let mut p = ParamReader {
            names: kind.param_names().iter(),
            values: values.into_iter(),
        };
        let op = match kind {
            OperationKind::GetNavUser => Operation::GetNavUser { username: p.string()? },
            OperationKind::CreateNavUser => Operation::CreateNavUser { username: p.string()? },
            OperationKind::GetLinks => Operation::GetLinks { user_id: p.int()? },
            OperationKind::GetCategoryOrder => Operation::GetCategoryOrder { user_id: p.int()? },
            OperationKind::DeleteCategoryOrder => Operation::DeleteCategoryOrder { user_id: p.int()? },
            OperationKind::AddCategoryOrder => Operation::AddCategoryOrder {
                user_id: p.int()?,
                category: p.string()?,
                sort_order: p.int()?,
            },
            OperationKind::UpdateLinkOrder => Operation::UpdateLinkOrder {
                sort_order: p.int()?,
                id: p.int()?,
            },
            OperationKind::AddLink => Operation::AddLink {
                user_id: p.int()?,
                title: p.string()?,
                url: p.string()?,
                category: p.string()?,
                note: p.string()?,
            },
            OperationKind::UpdateLink => Operation::UpdateLink {
                title: p.string()?,
                url: p.string()?,
                category: p.string()?,
                note: p.string()?,
                pinned: p.flag()?,
                id: p.int()?,
            },
            OperationKind::DeleteLink => Operation::DeleteLink { id: p.int()? },
            OperationKind::TogglePin => Operation::TogglePin {
                pinned: p.flag()?,
                id: p.int()?,
            },
            OperationKind::GetSettings => Operation::GetSettings { user_id: p.int()? },
            OperationKind::SaveSetting => Operation::SaveSetting {
                user_id: p.int()?,
                setting_key: p.string()?,
                setting_value: p.string()?,
            },
        };
        Ok(op)
    }
}

fn pin_flag(pinned: bool) -> Value {
    Value::from(if pinned { 1 } else { 0 })
}

struct ParamReader {
    names: std::slice::Iter<'static, &'static str>,
    values: std::vec::IntoIter<Value>,
}

impl ParamReader {
    fn next(&mut self) -> Result<(&'static str, Value), OperationError> {
        let name = *self.names.next().unwrap_or(&"?");
        let value = self.values.next().ok_or(OperationError::MissingParam(name))?;
        Ok((name, value))
    }

    fn string(&mut self) -> Result<String, OperationError> {
        match self.next()? {
            (_, Value::String(s)) => Ok(s),
            (name, _) => Err(OperationError::InvalidParam(name)),
        }
    }

    /// Integers may arrive as JSON numbers or numeric strings.
    fn int(&mut self) -> Result<i64, OperationError> {
        let (name, value) = self.next()?;
        let parsed = match &value {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };
        parsed.ok_or(OperationError::InvalidParam(name))
    }

    fn flag(&mut self) -> Result<bool, OperationError> {
        let (name, value) = self.next()?;
        match value {
            Value::Bool(b) => Ok(b),
            Value::Number(n) => n.as_i64().map(|v| v != 0).ok_or(OperationError::InvalidParam(name)),
            _ => Err(OperationError::InvalidParam(name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn every_kind_has_matching_placeholder_count() {
        for kind in OperationKind::ALL {
            let placeholders = kind.sql().matches('?').count();
            assert_eq!(placeholders, kind.param_names().len(), "{}", kind.action());
        }
    }

    #[test]
    fn action_and_sql_lookups_are_unique() {
        for kind in OperationKind::ALL {
            assert_eq!(OperationKind::from_action(kind.action()), Some(kind));
            assert_eq!(OperationKind::from_sql(kind.sql()), Some(kind));
        }
    }

    #[test]
    fn create_user_statement_carries_defaults() {
        let sql = OperationKind::CreateNavUser.sql();
        assert!(sql.contains(&format!("'{GATEWAY_PASSWORD_HASH}'")));
        assert!(sql.contains(&format!("'{DEFAULT_ROLE}'")));
        assert!(sql.contains(&format!("'{DEFAULT_STATUS}'")));
    }

    #[test]
    fn named_params_keep_positional_order() {
        let op = Operation::UpdateLink {
            title: "t".to_string(),
            url: "u".to_string(),
            category: "c".to_string(),
            note: "n".to_string(),
            pinned: true,
            id: 5,
        };
        let keys: Vec<_> = op.named_params().keys().cloned().collect();
        assert_eq!(keys, ["title", "url", "category", "note", "pinned", "id"]);
        assert_eq!(op.named_params()["pinned"], 1);
    }

    #[test]
    fn toggle_pin_sends_numeric_flag_first() {
        let op = Operation::TogglePin { pinned: false, id: 9 };
        assert_eq!(op.params(), vec![json!(0), json!(9)]);
    }

    #[test]
    fn decode_action_params() {
        let params = json!({"id": 4, "sortOrder": 2});
        let op = Operation::from_action("update-link-order", params.as_object().unwrap()).unwrap();
        assert_eq!(op, Operation::UpdateLinkOrder { sort_order: 2, id: 4 });
    }

    #[test]
    fn decode_action_missing_param() {
        let params = json!({"userId": 1, "category": "news"});
        let err = Operation::from_action("add-category-order", params.as_object().unwrap()).unwrap_err();
        assert_eq!(err, OperationError::MissingParam("sortOrder"));
    }

    #[test]
    fn decode_unknown_action() {
        let err = Operation::from_action("drop-everything", &Map::new()).unwrap_err();
        assert_eq!(err, OperationError::UnknownAction("drop-everything".to_string()));
    }

    #[test]
    fn decode_sql_statement() {
        let op = Operation::from_sql(
            OperationKind::TogglePin.sql(),
            vec![json!(1), json!("12")],
        )
        .unwrap();
        assert_eq!(op, Operation::TogglePin { pinned: true, id: 12 });
    }

    #[test]
    fn decode_sql_rejects_unknown_statement() {
        let err = Operation::from_sql("DROP TABLE nav_links", Vec::new()).unwrap_err();
        assert_eq!(err, OperationError::UnknownStatement);
    }

    #[test]
    fn decode_sql_checks_arity() {
        let err = Operation::from_sql(OperationKind::DeleteLink.sql(), vec![json!(1), json!(2)]).unwrap_err();
        assert!(matches!(err, OperationError::Arity { expected: 1, got: 2, .. }));
    }

    #[test]
    fn decode_rejects_wrong_types() {
        let params = json!({"username": 42});
        let err = Operation::from_action("get-nav-user", params.as_object().unwrap()).unwrap_err();
        assert_eq!(err, OperationError::InvalidParam("username"));
    }

    #[test]
    fn encode_then_decode_every_kind() {
        let ops = vec![
            Operation::GetNavUser { username: "ann".to_string() },
            Operation::AddLink {
                user_id: 1,
                title: "t".to_string(),
                url: "u".to_string(),
                category: "c".to_string(),
                note: String::new(),
            },
            Operation::SaveSetting {
                user_id: 1,
                setting_key: "theme".to_string(),
                setting_value: "dark".to_string(),
            },
        ];
        for op in ops {
            let kind = op.kind();
            assert_eq!(Operation::from_action(kind.action(), &op.named_params()).unwrap(), op);
            assert_eq!(Operation::from_sql(kind.sql(), op.params()).unwrap(), op);
        }
    }
}
