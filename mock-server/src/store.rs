//! In-memory tables behind the mock backend.

use std::collections::HashMap;

use nav_core::operation::{DEFAULT_ROLE, DEFAULT_STATUS, GATEWAY_PASSWORD_HASH};
use nav_core::Operation;
use serde_json::{json, Map, Value};

/// Key spelling of returned rows. The action endpoint answers in camelCase,
/// the SQL endpoint with raw column names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStyle {
    Camel,
    Column,
}

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub role: String,
    pub status: String,
}

#[derive(Debug, Clone)]
pub struct LinkRow {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub url: String,
    pub category: String,
    pub note: String,
    pub pinned: bool,
    pub sort_order: i64,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct CategoryRow {
    pub user_id: i64,
    pub category: String,
    pub sort_order: i64,
}

#[derive(Debug, Clone)]
pub struct UploadRow {
    pub url: String,
    pub name: String,
    pub size: usize,
}

#[derive(Debug, Default)]
pub struct Store {
    pub users: Vec<UserRow>,
    pub links: Vec<LinkRow>,
    pub categories: Vec<CategoryRow>,
    /// (user_id, key) → value
    pub settings: Vec<((i64, String), String)>,
    pub sessions: HashMap<String, String>,
    pub uploads: Vec<UploadRow>,
    next_user_id: i64,
    next_link_id: i64,
}

impl Store {
    /// Apply one operation and return the envelope `data`.
    pub fn apply(&mut self, op: Operation, style: RowStyle) -> Option<Value> {
        match op {
            Operation::GetNavUser { username } => {
                let rows = self
                    .users
                    .iter()
                    .filter(|u| u.username == username)
                    .map(|u| json!({"id": u.id}))
                    .collect();
                Some(Value::Array(rows))
            }
            Operation::CreateNavUser { username } => {
                self.next_user_id += 1;
                let id = self.next_user_id;
                self.users.push(UserRow {
                    id,
                    username,
                    password_hash: GATEWAY_PASSWORD_HASH.to_string(),
                    role: DEFAULT_ROLE.to_string(),
                    status: DEFAULT_STATUS.to_string(),
                });
                Some(json!({"id": id}))
            }
            Operation::GetLinks { user_id } => {
                let mut links: Vec<&LinkRow> = self.links.iter().filter(|l| l.user_id == user_id).collect();
                links.sort_by(|a, b| {
                    b.pinned
                        .cmp(&a.pinned)
                        .then(a.sort_order.cmp(&b.sort_order))
                        .then(a.id.cmp(&b.id))
                });
                Some(Value::Array(links.into_iter().map(|l| link_row(l, style)).collect()))
            }
            Operation::GetCategoryOrder { user_id } => {
                let mut rows: Vec<&CategoryRow> =
                    self.categories.iter().filter(|c| c.user_id == user_id).collect();
                rows.sort_by_key(|c| c.sort_order);
                let rows = rows
                    .into_iter()
                    .map(|c| {
                        row(
                            style,
                            [
                                ("user_id", json!(c.user_id)),
                                ("category", json!(c.category)),
                                ("sort_order", json!(c.sort_order)),
                            ],
                        )
                    })
                    .collect();
                Some(Value::Array(rows))
            }
            Operation::DeleteCategoryOrder { user_id } => {
                let before = self.categories.len();
                self.categories.retain(|c| c.user_id != user_id);
                Some(changes(before - self.categories.len()))
            }
            Operation::AddCategoryOrder { user_id, category, sort_order } => {
                self.categories.push(CategoryRow { user_id, category, sort_order });
                Some(changes(1))
            }
            Operation::UpdateLinkOrder { sort_order, id } => {
                Some(changes(self.update_link(id, |l| l.sort_order = sort_order)))
            }
            Operation::AddLink { user_id, title, url, category, note } => {
                self.next_link_id += 1;
                let id = self.next_link_id;
                self.links.push(LinkRow {
                    id,
                    user_id,
                    title,
                    url,
                    category,
                    note,
                    pinned: false,
                    sort_order: 0,
                    updated_at: now(),
                });
                Some(json!({"id": id}))
            }
            Operation::UpdateLink { title, url, category, note, pinned, id } => {
                let updated = self.update_link(id, |l| {
                    l.title = title;
                    l.url = url;
                    l.category = category;
                    l.note = note;
                    l.pinned = pinned;
                    l.updated_at = now();
                });
                Some(changes(updated))
            }
            Operation::DeleteLink { id } => {
                let before = self.links.len();
                self.links.retain(|l| l.id != id);
                Some(changes(before - self.links.len()))
            }
            Operation::TogglePin { pinned, id } => Some(changes(self.update_link(id, |l| {
                l.pinned = pinned;
                l.updated_at = now();
            }))),
            Operation::GetSettings { user_id } => {
                let rows = self
                    .settings
                    .iter()
                    .filter(|((uid, _), _)| *uid == user_id)
                    .map(|((uid, key), value)| {
                        row(
                            style,
                            [
                                ("user_id", json!(uid)),
                                ("setting_key", json!(key)),
                                ("setting_value", json!(value)),
                            ],
                        )
                    })
                    .collect();
                Some(Value::Array(rows))
            }
            Operation::SaveSetting { user_id, setting_key, setting_value } => {
                let key = (user_id, setting_key);
                match self.settings.iter_mut().find(|(k, _)| *k == key) {
                    Some((_, value)) => *value = setting_value,
                    None => self.settings.push((key, setting_value)),
                }
                Some(changes(1))
            }
        }
    }

    fn update_link(&mut self, id: i64, apply: impl FnOnce(&mut LinkRow)) -> usize {
        match self.links.iter_mut().find(|l| l.id == id) {
            Some(link) => {
                apply(link);
                1
            }
            None => 0,
        }
    }
}

fn link_row(l: &LinkRow, style: RowStyle) -> Value {
    row(
        style,
        [
            ("id", json!(l.id)),
            ("user_id", json!(l.user_id)),
            ("title", json!(l.title)),
            ("url", json!(l.url)),
            ("category", json!(l.category)),
            ("note", json!(l.note)),
            ("pinned", json!(if l.pinned { 1 } else { 0 })),
            ("sort_order", json!(l.sort_order)),
            ("updated_at", json!(l.updated_at)),
        ],
    )
}

fn row<const N: usize>(style: RowStyle, columns: [(&str, Value); N]) -> Value {
    let map: Map<String, Value> = columns
        .into_iter()
        .map(|(column, value)| {
            let key = match style {
                RowStyle::Column => column.to_string(),
                RowStyle::Camel => camel_case(column),
            };
            (key, value)
        })
        .collect();
    Value::Object(map)
}

fn camel_case(column: &str) -> String {
    let mut out = String::with_capacity(column.len());
    let mut upper = false;
    for ch in column.chars() {
        if ch == '_' {
            upper = true;
        } else if upper {
            out.extend(ch.to_uppercase());
            upper = false;
        } else {
            out.push(ch);
        }
    }
    out
}

fn changes(n: usize) -> Value {
    json!({"changes": n})
}

fn now() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
