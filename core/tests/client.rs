//! Composite operations against an in-process recording transport.
//!
//! # Design
//! `Recorder` answers every request through a caller-supplied responder and
//! keeps the requests it saw, so tests can assert on call counts, order and
//! parameters without a server.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use nav_core::{
    ApiError, ClientConfig, HttpRequest, HttpResponse, NavApi, NewLink, Operation, Protocol, Transport,
};
use serde_json::{json, Value};

type Responder = Box<dyn Fn(&Operation) -> Value + Send + Sync>;

struct Recorder {
    protocol: Protocol,
    responder: Responder,
    seen: Mutex<Vec<HttpRequest>>,
    delay: Option<Box<dyn Fn(&Operation) -> Duration + Send + Sync>>,
    completed: AtomicUsize,
}

impl Recorder {
    fn new(protocol: Protocol, responder: impl Fn(&Operation) -> Value + Send + Sync + 'static) -> Self {
        Self {
            protocol,
            responder: Box::new(responder),
            seen: Mutex::new(Vec::new()),
            delay: None,
            completed: AtomicUsize::new(0),
        }
    }

    fn ok() -> Self {
        Self::new(Protocol::Action, |_| json!({"ok": true}))
    }

    fn with_delay(mut self, delay: impl Fn(&Operation) -> Duration + Send + Sync + 'static) -> Self {
        self.delay = Some(Box::new(delay));
        self
    }

    fn operations(&self) -> Vec<Operation> {
        self.seen.lock().unwrap().iter().map(|r| self.decode(r)).collect()
    }

    fn decode(&self, request: &HttpRequest) -> Operation {
        let body = request.json_body().expect("json body");
        match self.protocol {
            Protocol::Action => {
                let action = request.path.rsplit('/').next().unwrap();
                Operation::from_action(action, body["params"].as_object().unwrap()).unwrap()
            }
            Protocol::Sql => {
                let params = body["params"].as_array().unwrap().clone();
                Operation::from_sql(body["sql"].as_str().unwrap(), params).unwrap()
            }
        }
    }
}

#[async_trait]
impl Transport for Recorder {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let op = self.decode(&request);
        self.seen.lock().unwrap().push(request);
        if let Some(delay) = &self.delay {
            tokio::time::sleep(delay(&op)).await;
        }
        let body = (self.responder)(&op);
        self.completed.fetch_add(1, Ordering::SeqCst);
        Ok(HttpResponse::json(200, body.to_string()))
    }
}

fn api(recorder: &Arc<Recorder>) -> NavApi<Arc<Recorder>> {
    let config = ClientConfig::new("http://nav.test").with_protocol(recorder.protocol);
    NavApi::with_transport(config, Arc::clone(recorder))
}

// ---------------------------------------------------------------------------
// Envelope handling
// ---------------------------------------------------------------------------

#[tokio::test]
async fn ok_data_is_returned_unchanged() {
    let data = json!({"id": 42, "url": "/uploads/1-a.png"});
    let expected = data.clone();
    let recorder = Arc::new(Recorder::new(Protocol::Action, move |_| json!({"ok": true, "data": data})));
    let env = api(&recorder).delete_link(Some("tok"), 1).await.unwrap();
    assert_eq!(env.data, Some(expected));
}

#[tokio::test]
async fn server_error_is_propagated() {
    let recorder = Arc::new(Recorder::new(Protocol::Action, |_| json!({"ok": false, "error": "E"})));
    let err = api(&recorder).get_links(Some("tok"), 1).await.unwrap_err();
    assert!(matches!(err, ApiError::RequestFailed { ref message } if message == "E"));
}

#[tokio::test]
async fn missing_error_uses_protocol_default() {
    let action = Arc::new(Recorder::new(Protocol::Action, |_| json!({"ok": false})));
    let err = api(&action).toggle_pin(Some("tok"), 1, true).await.unwrap_err();
    assert_eq!(err.message(), "request failed");

    let sql = Arc::new(Recorder::new(Protocol::Sql, |_| json!({"ok": false})));
    let err = api(&sql).toggle_pin(Some("tok"), 1, true).await.unwrap_err();
    assert_eq!(err.message(), "query failed");
}

#[tokio::test]
async fn get_links_decodes_rows() {
    let recorder = Arc::new(Recorder::new(Protocol::Sql, |_| {
        json!({"ok": true, "data": [{
            "id": 1, "user_id": 7, "title": "Rust", "url": "https://rust-lang.org",
            "category": "dev", "note": null, "pinned": 1, "sort_order": 0,
            "updated_at": "2024-01-01 00:00:00"
        }]})
    }));
    let links = api(&recorder).get_links(Some("tok"), 7).await.unwrap();
    assert_eq!(links.len(), 1);
    assert!(links[0].pinned);
    assert_eq!(recorder.operations(), vec![Operation::GetLinks { user_id: 7 }]);
}

// ---------------------------------------------------------------------------
// ensure_nav_user
// ---------------------------------------------------------------------------

#[tokio::test]
async fn ensure_nav_user_existing_user_skips_insert() {
    let recorder = Arc::new(Recorder::new(Protocol::Action, |_| json!({"ok": true, "data": [{"id": 5}]})));
    let id = api(&recorder).ensure_nav_user(Some("tok"), "ann").await.unwrap();
    assert_eq!(id, 5);
    assert_eq!(
        recorder.operations(),
        vec![Operation::GetNavUser { username: "ann".to_string() }]
    );
}

#[tokio::test]
async fn ensure_nav_user_creates_then_requeries() {
    let lookups = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&lookups);
    let recorder = Arc::new(Recorder::new(Protocol::Sql, move |op| match op {
        Operation::GetNavUser { .. } if counter.fetch_add(1, Ordering::SeqCst) == 0 => {
            json!({"ok": true, "data": []})
        }
        Operation::GetNavUser { .. } => json!({"ok": true, "data": [{"id": 11}, {"id": 12}]}),
        _ => json!({"ok": true}),
    }));
    let id = api(&recorder).ensure_nav_user(Some("tok"), "bob").await.unwrap();
    assert_eq!(id, 11);
    assert_eq!(
        recorder.operations(),
        vec![
            Operation::GetNavUser { username: "bob".to_string() },
            Operation::CreateNavUser { username: "bob".to_string() },
            Operation::GetNavUser { username: "bob".to_string() },
        ]
    );
}

#[tokio::test]
async fn ensure_nav_user_fails_when_requery_is_empty() {
    let recorder = Arc::new(Recorder::new(Protocol::Action, |op| match op {
        Operation::GetNavUser { .. } => json!({"ok": true, "data": []}),
        _ => json!({"ok": true}),
    }));
    let err = api(&recorder).ensure_nav_user(Some("tok"), "ghost").await.unwrap_err();
    assert!(err.is_request_failed());
    assert_eq!(recorder.operations().len(), 3);
}

// ---------------------------------------------------------------------------
// Batch writes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn save_category_order_empty_only_deletes() {
    let recorder = Arc::new(Recorder::ok());
    api(&recorder)
        .save_category_order::<&str>(Some("tok"), 3, &[])
        .await
        .unwrap();
    assert_eq!(recorder.operations(), vec![Operation::DeleteCategoryOrder { user_id: 3 }]);
}

#[tokio::test]
async fn save_category_order_deletes_then_inserts_by_index() {
    let recorder = Arc::new(Recorder::ok());
    api(&recorder)
        .save_category_order(Some("tok"), 3, &["a", "b"])
        .await
        .unwrap();
    let ops = recorder.operations();
    assert_eq!(ops[0], Operation::DeleteCategoryOrder { user_id: 3 });
    let mut inserts = ops[1..].to_vec();
    inserts.sort_by_key(|op| match op {
        Operation::AddCategoryOrder { sort_order, .. } => *sort_order,
        _ => i64::MAX,
    });
    assert_eq!(
        inserts,
        vec![
            Operation::AddCategoryOrder { user_id: 3, category: "a".to_string(), sort_order: 0 },
            Operation::AddCategoryOrder { user_id: 3, category: "b".to_string(), sort_order: 1 },
        ]
    );
}

#[tokio::test]
async fn save_category_order_stops_when_delete_fails() {
    let recorder = Arc::new(Recorder::new(Protocol::Action, |op| match op {
        Operation::DeleteCategoryOrder { .. } => json!({"ok": false, "error": "locked"}),
        _ => json!({"ok": true}),
    }));
    let err = api(&recorder)
        .save_category_order(Some("tok"), 3, &["a"])
        .await
        .unwrap_err();
    assert_eq!(err.message(), "locked");
    assert_eq!(recorder.operations().len(), 1);
}

#[tokio::test]
async fn save_link_order_waits_for_every_update() {
    // The first update is the slow one, so returning early would be visible.
    let recorder = Arc::new(Recorder::ok().with_delay(|op| match op {
        Operation::UpdateLinkOrder { id: 10, .. } => Duration::from_millis(50),
        _ => Duration::from_millis(1),
    }));
    api(&recorder).save_link_order(Some("tok"), &[10, 20]).await.unwrap();
    assert_eq!(recorder.completed.load(Ordering::SeqCst), 2);

    let mut ops = recorder.operations();
    ops.sort_by_key(|op| match op {
        Operation::UpdateLinkOrder { id, .. } => *id,
        _ => i64::MAX,
    });
    assert_eq!(
        ops,
        vec![
            Operation::UpdateLinkOrder { sort_order: 0, id: 10 },
            Operation::UpdateLinkOrder { sort_order: 1, id: 20 },
        ]
    );
}

#[tokio::test]
async fn save_link_order_empty_sends_nothing() {
    let recorder = Arc::new(Recorder::ok());
    api(&recorder).save_link_order(Some("tok"), &[]).await.unwrap();
    assert!(recorder.operations().is_empty());
}

#[tokio::test]
async fn batch_failure_reports_first_error_after_all_settle() {
    let recorder = Arc::new(
        Recorder::new(Protocol::Action, |op| match op {
            Operation::UpdateLinkOrder { id: 2, .. } => json!({"ok": false, "error": "second"}),
            Operation::UpdateLinkOrder { id: 3, .. } => json!({"ok": false, "error": "third"}),
            _ => json!({"ok": true}),
        })
        .with_delay(|op| match op {
            Operation::UpdateLinkOrder { id: 2, .. } => Duration::from_millis(30),
            _ => Duration::from_millis(1),
        }),
    );
    let err = api(&recorder).save_link_order(Some("tok"), &[1, 2, 3]).await.unwrap_err();
    assert_eq!(err.message(), "second");
    assert_eq!(recorder.completed.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn save_settings_stringifies_values() {
    let recorder = Arc::new(Recorder::new(Protocol::Sql, |_| json!({"ok": true})));
    let settings = json!({"theme": "dark", "columns": 4.0, "compact": true, "tags": ["a", 1]});
    api(&recorder)
        .save_settings(Some("tok"), 9, settings.as_object().unwrap().clone())
        .await
        .unwrap();
    let mut ops = recorder.operations();
    ops.sort_by_key(|op| match op {
        Operation::SaveSetting { setting_key, .. } => setting_key.clone(),
        _ => String::new(),
    });
    assert_eq!(
        ops,
        vec![
            Operation::SaveSetting { user_id: 9, setting_key: "columns".to_string(), setting_value: "4".to_string() },
            Operation::SaveSetting { user_id: 9, setting_key: "compact".to_string(), setting_value: "true".to_string() },
            Operation::SaveSetting { user_id: 9, setting_key: "tags".to_string(), setting_value: "a,1".to_string() },
            Operation::SaveSetting { user_id: 9, setting_key: "theme".to_string(), setting_value: "dark".to_string() },
        ]
    );
}

// ---------------------------------------------------------------------------
// Link defaults and auth header
// ---------------------------------------------------------------------------

#[tokio::test]
async fn add_link_defaults_empty_fields() {
    let recorder = Arc::new(Recorder::ok());
    let link = NewLink {
        title: "Crates".to_string(),
        url: "https://crates.io".to_string(),
        category: None,
        note: Some(String::new()),
    };
    api(&recorder).add_link(Some("tok"), 1, &link).await.unwrap();
    let body = recorder.seen.lock().unwrap()[0].json_body().unwrap();
    assert_eq!(body["params"]["category"], "uncategorized");
    assert_eq!(body["params"]["note"], "");
}

#[tokio::test]
async fn authorization_header_follows_token() {
    let recorder = Arc::new(Recorder::ok());
    let api = api(&recorder);
    api.delete_link(Some("abc"), 1).await.unwrap();
    api.delete_link(Some(""), 1).await.unwrap();
    api.delete_link(None, 1).await.unwrap();

    let seen = recorder.seen.lock().unwrap();
    assert_eq!(seen[0].header("authorization"), Some("Bearer abc"));
    assert!(seen[1].header("authorization").is_none());
    assert!(seen[2].header("authorization").is_none());
}
