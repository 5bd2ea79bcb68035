//! Async API over a [`Transport`].
//!
//! Every method issues one request, except the composites
//! (`ensure_nav_user`, `save_category_order`, `save_link_order`,
//! `save_settings`) which chain or fan out several. None of them is a
//! backend transaction.

use futures::future::join_all;
use serde_json::Value;

use crate::client::NavClient;
use crate::config::ClientConfig;
use crate::envelope::{Envelope, REQUEST_FAILED};
use crate::error::ApiError;
use crate::operation::Operation;
use crate::transport::{ReqwestTransport, Transport};
use crate::types::{setting_value_string, CategoryOrder, Link, LinkUpdate, NavUser, NewLink, Setting, UploadFile};

/// Navigation API bound to a transport. Cheap to clone when `T` is, and
/// safe to share between tasks: it holds no credentials and no mutable
/// state.
#[derive(Debug, Clone)]
pub struct NavApi<T = ReqwestTransport> {
    client: NavClient,
    transport: T,
}

impl NavApi<ReqwestTransport> {
    pub fn new(config: ClientConfig) -> Self {
        Self::with_transport(config, ReqwestTransport::new())
    }
}

impl<T: Transport> NavApi<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self {
            client: NavClient::with_config(config),
            transport,
        }
    }

    pub fn client(&self) -> &NavClient {
        &self.client
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<Envelope, ApiError> {
        let request = self.client.build_login(username, password)?;
        self.client.parse_login(self.transport.send(request).await?)
    }

    pub async fn get_me(&self, token: Option<&str>) -> Result<Envelope, ApiError> {
        let request = self.client.build_me(token);
        self.client.parse_me(self.transport.send(request).await?)
    }

    /// Run one data operation over the configured protocol.
    pub async fn execute(&self, token: Option<&str>, op: Operation) -> Result<Envelope, ApiError> {
        tracing::debug!(
            operation = op.kind().action(),
            protocol = %self.client.protocol(),
            "executing operation"
        );
        let request = self.client.build_operation(&op, token)?;
        self.client.parse_operation(self.transport.send(request).await?)
    }

    /// Look up the user by name, creating it on first sight.
    ///
    /// Not atomic: two concurrent calls for a new username can both miss the
    /// lookup and both insert.
    pub async fn ensure_nav_user(&self, token: Option<&str>, username: &str) -> Result<i64, ApiError> {
        let lookup = || Operation::GetNavUser {
            username: username.to_string(),
        };
        let found: Vec<NavUser> = self.execute(token, lookup()).await?.rows()?;
        if let Some(user) = found.first() {
            return Ok(user.id);
        }

        tracing::debug!(username, "nav user missing, creating");
        self.execute(
            token,
            Operation::CreateNavUser {
                username: username.to_string(),
            },
        )
        .await?;

        let created: Vec<NavUser> = self.execute(token, lookup()).await?.rows()?;
        created
            .first()
            .map(|user| user.id)
            .ok_or_else(|| ApiError::request_failed(REQUEST_FAILED))
    }

    pub async fn get_links(&self, token: Option<&str>, user_id: i64) -> Result<Vec<Link>, ApiError> {
        self.execute(token, Operation::GetLinks { user_id }).await?.rows()
    }

    pub async fn get_category_order(&self, token: Option<&str>, user_id: i64) -> Result<Vec<CategoryOrder>, ApiError> {
        self.execute(token, Operation::GetCategoryOrder { user_id }).await?.rows()
    }

    /// Replace the user's category order: delete every row, then insert one
    /// row per category with `sortOrder` equal to its index.
    ///
    /// Readers running between the delete and the inserts see no order at
    /// all. An empty `categories` leaves the user with no rows.
    pub async fn save_category_order<S: AsRef<str>>(
        &self,
        token: Option<&str>,
        user_id: i64,
        categories: &[S],
    ) -> Result<(), ApiError> {
        self.execute(token, Operation::DeleteCategoryOrder { user_id }).await?;
        let inserts = categories.iter().enumerate().map(|(i, category)| Operation::AddCategoryOrder {
            user_id,
            category: category.as_ref().to_string(),
            sort_order: i as i64,
        });
        self.execute_all(token, inserts).await
    }

    /// Set `sortOrder` of each link to its index in `link_ids`.
    pub async fn save_link_order(&self, token: Option<&str>, link_ids: &[i64]) -> Result<(), ApiError> {
        let updates = link_ids.iter().enumerate().map(|(i, &id)| Operation::UpdateLinkOrder {
            sort_order: i as i64,
            id,
        });
        self.execute_all(token, updates).await
    }

    pub async fn add_link(&self, token: Option<&str>, user_id: i64, link: &NewLink) -> Result<Envelope, ApiError> {
        self.execute(token, self.client.add_link_operation(user_id, link)).await
    }

    pub async fn update_link(&self, token: Option<&str>, id: i64, link: &LinkUpdate) -> Result<Envelope, ApiError> {
        self.execute(token, self.client.update_link_operation(id, link)).await
    }

    pub async fn delete_link(&self, token: Option<&str>, id: i64) -> Result<Envelope, ApiError> {
        self.execute(token, Operation::DeleteLink { id }).await
    }

    pub async fn toggle_pin(&self, token: Option<&str>, id: i64, pinned: bool) -> Result<Envelope, ApiError> {
        self.execute(token, Operation::TogglePin { pinned, id }).await
    }

    pub async fn upload_file(&self, token: Option<&str>, file: &UploadFile) -> Result<Envelope, ApiError> {
        let request = self.client.build_upload(file, token);
        self.client.parse_upload(self.transport.send(request).await?)
    }

    pub async fn get_settings(&self, token: Option<&str>, user_id: i64) -> Result<Vec<Setting>, ApiError> {
        self.execute(token, Operation::GetSettings { user_id }).await?.rows()
    }

    /// Upsert every setting. Values are sent in string form; see
    /// [`setting_value_string`].
    pub async fn save_settings<I, K, V>(&self, token: Option<&str>, user_id: i64, settings: I) -> Result<(), ApiError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let upserts = settings.into_iter().map(|(key, value)| Operation::SaveSetting {
            user_id,
            setting_key: key.into(),
            setting_value: setting_value_string(&value.into()),
        });
        self.execute_all(token, upserts).await
    }

    /// Dispatch every operation concurrently and wait for all of them to
    /// settle. The first failure in input order is returned; writes that
    /// succeeded stay applied.
    async fn execute_all<I>(&self, token: Option<&str>, ops: I) -> Result<(), ApiError>
    where
        I: IntoIterator<Item = Operation>,
    {
        let results = join_all(ops.into_iter().map(|op| self.execute(token, op))).await;
        results.into_iter().try_for_each(|r| r.map(|_| ()))
    }
}
