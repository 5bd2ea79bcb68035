//! Client configuration.
//!
//! Settings come from the environment (`NAV_BASE_URL`, `NAV_PROTOCOL`,
//! `NAV_DEFAULT_CATEGORY`) or are built directly. The bearer token is
//! deliberately absent: it is passed to every call.

use thiserror::Error;

use crate::protocol::Protocol;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:3000";
/// Category assigned to links saved without one.
pub const DEFAULT_CATEGORY: &str = "uncategorized";

pub const ENV_BASE_URL: &str = "NAV_BASE_URL";
pub const ENV_PROTOCOL: &str = "NAV_PROTOCOL";
pub const ENV_DEFAULT_CATEGORY: &str = "NAV_DEFAULT_CATEGORY";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("NAV_PROTOCOL: {0}")]
    Protocol(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub protocol: Protocol,
    pub default_category: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            protocol: Protocol::default(),
            default_category: DEFAULT_CATEGORY.to_string(),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self::default().with_base_url(base_url)
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn with_default_category(mut self, category: impl Into<String>) -> Self {
        self.default_category = category.into();
        self
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unset or blank keys keep their
    /// defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();
        if let Some(url) = get(ENV_BASE_URL) {
            config = config.with_base_url(url.trim());
        }
        if let Some(protocol) = get(ENV_PROTOCOL) {
            config.protocol = protocol.parse().map_err(ConfigError::Protocol)?;
        }
        if let Some(category) = get(ENV_DEFAULT_CATEGORY) {
            config.default_category = category;
        }
        Ok(config)
    }
}
