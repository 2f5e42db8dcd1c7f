//! Configuration data structures for the reconciler.
//!
//! These types map directly to YAML (also JSON / TOML) configuration files. They
//! are serde-friendly and include defaults so that minimal configs stay concise:
//! only `admin_url` is required.
use serde::{Deserialize, Serialize};

use crate::{
    core::resource::{ApiDefinition, Resource},
    ports::admin_client::Headers,
};

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_user_agent() -> String {
    format!("kong-reconciler/{}", env!("CARGO_PKG_VERSION"))
}

/// Desired Kong state plus the settings needed to reach the admin API.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct KongConfig {
    /// Base URL of the Kong admin API (e.g. `http://kong:8001`)
    #[serde(default, alias = "kong_admin_api_url")]
    pub admin_url: Option<String>,
    /// APIs to create or update, in order
    #[serde(default)]
    pub apis: Vec<ApiDefinition>,
    /// Gateway-wide plugins
    #[serde(default)]
    pub root_plugins: Vec<Resource>,
    /// Static headers sent with every admin request
    #[serde(default)]
    pub headers: Headers,
    /// Extra keys to redact from logged requests, on top of `authorization`
    #[serde(default)]
    pub masking_fields: Vec<String>,
    #[serde(default)]
    pub client: ClientSettings,
}

impl KongConfig {
    pub fn new(admin_url: impl Into<String>) -> Self {
        Self {
            admin_url: Some(admin_url.into()),
            ..Default::default()
        }
    }

    pub fn with_apis(mut self, apis: Vec<ApiDefinition>) -> Self {
        self.apis = apis;
        self
    }

    pub fn with_root_plugins(mut self, plugins: Vec<Resource>) -> Self {
        self.root_plugins = plugins;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// HTTP client tuning for the admin adapter.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}
