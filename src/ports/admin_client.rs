use std::{collections::BTreeMap, fmt};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::core::resource::{PluginPage, Resource, identifier};

/// Header map attached to admin requests.
pub type Headers = BTreeMap<String, String>;

/// Page size requested for every paginated plugin listing.
pub const PLUGIN_PAGE_SIZE: u32 = 100;

/// Custom error type for admin API operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AdminClientError {
    /// The admin API answered with a status outside the operation's success set
    #[error(
        "Error in calling {url}: {operation} ({method}) expected status {expected:?}, got {status}"
    )]
    UnexpectedStatus {
        /// Operation name, e.g. `createAPI`
        operation: &'static str,
        /// HTTP method used
        method: String,
        /// Full request URL
        url: String,
        /// Status returned by the server
        status: u16,
        /// Statuses the operation accepts
        expected: &'static [u16],
        /// Raw response body, for debugging
        body: String,
    },

    /// Error when connection to the admin API fails
    #[error("Connection error calling {url}: {message}")]
    Connection { url: String, message: String },

    /// Error when request times out
    #[error("Timeout calling {url}")]
    Timeout { url: String },

    /// Error when request is invalid
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Error when the response body does not have the expected shape
    #[error("Invalid response from {url}: {message}")]
    InvalidResponse { url: String, message: String },
}

/// Result type alias for admin API operations
pub type AdminResult<T> = Result<T, AdminClientError>;

/// A classified admin API response.
#[derive(Debug, Clone, PartialEq)]
pub struct AdminResponse<T = Value> {
    pub status: u16,
    pub url: String,
    pub body: T,
}

impl<T> AdminResponse<T> {
    pub fn is_found(&self) -> bool {
        self.status == 200
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }
}

impl AdminResponse<Value> {
    /// Interpret the body as a single resource object.
    pub fn into_resource(self) -> AdminResult<Resource> {
        Resource::try_from(self.body).map_err(|body| AdminClientError::InvalidResponse {
            url: self.url,
            message: format!("expected a JSON object, got {body}"),
        })
    }

    /// Server identifier carried in the body, if any.
    pub fn resource_id(&self) -> Option<String> {
        identifier(self.body.get("id"))
    }
}

/// Boundary within which plugin names are unique.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PluginScope {
    /// Gateway-wide plugins
    Root,
    /// Plugins attached to one API, addressed by its identifier or name
    Api(String),
}

impl PluginScope {
    pub fn is_root(&self) -> bool {
        matches!(self, PluginScope::Root)
    }

    pub fn api(&self) -> Option<&str> {
        match self {
            PluginScope::Root => None,
            PluginScope::Api(api) => Some(api),
        }
    }
}

impl fmt::Display for PluginScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginScope::Root => write!(f, "root"),
            PluginScope::Api(api) => write!(f, "api:{api}"),
        }
    }
}

/// Parameters of a plugin listing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginQuery {
    pub scope: PluginScope,
    pub name: Option<String>,
    pub size: Option<u32>,
    pub offset: Option<String>,
}

impl PluginQuery {
    /// One page of the full listing in `scope`.
    pub fn page(scope: PluginScope, offset: Option<String>) -> Self {
        Self {
            scope,
            name: None,
            size: Some(PLUGIN_PAGE_SIZE),
            offset,
        }
    }

    /// Query string pairs, only for the parameters that are set.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(name) = &self.name {
            pairs.push(("name".to_string(), name.clone()));
        }
        if let Some(size) = self.size {
            pairs.push(("size".to_string(), size.to_string()));
        }
        if let Some(offset) = &self.offset {
            pairs.push(("offset".to_string(), offset.clone()));
        }
        pairs
    }
}

/// AdminClient defines the port (interface) for talking to the Kong admin API.
///
/// Implementations must never fail for the statuses an operation declares as
/// expected (for example 404 on lookups and deletes); those are returned as
/// regular responses so callers can branch on them.
#[async_trait]
pub trait AdminClient: Send + Sync + 'static {
    /// Fetch one API by name, or list all APIs when `api_name` is `None`.
    ///
    /// Success statuses: 200, 404.
    async fn get_api(
        &self,
        api_name: Option<&str>,
        query: &[(String, String)],
        headers: &Headers,
    ) -> AdminResult<AdminResponse>;

    /// Create or update an API. Success statuses: 200, 201.
    async fn create_api(&self, body: &Resource, headers: &Headers) -> AdminResult<AdminResponse>;

    /// Delete an API by name or id. Success statuses: 204, 404.
    async fn delete_api(&self, api_name: &str, headers: &Headers) -> AdminResult<AdminResponse>;

    /// Fetch a single plugin by name. Success status: 200.
    async fn get_plugin(
        &self,
        scope: &PluginScope,
        plugin_name: &str,
        headers: &Headers,
    ) -> AdminResult<AdminResponse>;

    /// List one page of plugins. Success status: 200.
    async fn get_plugins(
        &self,
        query: &PluginQuery,
        headers: &Headers,
    ) -> AdminResult<AdminResponse<PluginPage>>;

    /// Create or update a plugin. Success statuses: 200, 201.
    async fn create_plugin(
        &self,
        scope: &PluginScope,
        body: &Resource,
        headers: &Headers,
    ) -> AdminResult<AdminResponse>;

    /// Delete a plugin by id. Success statuses: 204, 404.
    async fn delete_plugin(
        &self,
        scope: &PluginScope,
        plugin_id: &str,
        headers: &Headers,
    ) -> AdminResult<AdminResponse>;
}
