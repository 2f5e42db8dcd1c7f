use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    Client, Method,
    header::{self, HeaderMap, HeaderName, HeaderValue},
};
use serde_json::{Map, Value, json};
use tracing::Instrument;

use crate::{
    config::models::ClientSettings,
    core::{
        masking::FieldMasker,
        resource::{PluginPage, Resource},
    },
    ports::admin_client::{
        AdminClient, AdminClientError, AdminResponse, AdminResult, Headers, PluginQuery,
        PluginScope,
    },
};

const GET_API_STATUSES: &[u16] = &[200, 404];
const UPSERT_STATUSES: &[u16] = &[200, 201];
const DELETE_STATUSES: &[u16] = &[204, 404];
const GET_PLUGIN_STATUSES: &[u16] = &[200];

/// Kong admin API adapter using reqwest.
///
/// Responsibilities:
/// * Builds admin URLs (`/apis`, `/apis/{api}/plugins`, `/plugins`) from one base URL
/// * Logs every outgoing request with sensitive fields masked
/// * Classifies responses against each operation's expected statuses
///
/// No retries or back-off happen here; the first unexpected status is returned
/// as an error.
pub struct HttpAdminClient {
    client: Client,
    base_url: String,
    masker: FieldMasker,
}

struct AdminRequest<'a> {
    operation: &'static str,
    method: Method,
    url: String,
    query: &'a [(String, String)],
    body: Option<&'a Resource>,
    headers: &'a Headers,
    expected: &'static [u16],
}

impl HttpAdminClient {
    /// Create a new admin client bound to `base_url`.
    pub fn new(base_url: &str, settings: &ClientSettings, masker: FieldMasker) -> AdminResult<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .user_agent(settings.user_agent.clone())
            .default_headers(default_headers)
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .build()
            .map_err(|e| {
                AdminClientError::InvalidRequest(format!("Failed to build HTTP client: {e}"))
            })?;

        let base_url = base_url.trim_end_matches('/').to_string();
        tracing::info!("Created Kong admin client for {}", base_url);

        Ok(Self {
            client,
            base_url,
            masker,
        })
    }

    fn apis_url(&self, api: Option<&str>) -> String {
        match api {
            Some(api) => format!("{}/apis/{}", self.base_url, urlencoding::encode(api)),
            None => format!("{}/apis", self.base_url),
        }
    }

    fn plugins_url(&self, scope: &PluginScope) -> String {
        match scope {
            PluginScope::Root => format!("{}/plugins", self.base_url),
            PluginScope::Api(api) => format!("{}/plugins", self.apis_url(Some(api))),
        }
    }

    fn plugin_url(&self, scope: &PluginScope, plugin: &str) -> String {
        format!(
            "{}/{}",
            self.plugins_url(scope),
            urlencoding::encode(plugin)
        )
    }

    /// Loggable view of a request with every deny-listed key masked.
    fn diagnostic_record(&self, req: &AdminRequest<'_>) -> Value {
        let mut record = Map::new();
        record.insert("method".to_string(), json!(req.method.as_str()));
        record.insert("uri".to_string(), json!(req.url));
        record.insert("headers".to_string(), json!(req.headers));
        if !req.query.is_empty() {
            let qs: Map<String, Value> = req
                .query
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect();
            record.insert("qs".to_string(), Value::Object(qs));
        }
        if let Some(body) = req.body {
            record.insert("body".to_string(), Value::from(body.clone()));
        }

        self.masker.mask(&json!({ "req": record }))
    }

    async fn send(&self, req: AdminRequest<'_>) -> AdminResult<AdminResponse> {
        let span = tracing::info_span!(
            "admin_request",
            operation = req.operation,
            http.method = %req.method,
            http.url = %req.url,
            http.status_code = tracing::field::Empty,
        );
        self.dispatch(req).instrument(span).await
    }

    async fn dispatch(&self, req: AdminRequest<'_>) -> AdminResult<AdminResponse> {
        tracing::info!(
            operation = req.operation,
            request = %self.diagnostic_record(&req),
            "{}",
            req.operation
        );

        let mut builder = self
            .client
            .request(req.method.clone(), &req.url)
            .headers(header_map(req.headers)?);
        if !req.query.is_empty() {
            builder = builder.query(req.query);
        }
        if let Some(body) = req.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| classify_error(e, &req.url))?;
        let status = response.status().as_u16();
        tracing::Span::current().record("http.status_code", status);

        let text = response
            .text()
            .await
            .map_err(|e| classify_error(e, &req.url))?;

        if !req.expected.contains(&status) {
            tracing::error!(
                "Error during operation, expected status {:?}, got: {}",
                req.expected,
                status
            );
            tracing::error!("Error body: {}", self.masker.mask(&parse_body(&text)));
            return Err(AdminClientError::UnexpectedStatus {
                operation: req.operation,
                method: req.method.to_string(),
                url: req.url,
                status,
                expected: req.expected,
                body: text,
            });
        }

        Ok(AdminResponse {
            status,
            url: req.url,
            body: parse_body(&text),
        })
    }
}

#[async_trait]
impl AdminClient for HttpAdminClient {
    async fn get_api(
        &self,
        api_name: Option<&str>,
        query: &[(String, String)],
        headers: &Headers,
    ) -> AdminResult<AdminResponse> {
        self.send(AdminRequest {
            operation: "getAPI",
            method: Method::GET,
            url: self.apis_url(api_name),
            query,
            body: None,
            headers,
            expected: GET_API_STATUSES,
        })
        .await
    }

    async fn create_api(&self, body: &Resource, headers: &Headers) -> AdminResult<AdminResponse> {
        self.send(AdminRequest {
            operation: "createAPI",
            method: Method::PUT,
            url: self.apis_url(None),
            query: &[],
            body: Some(body),
            headers,
            expected: UPSERT_STATUSES,
        })
        .await
    }

    async fn delete_api(&self, api_name: &str, headers: &Headers) -> AdminResult<AdminResponse> {
        self.send(AdminRequest {
            operation: "deleteAPI",
            method: Method::DELETE,
            url: self.apis_url(Some(api_name)),
            query: &[],
            body: None,
            headers,
            expected: DELETE_STATUSES,
        })
        .await
    }

    async fn get_plugin(
        &self,
        scope: &PluginScope,
        plugin_name: &str,
        headers: &Headers,
    ) -> AdminResult<AdminResponse> {
        self.send(AdminRequest {
            operation: "getPlugin",
            method: Method::GET,
            url: self.plugin_url(scope, plugin_name),
            query: &[],
            body: None,
            headers,
            expected: GET_PLUGIN_STATUSES,
        })
        .await
    }

    async fn get_plugins(
        &self,
        query: &PluginQuery,
        headers: &Headers,
    ) -> AdminResult<AdminResponse<PluginPage>> {
        let pairs = query.query_pairs();
        let response = self
            .send(AdminRequest {
                operation: "getPlugins",
                method: Method::GET,
                url: self.plugins_url(&query.scope),
                query: &pairs,
                body: None,
                headers,
                expected: GET_PLUGIN_STATUSES,
            })
            .await?;

        let page = serde_json::from_value::<PluginPage>(response.body).map_err(|e| {
            AdminClientError::InvalidResponse {
                url: response.url.clone(),
                message: format!("Failed to parse plugin page: {e}"),
            }
        })?;

        Ok(AdminResponse {
            status: response.status,
            url: response.url,
            body: page,
        })
    }

    async fn create_plugin(
        &self,
        scope: &PluginScope,
        body: &Resource,
        headers: &Headers,
    ) -> AdminResult<AdminResponse> {
        self.send(AdminRequest {
            operation: "createPlugin",
            method: Method::PUT,
            url: self.plugins_url(scope),
            query: &[],
            body: Some(body),
            headers,
            expected: UPSERT_STATUSES,
        })
        .await
    }

    async fn delete_plugin(
        &self,
        scope: &PluginScope,
        plugin_id: &str,
        headers: &Headers,
    ) -> AdminResult<AdminResponse> {
        self.send(AdminRequest {
            operation: "deletePlugin",
            method: Method::DELETE,
            url: self.plugin_url(scope, plugin_id),
            query: &[],
            body: None,
            headers,
            expected: DELETE_STATUSES,
        })
        .await
    }
}

fn header_map(headers: &Headers) -> AdminResult<HeaderMap> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            AdminClientError::InvalidRequest(format!("Invalid header name '{name}': {e}"))
        })?;
        let header_value = HeaderValue::from_str(value).map_err(|e| {
            AdminClientError::InvalidRequest(format!("Invalid value for header '{name}': {e}"))
        })?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}

/// Empty bodies become `null`; anything that is not JSON is kept as a string.
fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

fn classify_error(err: reqwest::Error, url: &str) -> AdminClientError {
    if err.is_timeout() {
        AdminClientError::Timeout {
            url: url.to_string(),
        }
    } else if err.is_builder() {
        AdminClientError::InvalidRequest(err.to_string())
    } else {
        AdminClientError::Connection {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}
