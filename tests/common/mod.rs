// In-memory stand-in for the Kong admin API, shared by the integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use kong_reconciler::{
    AdminClient, AdminClientError, ApiDefinition, KongConfig, KongReconciler, PluginScope,
    Resource,
    core::PluginPage,
    ports::admin_client::{AdminResponse, AdminResult, Headers, PluginQuery},
};
use serde_json::{Value, json};

pub const ADMIN_URL: &str = "http://kong:8001";

#[derive(Default)]
struct State {
    apis: Vec<Resource>,
    plugins: Vec<Resource>,
    calls: Vec<String>,
    headers: Vec<Headers>,
    next_id: usize,
    failure: Option<(String, String)>,
}

/// Fake admin API with Kong-like semantics:
/// * `PUT` without an `id` creates, and conflicts (409) when the name is taken
/// * `PUT` with an `id` replaces the stored object
/// * listing plugins at the root returns every plugin, including API-owned ones
#[derive(Clone, Default)]
pub struct FakeKong {
    state: Arc<Mutex<State>>,
    page_size: Option<usize>,
}

impl FakeKong {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve plugin listings in pages of `size`, ignoring the requested size.
    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = Some(size);
        self
    }

    /// Fail the first `operation` call that targets `name` with a 500.
    pub fn fail_on(&self, operation: &str, name: &str) {
        self.state.lock().unwrap().failure = Some((operation.to_string(), name.to_string()));
    }

    pub fn seed_api(&self, api: Value) -> String {
        let mut state = self.state.lock().unwrap();
        let id = state.allocate("api");
        let api = Resource::try_from(api).unwrap().with("id", id.clone());
        state.apis.push(api);
        id
    }

    pub fn seed_plugin(&self, plugin: Value) -> String {
        let mut state = self.state.lock().unwrap();
        let id = state.allocate("plugin");
        let plugin = Resource::try_from(plugin).unwrap().with("id", id.clone());
        state.plugins.push(plugin);
        id
    }

    pub fn apis(&self) -> Vec<Resource> {
        self.state.lock().unwrap().apis.clone()
    }

    pub fn plugins(&self) -> Vec<Resource> {
        self.state.lock().unwrap().plugins.clone()
    }

    pub fn api_named(&self, name: &str) -> Option<Resource> {
        self.apis().into_iter().find(|api| api.name() == Some(name))
    }

    pub fn plugin_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .plugins()
            .iter()
            .filter_map(|p| p.name().map(str::to_owned))
            .collect();
        names.sort();
        names
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Headers received by every API lookup, API delete and plugin listing, in order.
    pub fn seen_headers(&self) -> Vec<Headers> {
        self.state.lock().unwrap().headers.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn calls_starting_with(&self, prefix: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| call.starts_with(prefix))
            .collect()
    }

    pub fn reconciler(&self, config: KongConfig) -> KongReconciler {
        KongReconciler::new(config, Arc::new(self.clone())).unwrap()
    }
}

impl State {
    fn allocate(&mut self, kind: &str) -> String {
        self.next_id += 1;
        format!("{kind}-{}", self.next_id)
    }

    fn check_failure(&mut self, operation: &'static str, name: &str) -> AdminResult<()> {
        let matches = self
            .failure
            .as_ref()
            .is_some_and(|(op, target)| op == operation && target == name);
        if matches {
            self.failure = None;
            return Err(unexpected(operation, "PUT", name, 500, &[200, 201]));
        }
        Ok(())
    }

    fn find_api(&self, key: &str) -> Option<usize> {
        self.apis
            .iter()
            .position(|api| api.name() == Some(key) || api.id().as_deref() == Some(key))
    }

    /// Owning API id for a scope; `None` for root. Unknown APIs resolve to the key itself.
    fn scope_api_id(&self, scope: &PluginScope) -> Option<String> {
        scope.api().map(|key| {
            self.find_api(key)
                .and_then(|i| self.apis[i].id())
                .unwrap_or_else(|| key.to_string())
        })
    }

    fn plugins_in_scope(&self, scope: &PluginScope) -> Vec<Resource> {
        match self.scope_api_id(scope) {
            None => self.plugins.clone(),
            Some(api_id) => self
                .plugins
                .iter()
                .filter(|p| p.get("api_id").and_then(Value::as_str) == Some(api_id.as_str()))
                .cloned()
                .collect(),
        }
    }
}

fn unexpected(
    operation: &'static str,
    method: &str,
    target: &str,
    status: u16,
    expected: &'static [u16],
) -> AdminClientError {
    AdminClientError::UnexpectedStatus {
        operation,
        method: method.to_string(),
        url: format!("{ADMIN_URL}/{target}"),
        status,
        expected,
        body: String::new(),
    }
}

fn response(status: u16, url: String, body: Value) -> AdminResponse {
    AdminResponse { status, url, body }
}

#[async_trait]
impl AdminClient for FakeKong {
    async fn get_api(
        &self,
        api_name: Option<&str>,
        query: &[(String, String)],
        headers: &Headers,
    ) -> AdminResult<AdminResponse> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(format!("getAPI {}", api_name.unwrap_or("*")));
        state.headers.push(headers.clone());
        let url = format!("{ADMIN_URL}/apis");

        match api_name {
            Some(name) => match state.find_api(name) {
                Some(i) => Ok(response(200, url, state.apis[i].clone().into())),
                None => Ok(response(404, url, json!({"message": "Not found"}))),
            },
            None => {
                let data: Vec<Value> = state
                    .apis
                    .iter()
                    .filter(|api| {
                        query
                            .iter()
                            .all(|(k, v)| api.get(k).and_then(Value::as_str) == Some(v.as_str()))
                    })
                    .cloned()
                    .map(Value::from)
                    .collect();
                Ok(response(200, url, json!({"total": data.len(), "data": data})))
            }
        }
    }

    async fn create_api(&self, body: &Resource, _headers: &Headers) -> AdminResult<AdminResponse> {
        let mut state = self.state.lock().unwrap();
        let name = body.name().unwrap_or_default().to_string();
        state.calls.push(format!("createAPI {name}"));
        state.check_failure("createAPI", &name)?;
        let url = format!("{ADMIN_URL}/apis");

        if let Some(id) = body.id() {
            if let Some(i) = state.find_api(&id) {
                state.apis[i] = body.clone();
                return Ok(response(200, url, body.clone().into()));
            }
        } else if state.find_api(&name).is_some() {
            return Err(unexpected("createAPI", "PUT", "apis", 409, &[200, 201]));
        }

        let id = match body.id() {
            Some(id) => id,
            None => state.allocate("api"),
        };
        let created = body.clone().with("id", id);
        state.apis.push(created.clone());
        Ok(response(201, url, created.into()))
    }

    async fn delete_api(&self, api_name: &str, headers: &Headers) -> AdminResult<AdminResponse> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("deleteAPI {api_name}"));
        state.headers.push(headers.clone());
        state.check_failure("deleteAPI", api_name)?;
        let url = format!("{ADMIN_URL}/apis/{api_name}");

        match state.find_api(api_name) {
            Some(i) => {
                let removed = state.apis.remove(i);
                let removed_id = removed.id();
                state.plugins.retain(|p| {
                    p.get("api_id").and_then(Value::as_str) != removed_id.as_deref()
                });
                Ok(response(204, url, Value::Null))
            }
            None => Ok(response(404, url, json!({"message": "Not found"}))),
        }
    }

    async fn get_plugin(
        &self,
        scope: &PluginScope,
        plugin_name: &str,
        _headers: &Headers,
    ) -> AdminResult<AdminResponse> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("getPlugin {scope} {plugin_name}"));
        let found = state
            .plugins_in_scope(scope)
            .into_iter()
            .find(|p| p.name() == Some(plugin_name));

        match found {
            Some(plugin) => Ok(response(200, format!("{ADMIN_URL}/plugins"), plugin.into())),
            None => Err(unexpected("getPlugin", "GET", "plugins", 404, &[200])),
        }
    }

    async fn get_plugins(
        &self,
        query: &PluginQuery,
        headers: &Headers,
    ) -> AdminResult<AdminResponse<PluginPage>> {
        let mut state = self.state.lock().unwrap();
        state.headers.push(headers.clone());
        state.calls.push(format!(
            "getPlugins {} name={} offset={}",
            query.scope,
            query.name.as_deref().unwrap_or("-"),
            query.offset.as_deref().unwrap_or("-")
        ));

        let matching: Vec<Resource> = state
            .plugins_in_scope(&query.scope)
            .into_iter()
            .filter(|p| query.name.is_none() || p.name() == query.name.as_deref())
            .collect();

        let start = query
            .offset
            .as_deref()
            .and_then(|o| o.trim_start_matches('o').parse::<usize>().ok())
            .unwrap_or(0);
        let size = self
            .page_size
            .or(query.size.map(|s| s as usize))
            .unwrap_or(matching.len().max(1));
        let end = (start + size).min(matching.len());
        let data = matching.get(start..end).map(<[Resource]>::to_vec).unwrap_or_default();
        let offset = (end < matching.len()).then(|| format!("o{end}"));

        Ok(AdminResponse {
            status: 200,
            url: format!("{ADMIN_URL}/plugins"),
            body: PluginPage::new(data, offset),
        })
    }

    async fn create_plugin(
        &self,
        scope: &PluginScope,
        body: &Resource,
        _headers: &Headers,
    ) -> AdminResult<AdminResponse> {
        let mut state = self.state.lock().unwrap();
        let name = body.name().unwrap_or_default().to_string();
        state.calls.push(format!("createPlugin {scope} {name}"));
        state.check_failure("createPlugin", &name)?;
        let url = format!("{ADMIN_URL}/plugins");

        let mut stored = body.clone();
        if let Some(api_id) = state.scope_api_id(scope) {
            stored = stored.with("api_id", api_id);
        }

        if let Some(id) = body.id() {
            if let Some(i) = state.plugins.iter().position(|p| p.id() == Some(id.clone())) {
                state.plugins[i] = stored.clone();
                return Ok(response(200, url, stored.into()));
            }
        } else if state
            .plugins_in_scope(scope)
            .iter()
            .any(|p| p.name() == Some(name.as_str()) && (!scope.is_root() || p.owning_api().is_none()))
        {
            return Err(unexpected("createPlugin", "PUT", "plugins", 409, &[200, 201]));
        }

        if stored.id().is_none() {
            let id = state.allocate("plugin");
            stored = stored.with("id", id);
        }
        state.plugins.push(stored.clone());
        Ok(response(201, url, stored.into()))
    }

    async fn delete_plugin(
        &self,
        scope: &PluginScope,
        plugin_id: &str,
        _headers: &Headers,
    ) -> AdminResult<AdminResponse> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("deletePlugin {scope} {plugin_id}"));
        let url = format!("{ADMIN_URL}/plugins/{plugin_id}");

        let in_scope = state
            .plugins_in_scope(scope)
            .iter()
            .any(|p| p.id().as_deref() == Some(plugin_id));
        if !in_scope {
            return Ok(response(404, url, json!({"message": "Not found"})));
        }

        state.plugins.retain(|p| p.id().as_deref() != Some(plugin_id));
        Ok(response(204, url, Value::Null))
    }
}

pub fn plugin(value: Value) -> Resource {
    Resource::try_from(value).unwrap()
}

pub fn api(value: Value) -> ApiDefinition {
    serde_json::from_value(value).unwrap()
}
