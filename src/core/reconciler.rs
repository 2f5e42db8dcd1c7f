//! Desired-state reconciliation against a Kong admin API.
//!
//! `KongReconciler` owns an immutable [`KongConfig`] and an [`AdminClient`].
//! It provides:
//! * `create_configurations`: upsert every desired API with its plugins, then
//!   the root plugins, deleting plugins that are no longer desired
//! * `get_apis` / `remove_apis`: read-only lookup and removal of APIs
//! * `get_plugins_of_api`: paginated listing of one API's plugins
//!
//! Every admin call is awaited before the next one starts, so server load and
//! log ordering are deterministic. The first failing call aborts the whole
//! operation; work already applied stays applied, and re-running is safe
//! because upserts are keyed by name.
use std::{collections::HashSet, ops::AddAssign, pin::pin, sync::Arc};

use futures_util::TryStreamExt;
use serde::Serialize;
use serde_json::Value;
use tracing::Instrument;

use crate::{
    adapters::admin_http::HttpAdminClient,
    config::{models::KongConfig, validation::KongConfigValidator},
    core::{
        error::KongResult,
        masking::FieldMasker,
        pagination::{collect_plugins, named_plugin_pages, plugin_pages},
        resource::{ApiDefinition, Resource},
    },
    ports::admin_client::{AdminClient, Headers, PluginScope},
};

/// Counters describing what a reconciliation run changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    pub apis_upserted: usize,
    pub plugins_upserted: usize,
    pub plugins_deleted: usize,
    /// Stale plugins that were already gone when deleted
    pub plugins_absent: usize,
    /// Desired entries skipped for lacking a name (or stale plugins lacking an id)
    pub skipped: usize,
}

impl AddAssign for ReconcileSummary {
    fn add_assign(&mut self, other: Self) {
        self.apis_upserted += other.apis_upserted;
        self.plugins_upserted += other.plugins_upserted;
        self.plugins_deleted += other.plugins_deleted;
        self.plugins_absent += other.plugins_absent;
        self.skipped += other.skipped;
    }
}

/// Outcome of [`KongReconciler::remove_apis`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RemovalSummary {
    pub removed: usize,
    /// APIs the server reported as already absent
    pub absent: usize,
    pub skipped: usize,
}

/// Per-call options for [`KongReconciler::get_apis`].
#[derive(Debug, Clone, Default)]
pub struct GetApisOptions {
    /// Query string used when listing every API
    pub query_params: Vec<(String, String)>,
    /// Headers overriding the configured static headers
    pub headers: Headers,
}

/// Result of [`KongReconciler::get_apis`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ApiLookup {
    /// The server's full listing body, as returned
    Listing(Value),
    /// The requested APIs that exist, in request order
    Found(Vec<Resource>),
}

/// Reconciles a desired Kong configuration against the admin API.
pub struct KongReconciler {
    admin_url: String,
    config: Arc<KongConfig>,
    client: Arc<dyn AdminClient>,
}

impl KongReconciler {
    /// Create a reconciler using the given admin client.
    ///
    /// Fails with a configuration error, before any request is made, when the
    /// admin URL is missing or unusable.
    pub fn new(config: KongConfig, client: Arc<dyn AdminClient>) -> KongResult<Self> {
        let admin_url = normalized_admin_url(&config)?;
        Ok(Self {
            admin_url,
            config: Arc::new(config),
            client,
        })
    }

    /// Create a reconciler talking HTTP to the configured admin URL.
    pub fn connect(config: KongConfig) -> KongResult<Self> {
        let admin_url = normalized_admin_url(&config)?;
        let masker = FieldMasker::new(&config.masking_fields);
        let client = HttpAdminClient::new(&admin_url, &config.client, masker)?;
        Self::new(config, Arc::new(client))
    }

    pub fn admin_url(&self) -> &str {
        &self.admin_url
    }

    pub fn config(&self) -> &KongConfig {
        &self.config
    }

    /// A reconciler sharing this one's client whose requests carry `overrides`
    /// on top of the configured static headers.
    ///
    /// Every operation on the returned value uses the merged headers, which is
    /// how per-call headers reach `create_configurations`, `remove_apis` and the
    /// plugin listings.
    pub fn with_header_overrides(&self, overrides: &Headers) -> Self {
        let mut config = (*self.config).clone();
        config.headers = self.headers_with(overrides);
        Self {
            admin_url: self.admin_url.clone(),
            config: Arc::new(config),
            client: Arc::clone(&self.client),
        }
    }

    /// Apply the whole desired configuration: APIs (with their plugins) first,
    /// then root plugins. Empty lists are left alone.
    pub async fn create_configurations(&self) -> KongResult<ReconcileSummary> {
        let span = tracing::info_span!("create_configurations", admin_url = %self.admin_url);

        async {
            tracing::info!(
                "Starting Kong configuration, kong admin url: {}",
                self.admin_url
            );

            match self.apply_desired_state().await {
                Ok(summary) => {
                    tracing::info!(?summary, "Successfully completed configuration");
                    Ok(summary)
                }
                Err(e) => {
                    tracing::error!(error = %e, "Error during configuration creation");
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn apply_desired_state(&self) -> KongResult<ReconcileSummary> {
        let mut summary = ReconcileSummary::default();

        if !self.config.apis.is_empty() {
            summary += self.reconcile_apis(&self.config.apis).await?;
        }

        if !self.config.root_plugins.is_empty() {
            summary += self
                .reconcile_plugins(&self.config.root_plugins, &PluginScope::Root)
                .await?;
        }

        Ok(summary)
    }

    /// Upsert each API in order, then reconcile the plugins it carries.
    ///
    /// An API that carries a plugin list, even an empty one, has its plugins
    /// reconciled; an API without a `plugins` key keeps whatever plugins it has.
    pub async fn reconcile_apis(&self, apis: &[ApiDefinition]) -> KongResult<ReconcileSummary> {
        tracing::info!("Setting up apis, {} in total", apis.len());

        let headers = &self.config.headers;
        let mut summary = ReconcileSummary::default();

        for (index, api) in apis.iter().enumerate() {
            let (mut body, plugins) = api.clone().into_parts();

            let Some(name) = body.name().map(str::to_owned) else {
                tracing::info!(
                    "Skipping api {} out of {} since no api name was found",
                    index + 1,
                    apis.len()
                );
                summary.skipped += 1;
                continue;
            };

            tracing::info!(
                "Setting up api: {}, {} out of {} apis",
                name,
                index + 1,
                apis.len()
            );

            let existing = self.client.get_api(Some(&name), &[], headers).await?;
            if existing.is_found() {
                tracing::info!("api: {} already exists, updating its configuration", name);
                body = body.with_defaults_from(&existing.into_resource()?);
            }

            let response = self.client.create_api(&body, headers).await?;
            let api_id = response.resource_id();
            tracing::info!(
                "Configuration for api: {} set up successfully: {}",
                name,
                api_id.as_deref().unwrap_or("<no id>")
            );
            summary.apis_upserted += 1;

            if let Some(plugins) = plugins {
                let scope = PluginScope::Api(api_id.unwrap_or(name));
                summary += self.reconcile_plugins(&plugins, &scope).await?;
            }
        }

        Ok(summary)
    }

    /// Make the plugins in `scope` match `plugins` exactly.
    ///
    /// The stale set is computed first, then every desired plugin is upserted,
    /// and only then are stale plugins deleted.
    pub async fn reconcile_plugins(
        &self,
        plugins: &[Resource],
        scope: &PluginScope,
    ) -> KongResult<ReconcileSummary> {
        let span = tracing::info_span!("reconcile_plugins", scope = %scope);
        self.sync_plugins(plugins, scope).instrument(span).await
    }

    async fn sync_plugins(
        &self,
        plugins: &[Resource],
        scope: &PluginScope,
    ) -> KongResult<ReconcileSummary> {
        tracing::info!("Setting up plugins in {}, {} in total", scope, plugins.len());

        let headers = &self.config.headers;
        let stale = self.plugins_to_delete(plugins, scope).await?;
        let mut summary = ReconcileSummary::default();

        for (index, plugin) in plugins.iter().enumerate() {
            let Some(name) = plugin.name() else {
                tracing::info!(
                    "Skipping plugin {} out of {} since no plugin name was found",
                    index + 1,
                    plugins.len()
                );
                summary.skipped += 1;
                continue;
            };

            tracing::info!(
                "Setting up plugin: {}, {} out of {} plugins",
                name,
                index + 1,
                plugins.len()
            );

            let body = match self.find_plugin(name, scope).await? {
                Some(existing) => {
                    tracing::info!("Plugin: {} already exists, updating its configuration", name);
                    plugin.clone().with_defaults_from(&existing)
                }
                None => {
                    tracing::info!("Plugin: {} does not exist, creating it", name);
                    plugin.clone()
                }
            };

            let response = self.client.create_plugin(scope, &body, headers).await?;
            tracing::info!(
                "Configuration for plugin: {} set up successfully: {}",
                name,
                response.resource_id().as_deref().unwrap_or("<no id>")
            );
            summary.plugins_upserted += 1;
        }

        if !stale.is_empty() {
            summary += self.remove_plugins(&stale, scope).await?;
        }

        Ok(summary)
    }

    /// Plugins present in `scope` whose name no desired plugin uses.
    ///
    /// Listing the root scope returns every plugin on the gateway, so in that
    /// scope plugins owned by an API are never candidates.
    pub async fn plugins_to_delete(
        &self,
        desired: &[Resource],
        scope: &PluginScope,
    ) -> KongResult<Vec<Resource>> {
        let desired_names: HashSet<&str> = desired.iter().filter_map(Resource::name).collect();
        let mut stale = Vec::new();

        let mut pages = pin!(plugin_pages(&*self.client, scope, &self.config.headers));
        while let Some(page) = pages.try_next().await? {
            stale.extend(page.into_iter().filter(|existing| {
                let in_scope = !scope.is_root() || existing.owning_api().is_none();
                let wanted = existing
                    .name()
                    .is_some_and(|name| desired_names.contains(name));
                in_scope && !wanted
            }));
        }

        tracing::debug!("{} stale plugins found in {}", stale.len(), scope);
        Ok(stale)
    }

    /// First plugin named `name` in `scope`, if any.
    ///
    /// In root scope the server also returns API-owned plugins of that name,
    /// which may fill whole pages, so pages are read until a root match turns up.
    async fn find_plugin(&self, name: &str, scope: &PluginScope) -> KongResult<Option<Resource>> {
        let mut pages = pin!(named_plugin_pages(
            &*self.client,
            scope,
            name,
            &self.config.headers
        ));

        while let Some(page) = pages.try_next().await? {
            let found = page.into_iter().find(|existing| {
                existing.name() == Some(name)
                    && (!scope.is_root() || existing.owning_api().is_none())
            });
            if found.is_some() {
                return Ok(found);
            }
        }

        Ok(None)
    }

    /// Delete `plugins` from `scope` by id. Plugins already gone are not an error.
    pub async fn remove_plugins(
        &self,
        plugins: &[Resource],
        scope: &PluginScope,
    ) -> KongResult<ReconcileSummary> {
        tracing::info!(
            "Removing plugins from {}, {} in total",
            scope,
            plugins.len()
        );

        let mut summary = ReconcileSummary::default();

        for (index, plugin) in plugins.iter().enumerate() {
            let name = plugin.name().unwrap_or("<unnamed>");
            let Some(id) = plugin.id() else {
                tracing::info!("Skipping removal of plugin: {} since it has no id", name);
                summary.skipped += 1;
                continue;
            };

            tracing::info!(
                "Removing plugin: {}, {} out of {} plugins",
                name,
                index + 1,
                plugins.len()
            );

            let response = self
                .client
                .delete_plugin(scope, &id, &self.config.headers)
                .await?;

            if response.is_not_found() {
                tracing::info!("Plugin {} not found. Skipping it.", name);
                summary.plugins_absent += 1;
            } else {
                tracing::info!("Removed plugin: {} from {}", name, scope);
                summary.plugins_deleted += 1;
            }
        }

        Ok(summary)
    }

    /// Every plugin attached to `api` (name or id), across all pages.
    pub async fn get_plugins_of_api(&self, api: &str) -> KongResult<Vec<Resource>> {
        let scope = PluginScope::Api(api.to_string());
        Ok(collect_plugins(&*self.client, &scope, &self.config.headers).await?)
    }

    /// Look up APIs.
    ///
    /// With no `apis`, returns the server's full listing (narrowed by
    /// `options.query_params`). Otherwise looks up each named API and returns the
    /// ones that exist, in order; unnamed entries are skipped.
    pub async fn get_apis(
        &self,
        apis: &[ApiDefinition],
        options: &GetApisOptions,
    ) -> KongResult<ApiLookup> {
        let headers = self.headers_with(&options.headers);

        if apis.is_empty() {
            let response = self
                .client
                .get_api(None, &options.query_params, &headers)
                .await?;

            let listing = if response.is_found() {
                response.body
            } else {
                Value::Array(Vec::new())
            };
            return Ok(ApiLookup::Listing(listing));
        }

        let mut found = Vec::new();
        for (index, api) in apis.iter().enumerate() {
            let Some(name) = api.name() else {
                tracing::info!(
                    "Skipping api {} out of {} since no api name was found",
                    index + 1,
                    apis.len()
                );
                continue;
            };

            tracing::info!(
                "Getting api: {}, {} out of {} apis",
                name,
                index + 1,
                apis.len()
            );

            let response = self.client.get_api(Some(name), &[], &headers).await?;
            if response.is_found() {
                found.push(response.into_resource()?);
            }
        }

        Ok(ApiLookup::Found(found))
    }

    /// Delete each named API in order. APIs already gone count as `absent`.
    pub async fn remove_apis(&self, apis: &[ApiDefinition]) -> KongResult<RemovalSummary> {
        tracing::info!("Removing apis from kong, {} in total", apis.len());

        let mut summary = RemovalSummary::default();

        for (index, api) in apis.iter().enumerate() {
            let Some(name) = api.name() else {
                tracing::info!(
                    "Skipping api {} out of {} since no api name was found",
                    index + 1,
                    apis.len()
                );
                summary.skipped += 1;
                continue;
            };

            tracing::info!(
                "Removing api: {}, {} out of {} apis",
                name,
                index + 1,
                apis.len()
            );

            let response = self
                .client
                .delete_api(name, &self.config.headers)
                .await?;

            if response.is_not_found() {
                tracing::info!("API {} not found. Skipping it.", name);
                summary.absent += 1;
            } else {
                tracing::info!("Configuration for api: {} was removed successfully", name);
                summary.removed += 1;
            }
        }

        Ok(summary)
    }

    fn headers_with(&self, overrides: &Headers) -> Headers {
        let mut headers = self.config.headers.clone();
        headers.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        headers
    }
}

fn normalized_admin_url(config: &KongConfig) -> KongResult<String> {
    let url = KongConfigValidator::validate_admin_url(config)?;
    Ok(url.as_str().trim_end_matches('/').to_string())
}
