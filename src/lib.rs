//! kong-reconciler - declarative configuration for the Kong admin API.
//!
//! Describe the APIs and plugins a Kong gateway should have, and the reconciler
//! makes the live gateway match: missing resources are created, changed ones
//! updated, and plugins that are no longer described are deleted.
//!
//! # Features
//! - Upsert of APIs by name, carrying server-assigned ids forward
//! - Per-API and gateway-wide (root) plugin reconciliation with stale plugin removal
//! - Paginated plugin discovery exposed as a `futures` stream
//! - Read-only API lookup and API removal with 404-as-absent semantics
//! - Request diagnostics via `tracing` with sensitive fields masked
//! - Configuration loading from YAML / JSON / TOML with environment overrides
//!
//! # Quick Example
//! ```no_run
//! use kong_reconciler::{KongReconciler, config::loader::load_config};
//!
//! # #[tokio::main] async fn main() -> eyre::Result<()> {
//! let config = load_config("kong.yaml").await?;
//! let reconciler = KongReconciler::connect(config)?;
//! let summary = reconciler.create_configurations().await?;
//! println!("{} apis set up", summary.apis_upserted);
//! # Ok(()) }
//! ```
//!
//! # Architecture
//! The crate separates **ports** (traits) from **adapters** (implementations)
//! while keeping reconciliation logic inside `core`. The engine only depends on
//! the [`AdminClient`] port, so tests and embedders can swap the HTTP transport.
//!
//! # Error Handling
//! Library APIs return [`KongError`], which wraps configuration errors and
//! passes admin API errors through unchanged. The binary reports errors through
//! `eyre` with context attached.
//!
//! # Concurrency
//! Admin calls are issued strictly one at a time. Independent reconciler
//! instances share no state.
pub mod config;
pub mod ports;
pub mod tracing_setup;

pub mod adapters;
pub mod core;

pub use crate::{
    adapters::HttpAdminClient,
    config::models::KongConfig,
    core::{
        ApiDefinition, ApiLookup, FieldMasker, GetApisOptions, KongError, KongReconciler,
        KongResult, ReconcileSummary, RemovalSummary, Resource,
    },
    ports::admin_client::{AdminClient, AdminClientError, PluginScope},
};
