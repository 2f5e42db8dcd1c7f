use std::path::Path;

use config::{Config, ConfigError, Environment, File, FileFormat, Source};
use eyre::{Context, Result};

use crate::config::models::KongConfig;

/// Prefix of environment variables that override file values,
/// e.g. `KONG_RECONCILER__ADMIN_URL`.
pub const ENV_PREFIX: &str = "KONG_RECONCILER";

/// Settings may also be nested under this key of a larger document.
const NESTED_KEY: &str = "kong_config";

const ADMIN_URL_KEY: &str = "admin_url";
const LEGACY_ADMIN_URL_KEY: &str = "kong_admin_api_url";

/// Load configuration from a file using the config crate
/// Supports multiple formats: YAML, JSON, TOML, etc.
pub async fn load_config(config_path: &str) -> Result<KongConfig> {
    load_config_sync(config_path)
}

/// Load configuration synchronously
pub fn load_config_sync(config_path: &str) -> Result<KongConfig> {
    load_config_with_env(
        config_path,
        Environment::with_prefix(ENV_PREFIX).separator("__"),
    )
}

/// Load configuration, layering `environment` over the file values.
///
/// The file's settings (top-level or nested under `kong_config`) are flattened
/// into defaults first, so overrides apply to the same keys either way.
pub fn load_config_with_env(config_path: &str, environment: Environment) -> Result<KongConfig> {
    let config_path = Path::new(config_path);

    // Determine file format based on extension
    let format = match config_path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => FileFormat::Yaml,
        Some("json") => FileFormat::Json,
        Some("toml") => FileFormat::Toml,
        Some("ini") => FileFormat::Ini,
        _ => FileFormat::Yaml, // Default to YAML
    };

    let file = Config::builder()
        .add_source(File::new(
            config_path
                .to_str()
                .ok_or_else(|| eyre::eyre!("Invalid UTF-8 path: {}", config_path.display()))?,
            format,
        ))
        .build()
        .with_context(|| format!("Failed to read config from {}", config_path.display()))?;

    let mut table = match file.get_table(NESTED_KEY) {
        Ok(nested) => Ok(nested),
        Err(ConfigError::NotFound(_)) => file.collect(),
        Err(e) => Err(e),
    }
    .with_context(|| format!("Failed to read settings from {}", config_path.display()))?;

    if let Some(url) = table.remove(LEGACY_ADMIN_URL_KEY) {
        table.entry(ADMIN_URL_KEY.to_string()).or_insert(url);
    }

    let mut builder = Config::builder();
    for (key, value) in table {
        builder = builder
            .set_default(key.as_str(), value)
            .with_context(|| format!("Invalid setting '{key}'"))?;
    }

    let kong_config: KongConfig = builder
        .add_source(environment)
        .build()
        .and_then(|settings| settings.try_deserialize())
        .with_context(|| {
            format!(
                "Failed to deserialize config from {}",
                config_path.display()
            )
        })?;

    tracing::debug!(
        path = %config_path.display(),
        apis = kong_config.apis.len(),
        root_plugins = kong_config.root_plugins.len(),
        "Loaded Kong configuration"
    );

    Ok(kong_config)
}
