use clap::Parser;
use color_eyre::{
    Result,
    eyre::{Context, eyre},
};
use kong_reconciler::{
    ApiDefinition, GetApisOptions, KongReconciler,
    config::{KongConfig, KongConfigValidator, loader::load_config},
    tracing_setup,
};
use serde::Serialize;
use tracing::Instrument;

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    #[clap(subcommand)]
    command: Option<Commands>,

    /// Configuration file describing the desired Kong state
    #[clap(short, long, global = true, default_value = "kong.yaml")]
    config: String,

    /// Log level filter (overridden by RUST_LOG)
    #[clap(long, global = true, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[clap(long, global = true)]
    json_logs: bool,
}

#[derive(Parser, Debug)]
enum Commands {
    /// Create or update every configured API and plugin (default)
    Apply,
    /// Look up the configured APIs on the server
    Get {
        /// List every API on the server instead of the configured ones
        #[clap(long)]
        all: bool,
        /// Query parameter for the full listing, as key=value
        #[clap(long = "query", value_parser = parse_key_val)]
        query: Vec<(String, String)>,
    },
    /// Delete the configured APIs from the server
    Remove,
    /// List every plugin attached to one API
    Plugins {
        /// API name or id
        api: String,
    },
    /// Validate configuration file
    Validate,
}

fn parse_key_val(raw: &str) -> std::result::Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Failed to render output")?;
    println!("{rendered}");
    Ok(())
}

async fn validate_config_command(config: &KongConfig, config_path: &str) -> Result<()> {
    match KongConfigValidator::validate(config) {
        Ok(()) => {
            println!("Configuration {config_path} is valid");
            println!(
                "  {} apis, {} root plugins",
                config.apis.len(),
                config.root_plugins.len()
            );
            Ok(())
        }
        Err(e) => Err(eyre!("Configuration {config_path} is invalid: {e}")),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    tracing_setup::init_tracing_with_config(&args.log_level, args.json_logs)
        .map_err(|e| eyre!("Failed to initialize tracing: {}", e))?;

    let config_path = args.config;
    let config = load_config(&config_path)
        .await
        .with_context(|| format!("Failed to load config from {config_path}"))?;

    let command = args.command.unwrap_or(Commands::Apply);

    if let Commands::Validate = command {
        return validate_config_command(&config, &config_path).await;
    }

    let reconciler = KongReconciler::connect(config).context("Failed to create Kong reconciler")?;
    let span = tracing_setup::reconcile_span(command_name(&command), reconciler.admin_url());

    run_command(&reconciler, command).instrument(span).await
}

async fn run_command(reconciler: &KongReconciler, command: Commands) -> Result<()> {
    match command {
        Commands::Apply => {
            let summary = reconciler
                .create_configurations()
                .await
                .context("Kong configuration failed")?;
            print_json(&summary)
        }
        Commands::Get { all, query } => {
            let apis: &[ApiDefinition] = if all {
                &[]
            } else {
                &reconciler.config().apis
            };
            let options = GetApisOptions {
                query_params: query,
                ..Default::default()
            };
            let lookup = reconciler
                .get_apis(apis, &options)
                .await
                .context("Failed to get apis")?;
            print_json(&lookup)
        }
        Commands::Remove => {
            let summary = reconciler
                .remove_apis(&reconciler.config().apis)
                .await
                .context("Failed to remove apis")?;
            print_json(&summary)
        }
        Commands::Plugins { api } => {
            let plugins = reconciler
                .get_plugins_of_api(&api)
                .await
                .with_context(|| format!("Failed to list plugins of api {api}"))?;
            print_json(&plugins)
        }
        // Handled before connecting, so a missing admin URL is reported too
        Commands::Validate => Ok(()),
    }
}

fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Apply => "apply",
        Commands::Get { .. } => "get",
        Commands::Remove => "remove",
        Commands::Plugins { .. } => "plugins",
        Commands::Validate => "validate",
    }
}
