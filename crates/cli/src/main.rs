//! Turnpike CLI: operator tooling for the orchestration engine.
//!
//! Commands:
//! - `route`   : Show which provider and model a model spec resolves to
//! - `tools`   : List the built-in tools and their schemas
//! - `validate`: Check a chat request body before sending it
//! - `config`  : Show, locate or validate the configuration file

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "turnpike",
    about = "Turnpike — bounded tool-calling orchestration for LLM agents",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Read configuration from this file instead of ~/.turnpike/config.toml
    #[arg(short, long, global = true, env = "TURNPIKE_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a model spec (e.g. "claude-sonnet-4", "ollama:llama3.1")
    Route {
        /// Model spec; empty means the default provider's default model
        #[arg(default_value = "")]
        spec: String,
    },

    /// List the built-in tools
    Tools {
        /// Print full JSON schemas instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Validate a chat request body (JSON file, or `-` for stdin)
    Validate {
        input: String,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Print the configuration file path
    Path,
    /// Validate the configuration file
    Validate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Route { spec } => commands::route::run(config_path, &spec).await?,
        Commands::Tools { json } => commands::tools::run(config_path, json).await?,
        Commands::Validate { input } => commands::validate::run(config_path, &input).await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show(config_path).await?,
            ConfigAction::Path => commands::config_cmd::path(config_path).await?,
            ConfigAction::Validate => commands::config_cmd::validate(config_path).await?,
        },
    }

    Ok(())
}
