//! polirate CLI - politician rating platform
//!
//! - `serve`: run the HTTP API (with `server` feature)
//! - `migrate`: create or update the database schema
//! - `token`: mint a bearer token for local testing
//! - `price`: show the report price schedule
//! - `config`: manage `~/.polirate/config.toml`

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod tracing_setup;

#[derive(Parser, Debug)]
#[command(
    name = "polirate",
    author,
    version,
    about = "Politician rating platform: API server and operator tools",
    long_about = "Run the polirate HTTP API (politicians, ratings, posts, comments, likes, \
                  notifications, report purchases) and manage its database and configuration."
)]
struct Cli {
    /// Config file (default: ~/.polirate/config.toml)
    #[arg(long, global = true, env = "POLIRATE_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Debug logging unless RUST_LOG is set
    #[arg(long, global = true)]
    debug: bool,

    /// Export traces over OTLP (requires the telemetry feature)
    #[arg(long, global = true)]
    otel: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API server
    #[cfg(feature = "server")]
    Serve(commands::serve::ServeArgs),
    /// Create or update the database schema
    #[cfg(feature = "server")]
    Migrate(commands::migrate::MigrateArgs),
    /// Mint a signed bearer token for local testing
    #[cfg(feature = "server")]
    Token(commands::token::TokenArgs),
    /// Show report prices by purchase number
    Price(commands::price::PriceArgs),
    /// Manage polirate configuration (init, show, path, validate)
    Config(commands::config::ConfigArgs),
}

/// `.env` in the working directory, then `~/.polirate/.env`. Existing
/// variables win.
fn load_dotenv() {
    dotenvy::dotenv().ok();
    if let Some(home) = dirs::home_dir() {
        dotenvy::from_path(home.join(".polirate/.env")).ok();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenv();
    let cli = Cli::parse();

    tracing_setup::init(&tracing_setup::TracingConfig {
        debug: cli.debug,
        otel: cli.otel,
    })
    .ok();

    let config = cli.config.as_deref();
    let result = match cli.command {
        #[cfg(feature = "server")]
        Commands::Serve(args) => commands::run_serve(config, args).await,
        #[cfg(feature = "server")]
        Commands::Migrate(args) => commands::run_migrate(config, args).await,
        #[cfg(feature = "server")]
        Commands::Token(args) => commands::run_token(config, args),
        Commands::Price(args) => commands::run_price(config, args),
        Commands::Config(args) => commands::run_config(config, args),
    };

    tracing_setup::shutdown_otel();
    result
}
