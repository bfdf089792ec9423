//! HTTP server command
//!
//! Layers CLI flags over the config file and environment, then runs the API
//! until Ctrl+C / SIGTERM.

use std::net::SocketAddr;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;

use polirate_core::PlatformConfig;
use polirate_server::db::{create_pool_with_options, migrations};
use polirate_server::http::{run_server, ServerConfig};

/// Arguments for the serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Address to bind to (overrides config; default 127.0.0.1:3030)
    #[arg(long, short = 'b')]
    pub bind: Option<SocketAddr>,

    /// Allow permissive CORS (all origins) - use with caution
    #[arg(long)]
    pub cors_permissive: bool,

    /// Database URL (overrides config/environment)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Skip schema migrations on startup
    #[arg(long)]
    pub no_migrate: bool,
}

/// Apply command-line overrides on top of the loaded config.
fn apply_flags(config: &mut PlatformConfig, args: &ServeArgs) {
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if args.cors_permissive {
        config.server.cors_permissive = true;
    }
    if let Some(url) = &args.database_url {
        config.database.url = Some(url.clone());
    }
}

/// Run the HTTP server
pub async fn run_serve(config_path: Option<&Path>, args: ServeArgs) -> Result<()> {
    let mut config = PlatformConfig::load(config_path)?;
    apply_flags(&mut config, &args);

    let database_url = config.database_url()?.to_owned();
    let jwt_secret = config.jwt_secret()?.to_owned();

    tracing::info!(bind = %config.server.bind, "starting polirate server");

    let pool = create_pool_with_options(&database_url, config.database.max_connections)
        .await
        .context("Failed to create database pool")?;

    if !args.no_migrate {
        migrations::run(&pool)
            .await
            .context("Failed to run migrations")?;
    }

    let server_config = ServerConfig::from_platform(&config, jwt_secret);

    // Blocks until shutdown
    run_server(pool, server_config)
        .await
        .context("Server error")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() {
        let mut config = PlatformConfig::default();
        let args = ServeArgs {
            bind: Some("0.0.0.0:8080".parse().unwrap()),
            cors_permissive: true,
            database_url: Some("postgres://db/polirate".into()),
            no_migrate: false,
        };

        apply_flags(&mut config, &args);
        assert_eq!(config.server.bind.port(), 8080);
        assert!(config.server.cors_permissive);
        assert_eq!(config.database_url().unwrap(), "postgres://db/polirate");
    }

    #[test]
    fn absent_flags_keep_config() {
        let mut config = PlatformConfig::default();
        config.server.cors_permissive = true;
        let args = ServeArgs {
            bind: None,
            cors_permissive: false,
            database_url: None,
            no_migrate: true,
        };

        apply_flags(&mut config, &args);
        assert!(config.server.cors_permissive);
        assert_eq!(config.server.bind, PlatformConfig::default().server.bind);
    }
}
