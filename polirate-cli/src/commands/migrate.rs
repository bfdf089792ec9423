//! Schema migration command

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;

use polirate_core::PlatformConfig;
use polirate_server::db::{create_pool, migrations};

#[derive(Parser, Debug)]
pub struct MigrateArgs {
    /// Database URL (overrides config/environment)
    #[arg(long)]
    pub database_url: Option<String>,
}

pub async fn run_migrate(config_path: Option<&Path>, args: MigrateArgs) -> Result<()> {
    let config = PlatformConfig::load(config_path)?;
    let database_url = match args.database_url {
        Some(url) => url,
        None => config.database_url()?.to_owned(),
    };

    let pool = create_pool(&database_url)
        .await
        .context("Failed to connect to database")?;
    migrations::run(&pool)
        .await
        .context("Failed to run migrations")?;

    println!("Schema is up to date");
    Ok(())
}
