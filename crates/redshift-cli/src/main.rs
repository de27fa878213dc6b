mod commands;
mod logging;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use redshift_core::ProviderConfig;

use crate::commands::DatabaseArgs;

/// Manage a database in a Redshift-compatible cluster.
#[derive(Debug, Parser)]
#[command(name = "redshift-provider", version, about)]
struct Cli {
    /// Configuration file; defaults to REDSHIFT_PROVIDER_CONFIG or ./config/redshift-provider
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Cluster URL, overrides `connection.url`
    #[arg(long, global = true, env = "REDSHIFT_DATABASE_URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the resource schema
    Schema,
    /// Report whether a database id exists
    Exists { id: String },
    /// Print the observed state of a database
    Read { id: String },
    /// Print the state of an existing, untracked database
    Import { id: String },
    /// Create a database
    Create(DatabaseArgs),
    /// Bring a database to the given state
    Update {
        id: String,
        #[command(flatten)]
        desired: DatabaseArgs,
    },
    /// Drop a database
    Delete { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ProviderConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => ProviderConfig::load().context("failed to load config")?,
    };
    if let Some(url) = cli.database_url {
        config.connection.url = url;
    }

    logging::init_logging(&config.logging).context("failed to initialize logging")?;

    commands::run(cli.command, &config).await
}
