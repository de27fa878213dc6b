use anyhow::{Context, Result};
use clap::Args;
use redshift_catalog::{create_pg_pool, PgCatalog};
use redshift_core::{DatabaseId, ProviderConfig};
use redshift_provider::{database_schema, DatabaseAdapter, DatabaseResourceHandler, DatabaseState};
use serde_json::Value;
use tracing::info;

use crate::Command;

/// Desired attributes of a database.
#[derive(Debug, Args)]
pub struct DatabaseArgs {
    /// Database name
    #[arg(long)]
    pub name: String,

    /// usesysid of the owning user
    #[arg(long)]
    pub owner: i64,

    /// Connection limit, a number or UNLIMITED
    #[arg(long)]
    pub connection_limit: Option<String>,
}

impl DatabaseArgs {
    fn into_state(self, id: Option<String>) -> DatabaseState {
        DatabaseState {
            id,
            database_name: self.name,
            owner: self.owner,
            connection_limit: self.connection_limit,
        }
    }
}

pub(crate) async fn run(command: Command, config: &ProviderConfig) -> Result<()> {
    match command {
        Command::Schema => print_json(&serde_json::to_value(database_schema())?),
        command => run_against_cluster(command, config).await,
    }
}

async fn run_against_cluster(command: Command, config: &ProviderConfig) -> Result<()> {
    let pool = create_pg_pool(&config.connection)
        .await
        .context("failed to connect to cluster")?;
    let adapter = DatabaseAdapter::new(PgCatalog::new(pool), config.settle.clone());
    let handler = DatabaseResourceHandler::new(adapter);

    match command {
        Command::Schema => print_json(&serde_json::to_value(handler.schema())?),
        Command::Exists { id } => {
            let id: DatabaseId = id.parse()?;
            let exists = handler.adapter().exists(id).await?;
            print_json(&Value::Bool(exists))
        }
        Command::Read { id } => match handler.read_by_id(&id).await? {
            Some(state) => print_json(&state),
            None => anyhow::bail!("database {id} does not exist"),
        },
        Command::Import { id } => print_json(&handler.import(&id).await?),
        Command::Create(desired) => {
            let planned = desired.into_state(None).into_value()?;
            let state = handler.create(planned).await?;
            info!(id = %state["id"], "database created");
            print_json(&state)
        }
        Command::Update { id, desired } => {
            let prior = current_state(&handler, &id).await?;
            let planned = desired.into_state(Some(id)).into_value()?;
            print_json(&handler.update(prior, planned).await?)
        }
        Command::Delete { id } => {
            let prior = current_state(&handler, &id).await?;
            handler.delete(prior).await?;
            info!(%id, "database dropped");
            Ok(())
        }
    }
}

/// Recorded state stands in for the host's state store: the cluster is read
/// by id right before the operation.
async fn current_state(handler: &DatabaseResourceHandler<PgCatalog>, id: &str) -> Result<Value> {
    handler
        .import(id)
        .await
        .with_context(|| format!("failed to read database {id}"))
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
