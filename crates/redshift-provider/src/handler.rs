//! Host-facing surface of the database resource.
//!
//! The orchestration host exchanges resource state as JSON objects with the
//! attribute names described by [`database_schema`]. The handler converts
//! between those objects and [`DatabaseResource`] and drives the adapter.

use redshift_core::{
    Catalog, ConnectionLimit, CoreError, CoreResult, DatabaseId, DatabaseResource, OwnerId,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::adapter::DatabaseAdapter;

/// Type name the host registers the resource under.
pub const RESOURCE_TYPE: &str = "redshift_database";

/// Wire shape of the resource state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseState {
    /// Stable catalog identifier, assigned on create.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub database_name: String,
    pub owner: i64,
    /// Absent means the attribute default, `UNLIMITED`.
    #[serde(default)]
    pub connection_limit: Option<String>,
}

impl DatabaseState {
    /// Parses host-supplied JSON.
    pub fn from_value(value: Value) -> CoreResult<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Serializes for the host.
    pub fn into_value(self) -> CoreResult<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Converts planned state into a desired resource, applying the
    /// `UNLIMITED` default and validating the limit format.
    pub fn to_desired(&self) -> CoreResult<DatabaseResource> {
        if self.database_name.trim().is_empty() {
            return Err(CoreError::validation("database_name must not be empty"));
        }
        let connection_limit = match &self.connection_limit {
            Some(limit) => ConnectionLimit::parse(limit)?,
            None => ConnectionLimit::unlimited(),
        };
        let id = self.id.as_deref().map(str::parse::<DatabaseId>).transpose()?;
        Ok(DatabaseResource {
            id,
            name: self.database_name.clone(),
            owner: OwnerId::new(self.owner),
            connection_limit: Some(connection_limit),
        })
    }

    /// Converts recorded state into the resource as last observed.
    ///
    /// Unlike [`DatabaseState::to_desired`] no default is applied: an absent
    /// limit stays absent, as the engine reported it.
    pub fn to_observed(&self) -> CoreResult<DatabaseResource> {
        let id = self.id.as_deref().map(str::parse::<DatabaseId>).transpose()?;
        Ok(DatabaseResource {
            id,
            name: self.database_name.clone(),
            owner: OwnerId::new(self.owner),
            connection_limit: self
                .connection_limit
                .as_deref()
                .map(ConnectionLimit::from_catalog),
        })
    }
}

impl From<DatabaseResource> for DatabaseState {
    fn from(resource: DatabaseResource) -> Self {
        Self {
            id: resource.id.map(|id| id.to_string()),
            database_name: resource.name,
            owner: resource.owner.get(),
            connection_limit: resource
                .connection_limit
                .map(|limit| limit.as_str().to_string()),
        }
    }
}

/// Value type of a schema attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    String,
    Int,
}

/// One attribute of the resource schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attribute {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub kind: AttributeType,
    pub required: bool,
    pub computed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<&'static str>,
    pub description: &'static str,
}

/// Schema the host validates configuration against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceSchema {
    pub resource_type: &'static str,
    pub importable: bool,
    pub attributes: Vec<Attribute>,
}

/// Schema of the database resource.
pub fn database_schema() -> ResourceSchema {
    ResourceSchema {
        resource_type: RESOURCE_TYPE,
        importable: true,
        attributes: vec![
            Attribute {
                name: "id",
                kind: AttributeType::String,
                required: false,
                computed: true,
                default: None,
                description: "Catalog identifier (datid); stable across renames.",
            },
            Attribute {
                name: "database_name",
                kind: AttributeType::String,
                required: true,
                computed: false,
                default: None,
                description: "Database name. Changing it renames the database in place.",
            },
            Attribute {
                name: "owner",
                kind: AttributeType::Int,
                required: true,
                computed: false,
                default: None,
                description: "usesysid of the owning user.",
            },
            Attribute {
                name: "connection_limit",
                kind: AttributeType::String,
                required: false,
                computed: false,
                default: Some(ConnectionLimit::UNLIMITED),
                description: "Maximum concurrent connections, or UNLIMITED.",
            },
        ],
    }
}

/// JSON-in, JSON-out resource handler driven by the orchestration host.
pub struct DatabaseResourceHandler<C: Catalog> {
    adapter: DatabaseAdapter<C>,
}

impl<C: Catalog> DatabaseResourceHandler<C> {
    pub fn new(adapter: DatabaseAdapter<C>) -> Self {
        Self { adapter }
    }

    pub fn adapter(&self) -> &DatabaseAdapter<C> {
        &self.adapter
    }

    pub fn schema(&self) -> ResourceSchema {
        database_schema()
    }

    /// Creates the resource from planned state and returns the new state.
    pub async fn create(&self, planned: Value) -> CoreResult<Value> {
        let desired = DatabaseState::from_value(planned)?.to_desired()?;
        let observed = self.adapter.create(&desired).await?;
        DatabaseState::from(observed).into_value()
    }

    /// Refreshes recorded state.
    ///
    /// Returns `None` when the database no longer exists so the host can drop
    /// it from its state.
    pub async fn read(&self, state: Value) -> CoreResult<Option<Value>> {
        let id = DatabaseState::from_value(state)?.to_observed()?.require_id()?;
        self.read_id(id).await
    }

    /// Reads a database by its catalog identifier, `None` if it is gone.
    pub async fn read_by_id(&self, id: &str) -> CoreResult<Option<Value>> {
        self.read_id(id.parse()?).await
    }

    // A single read transaction: a drop racing the lookup still yields `None`.
    async fn read_id(&self, id: DatabaseId) -> CoreResult<Option<Value>> {
        match self.adapter.read(id).await {
            Ok(observed) => DatabaseState::from(observed).into_value().map(Some),
            Err(err) if err.is_not_found() => {
                info!(%id, "database no longer exists");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Applies planned state on top of prior state.
    pub async fn update(&self, prior: Value, planned: Value) -> CoreResult<Value> {
        let current = DatabaseState::from_value(prior)?.to_observed()?;
        let mut desired = DatabaseState::from_value(planned)?.to_desired()?;
        desired.id = current.id;
        let observed = self.adapter.update(&current, &desired).await?;
        DatabaseState::from(observed).into_value()
    }

    pub async fn delete(&self, state: Value) -> CoreResult<()> {
        let current = DatabaseState::from_value(state)?.to_observed()?;
        self.adapter.delete(&current).await
    }

    /// Adopts an existing database by its catalog identifier.
    pub async fn import(&self, id: &str) -> CoreResult<Value> {
        let id: DatabaseId = id.parse()?;
        let observed = self.adapter.import(id).await?;
        DatabaseState::from(observed).into_value()
    }
}
