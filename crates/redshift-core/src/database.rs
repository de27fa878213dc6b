use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::ids::{DatabaseId, OwnerId};

/// Connection limit attribute of a database.
///
/// Holds the literal text the engine understands: either `UNLIMITED` or a
/// non-negative integer. Values read back from the catalog are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionLimit(String);

impl ConnectionLimit {
    /// Sentinel accepted by the engine for "no limit".
    pub const UNLIMITED: &'static str = "UNLIMITED";

    /// The `UNLIMITED` connection limit.
    #[must_use]
    pub fn unlimited() -> Self {
        Self(Self::UNLIMITED.to_string())
    }

    /// A concrete connection limit.
    #[must_use]
    pub fn limited(limit: u32) -> Self {
        Self(limit.to_string())
    }

    /// Parses a host-supplied limit.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::ValidationError` when the value is neither
    /// `UNLIMITED` (any case) nor an unsigned integer. The engine enforces
    /// its own upper bound.
    pub fn parse(value: &str) -> CoreResult<Self> {
        let value = value.trim();
        if value.eq_ignore_ascii_case(Self::UNLIMITED) {
            return Ok(Self::unlimited());
        }
        if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
            return Ok(Self(value.to_string()));
        }
        Err(CoreError::validation(format!(
            "connection limit must be `UNLIMITED` or a non-negative integer, got `{value}`"
        )))
    }

    /// Wraps a value reported by the catalog without validation.
    #[must_use]
    pub fn from_catalog(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the literal text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true for the `UNLIMITED` sentinel.
    #[must_use]
    pub fn is_unlimited(&self) -> bool {
        self.0.eq_ignore_ascii_case(Self::UNLIMITED)
    }
}

impl Default for ConnectionLimit {
    fn default() -> Self {
        Self::unlimited()
    }
}

impl fmt::Display for ConnectionLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Raw projection of a `pg_database_info` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseRow {
    /// `datname`.
    pub name: String,
    /// `datdba`.
    pub owner: OwnerId,
    /// `datconnlimit`, null when the engine reports none.
    pub connection_limit: Option<String>,
}

/// A logical database managed by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseResource {
    /// Engine-assigned identifier; `None` until the database is created.
    pub id: Option<DatabaseId>,
    /// Database name used in DDL. Mutable, so never used as identity.
    pub name: String,
    /// Identifier of the owning user.
    pub owner: OwnerId,
    /// Connection limit, absent when the engine reports null.
    pub connection_limit: Option<ConnectionLimit>,
}

impl DatabaseResource {
    /// Constructs a desired-state record that has not been created yet.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        owner: OwnerId,
        connection_limit: Option<ConnectionLimit>,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            owner,
            connection_limit,
        }
    }

    /// Returns the identifier, failing for a resource that was never created.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidState` when no identifier has been assigned.
    pub fn require_id(&self) -> CoreResult<DatabaseId> {
        self.id.ok_or_else(|| {
            CoreError::invalid_state(format!("database `{}` has no identifier yet", self.name))
        })
    }

    /// Builds an observed record from a catalog row.
    #[must_use]
    pub fn from_row(id: DatabaseId, row: DatabaseRow) -> Self {
        Self {
            id: Some(id),
            name: row.name,
            owner: row.owner,
            connection_limit: row.connection_limit.map(ConnectionLimit::from_catalog),
        }
    }
}
