use async_trait::async_trait;

use crate::database::DatabaseRow;
use crate::error::CoreResult;
use crate::ids::{DatabaseId, OwnerId};

/// Pool-level handle to the SQL engine.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Transaction type handed out by [`Catalog::begin`].
    type Session: CatalogSession;

    /// Opens a transaction.
    async fn begin(&self) -> CoreResult<Self::Session>;

    /// Executes a single statement outside any multi-statement transaction.
    async fn execute_autocommit(&self, statement: &str) -> CoreResult<()>;
}

/// Transaction-scoped access to the engine catalog.
///
/// A session must be finished with [`CatalogSession::commit`] or
/// [`CatalogSession::rollback`]; implementations roll back when dropped
/// unfinished.
#[async_trait]
pub trait CatalogSession: Send {
    /// Executes DDL text.
    async fn execute(&mut self, statement: &str) -> CoreResult<()>;

    /// Looks up a database row by identifier.
    async fn find_database(&mut self, id: DatabaseId) -> CoreResult<Option<DatabaseRow>>;

    /// Looks up the identifier of a database by name.
    async fn find_database_id(&mut self, name: &str) -> CoreResult<Option<DatabaseId>>;

    /// Looks up the username for an owner identifier.
    async fn find_username(&mut self, owner: OwnerId) -> CoreResult<Option<String>>;

    /// Commits the transaction.
    async fn commit(self) -> CoreResult<()>;

    /// Rolls the transaction back.
    async fn rollback(self) -> CoreResult<()>;
}
