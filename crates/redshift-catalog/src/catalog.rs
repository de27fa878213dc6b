use async_trait::async_trait;
use redshift_core::{Catalog, CatalogSession, CoreResult, DatabaseId, DatabaseRow, OwnerId};
use sqlx::postgres::PgRow;
use sqlx::{query, Executor, PgPool, Postgres, Row, Transaction};
use tracing::debug;

use crate::util::map_sqlx_error;

/// Cluster catalog reached through a PostgreSQL-protocol pool.
#[derive(Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    /// Creates a new catalog backed by the provided pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Catalog for PgCatalog {
    type Session = PgCatalogSession;

    async fn begin(&self) -> CoreResult<PgCatalogSession> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|err| map_sqlx_error("transaction", String::new(), err))?;
        Ok(PgCatalogSession { tx })
    }

    async fn execute_autocommit(&self, statement: &str) -> CoreResult<()> {
        // Unparameterized DDL goes over the simple query protocol.
        self.pool
            .execute(statement)
            .await
            .map(|_| ())
            .map_err(|err| map_sqlx_error("database", String::new(), err))
    }
}

/// An open transaction against the cluster.
///
/// Dropping the session without committing rolls the transaction back.
pub struct PgCatalogSession {
    tx: Transaction<'static, Postgres>,
}

impl PgCatalogSession {
    fn map_row(row: PgRow) -> CoreResult<DatabaseRow> {
        let name: String = row
            .try_get("datname")
            .map_err(|err| map_sqlx_error("database", String::new(), err))?;
        let owner: i64 = row
            .try_get("datdba")
            .map_err(|err| map_sqlx_error("database", name.clone(), err))?;
        let connection_limit: Option<String> = row
            .try_get("datconnlimit")
            .map_err(|err| map_sqlx_error("database", name.clone(), err))?;

        Ok(DatabaseRow {
            name,
            owner: OwnerId::new(owner),
            connection_limit,
        })
    }
}

#[async_trait]
impl CatalogSession for PgCatalogSession {
    async fn execute(&mut self, statement: &str) -> CoreResult<()> {
        (&mut *self.tx)
            .execute(statement)
            .await
            .map(|_| ())
            .map_err(|err| map_sqlx_error("database", String::new(), err))
    }

    async fn find_database(&mut self, id: DatabaseId) -> CoreResult<Option<DatabaseRow>> {
        debug!(%id, "looking up database by id");
        let row = query(
            r#"
            SELECT datname,
                   datdba::bigint AS datdba,
                   datconnlimit::text AS datconnlimit
              FROM pg_database_info
             WHERE datid::bigint = $1
            "#,
        )
        .bind(id.get())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|err| map_sqlx_error("database", id.to_string(), err))?;

        row.map(Self::map_row).transpose()
    }

    async fn find_database_id(&mut self, name: &str) -> CoreResult<Option<DatabaseId>> {
        debug!(name, "looking up database by name");
        let id: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT datid::bigint
              FROM pg_database_info
             WHERE datname = $1
            "#,
        )
        .bind(name)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|err| map_sqlx_error("database", name.to_string(), err))?;

        Ok(id.map(DatabaseId::new))
    }

    async fn find_username(&mut self, owner: OwnerId) -> CoreResult<Option<String>> {
        debug!(%owner, "looking up username");
        sqlx::query_scalar(
            r#"
            SELECT usename::text
              FROM pg_user_info
             WHERE usesysid::bigint = $1
            "#,
        )
        .bind(owner.get())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|err| map_sqlx_error("user", owner.to_string(), err))
    }

    async fn commit(self) -> CoreResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|err| map_sqlx_error("transaction", String::new(), err))
    }

    async fn rollback(self) -> CoreResult<()> {
        self.tx
            .rollback()
            .await
            .map_err(|err| map_sqlx_error("transaction", String::new(), err))
    }
}
