//! Lifecycle operations for a database resource.
//!
//! Every operation except [`DatabaseAdapter::delete`] runs in its own
//! transaction. The transaction commits only when the whole operation,
//! including the closing catalog read, succeeds; every error path rolls back
//! before the error is returned.

use redshift_core::{
    Catalog, CatalogSession, ConnectionLimit, CoreError, CoreResult, DatabaseId,
    DatabaseResource, SettleConfig,
};
use tracing::{info, instrument, warn};

use crate::ddl;
use crate::owner::OwnerResolver;
use crate::settle::await_database_id;

/// Translates desired database state into DDL against a cluster catalog.
pub struct DatabaseAdapter<C: Catalog> {
    catalog: C,
    settle: SettleConfig,
}

impl<C: Catalog> DatabaseAdapter<C> {
    /// Creates an adapter over `catalog`; `settle` bounds the post-create poll.
    pub fn new(catalog: C, settle: SettleConfig) -> Self {
        Self { catalog, settle }
    }

    /// Returns the underlying catalog.
    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Reports whether a database with `id` is present.
    ///
    /// `Ok(false)` means the catalog returned no row; lookup failures are
    /// errors, never "absent".
    #[instrument(skip(self))]
    pub async fn exists(&self, id: DatabaseId) -> CoreResult<bool> {
        let mut session = self.catalog.begin().await?;
        let result = session.find_database(id).await.map(|row| row.is_some());
        finish(session, result).await
    }

    /// Creates the database and returns its observed state.
    ///
    /// All-or-nothing: the creation statement is rolled back when the new
    /// identifier never shows up or the closing read fails.
    #[instrument(skip(self, desired), fields(name = %desired.name))]
    pub async fn create(&self, desired: &DatabaseResource) -> CoreResult<DatabaseResource> {
        let mut session = self.catalog.begin().await?;
        let result = self.create_in(&mut session, desired).await;
        finish(session, result).await
    }

    async fn create_in(
        &self,
        session: &mut C::Session,
        desired: &DatabaseResource,
    ) -> CoreResult<DatabaseResource> {
        let owner = OwnerResolver::resolve_one(session, desired.owner).await?;
        let statement = ddl::create_database(
            &desired.name,
            Some(&owner),
            desired.connection_limit.as_ref(),
        );
        info!(%statement, "creating database");
        session.execute(&statement).await?;

        let id = await_database_id(session, &desired.name, &self.settle).await?;
        read_in(session, id).await
    }

    /// Reads the observed state of the database with `id`.
    #[instrument(skip(self))]
    pub async fn read(&self, id: DatabaseId) -> CoreResult<DatabaseResource> {
        let mut session = self.catalog.begin().await?;
        let result = read_in(&mut session, id).await;
        finish(session, result).await
    }

    /// Moves the database from `current` to `desired`, one statement per
    /// changed attribute.
    ///
    /// Statements address the database by name, so the rename runs first and
    /// later statements use the new name. The owner is resolved before any
    /// statement runs.
    #[instrument(skip(self, current, desired), fields(id = ?current.id))]
    pub async fn update(
        &self,
        current: &DatabaseResource,
        desired: &DatabaseResource,
    ) -> CoreResult<DatabaseResource> {
        let id = current.require_id()?;
        let mut session = self.catalog.begin().await?;
        let result = self.update_in(&mut session, id, current, desired).await;
        finish(session, result).await
    }

    async fn update_in(
        &self,
        session: &mut C::Session,
        id: DatabaseId,
        current: &DatabaseResource,
        desired: &DatabaseResource,
    ) -> CoreResult<DatabaseResource> {
        let new_owner = if desired.owner != current.owner {
            Some(OwnerResolver::resolve_one(session, desired.owner).await?)
        } else {
            None
        };

        let mut name = current.name.as_str();

        if desired.name != current.name {
            let statement = ddl::rename_database(&current.name, &desired.name);
            info!(%statement, "renaming database");
            session.execute(&statement).await?;
            name = desired.name.as_str();
        }

        if let Some(owner) = new_owner {
            let statement = ddl::alter_owner(name, &owner);
            info!(%statement, "reassigning database owner");
            session.execute(&statement).await?;
        }

        if let Some(limit) = connection_limit_change(
            current.connection_limit.as_ref(),
            desired.connection_limit.as_ref(),
        ) {
            let statement = ddl::alter_connection_limit(name, &limit);
            info!(%statement, "changing connection limit");
            session.execute(&statement).await?;
        }

        read_in(session, id).await
    }

    /// Drops the database by its current name as a single autocommitted statement.
    #[instrument(skip(self, current), fields(name = %current.name))]
    pub async fn delete(&self, current: &DatabaseResource) -> CoreResult<()> {
        let statement = ddl::drop_database(&current.name);
        info!(%statement, "dropping database");
        self.catalog.execute_autocommit(&statement).await
    }

    /// Returns the fully populated state of an existing, untracked database.
    #[instrument(skip(self))]
    pub async fn import(&self, id: DatabaseId) -> CoreResult<DatabaseResource> {
        self.read(id).await
    }
}

/// Limit to apply, if any.
///
/// A desired limit of "absent" resets a concrete limit to `UNLIMITED`.
fn connection_limit_change(
    current: Option<&ConnectionLimit>,
    desired: Option<&ConnectionLimit>,
) -> Option<ConnectionLimit> {
    match (current, desired) {
        (current, Some(desired)) if current != Some(desired) => Some(desired.clone()),
        (Some(current), None) if !current.is_unlimited() => Some(ConnectionLimit::unlimited()),
        _ => None,
    }
}

async fn read_in<S: CatalogSession>(session: &mut S, id: DatabaseId) -> CoreResult<DatabaseResource> {
    match session.find_database(id).await? {
        Some(row) => Ok(DatabaseResource::from_row(id, row)),
        None => Err(CoreError::not_found("database", id.to_string())),
    }
}

/// Commits on success, rolls back on failure. The operation's own error wins
/// over a rollback failure.
async fn finish<S: CatalogSession, T>(session: S, result: CoreResult<T>) -> CoreResult<T> {
    match result {
        Ok(value) => {
            session.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = session.rollback().await {
                warn!(error = %rollback_err, "rollback failed");
            }
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unchanged_limit_issues_nothing() {
        let fifty = ConnectionLimit::limited(50);
        assert_eq!(connection_limit_change(Some(&fifty), Some(&fifty)), None);
        assert_eq!(connection_limit_change(None, None), None);
    }

    #[test]
    fn new_limit_is_applied() {
        let fifty = ConnectionLimit::limited(50);
        let ten = ConnectionLimit::limited(10);
        assert_eq!(connection_limit_change(Some(&fifty), Some(&ten)), Some(ten.clone()));
        assert_eq!(connection_limit_change(None, Some(&ten)), Some(ten));
    }

    #[test]
    fn cleared_limit_resets_to_unlimited() {
        let fifty = ConnectionLimit::limited(50);
        assert_eq!(
            connection_limit_change(Some(&fifty), None),
            Some(ConnectionLimit::unlimited())
        );
        assert_eq!(
            connection_limit_change(Some(&ConnectionLimit::unlimited()), None),
            None
        );
    }
}
