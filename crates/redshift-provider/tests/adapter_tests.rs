//! Lifecycle tests for the database adapter against the in-memory catalog.

use redshift_core::{
    ConnectionLimit, CoreError, DatabaseId, DatabaseResource, DatabaseRow, OwnerId, SettleConfig,
};
use redshift_provider::testing::MockCatalog;
use redshift_provider::{DatabaseAdapter, OwnerResolver};

use redshift_core::{Catalog, CatalogSession};

const ETL: OwnerId = OwnerId::new(104);
const BI: OwnerId = OwnerId::new(210);

fn setup() -> (MockCatalog, DatabaseAdapter<MockCatalog>) {
    let catalog = MockCatalog::new();
    catalog.add_user(ETL, "etl_user");
    catalog.add_user(BI, "bi_admin");
    let adapter = DatabaseAdapter::new(catalog.clone(), SettleConfig::default());
    (catalog, adapter)
}

fn analytics() -> DatabaseResource {
    DatabaseResource::new("analytics", ETL, Some(ConnectionLimit::limited(50)))
}

#[tokio::test]
async fn create_analytics_database() {
    let (catalog, adapter) = setup();

    let observed = adapter.create(&analytics()).await.expect("create");

    let id = observed.id.expect("id assigned");
    assert!(!id.to_string().is_empty());
    assert_eq!(observed.name, "analytics");
    assert_eq!(observed.owner, ETL);
    assert_eq!(observed.connection_limit, Some(ConnectionLimit::limited(50)));
    assert_eq!(
        catalog.statements(),
        vec![r#"CREATE DATABASE "analytics" OWNER "etl_user" CONNECTION LIMIT 50"#]
    );
    assert_eq!(catalog.commits(), 1);
    assert_eq!(catalog.open_sessions(), 0);
}

#[tokio::test]
async fn create_then_read_matches_desired() {
    let (_catalog, adapter) = setup();
    let desired = DatabaseResource::new("events", BI, Some(ConnectionLimit::unlimited()));

    let created = adapter.create(&desired).await.expect("create");
    let read = adapter.read(created.id.unwrap()).await.expect("read");

    assert_eq!(read.name, desired.name);
    assert_eq!(read.owner, desired.owner);
    assert_eq!(read.connection_limit, desired.connection_limit);
    assert_eq!(read, created);
}

#[tokio::test]
async fn create_without_limit_reads_engine_default() {
    let (catalog, adapter) = setup();

    let created = adapter
        .create(&DatabaseResource::new("scratch", ETL, None))
        .await
        .expect("create");

    assert_eq!(
        catalog.statements(),
        vec![r#"CREATE DATABASE "scratch" OWNER "etl_user""#]
    );
    assert_eq!(created.connection_limit, Some(ConnectionLimit::unlimited()));
}

#[tokio::test(start_paused = true)]
async fn create_waits_for_catalog_propagation() {
    let (catalog, adapter) = setup();
    catalog.set_propagation_delay(3);

    let created = adapter.create(&analytics()).await.expect("create");

    assert!(created.id.is_some());
    assert_eq!(catalog.database_count(), 1);
}

#[tokio::test]
async fn create_rolls_back_when_final_read_fails() {
    let (catalog, adapter) = setup();
    catalog.set_failing_reads(true);

    let err = adapter.create(&analytics()).await.expect_err("read failure");

    assert!(matches!(err, CoreError::Connection { .. }));
    assert_eq!(catalog.statements().len(), 1);
    assert_eq!(catalog.database_count(), 0);
    assert_eq!(catalog.commits(), 0);
    assert_eq!(catalog.rollbacks(), 1);
    assert_eq!(catalog.open_sessions(), 0);
}

#[tokio::test(start_paused = true)]
async fn create_rolls_back_when_catalog_never_settles() {
    let (catalog, adapter) = setup();
    catalog.set_propagation_delay(u32::MAX);

    let err = adapter.create(&analytics()).await.expect_err("timeout");

    assert!(matches!(err, CoreError::PropagationTimeout { .. }));
    assert_eq!(catalog.database_count(), 0);
    assert_eq!(catalog.rollbacks(), 1);
    assert_eq!(catalog.open_sessions(), 0);
}

#[tokio::test]
async fn create_rolls_back_rejected_statement() {
    let (catalog, adapter) = setup();
    catalog.reject_statement("CREATE DATABASE", "permission denied to create database");

    let err = adapter.create(&analytics()).await.expect_err("rejected");

    match err {
        CoreError::Statement { message } => {
            assert_eq!(message, "permission denied to create database")
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(catalog.database_count(), 0);
    assert_eq!(catalog.rollbacks(), 1);
}

#[tokio::test]
async fn create_with_unknown_owner_issues_no_ddl() {
    let (catalog, adapter) = setup();
    let desired = DatabaseResource::new("analytics", OwnerId::new(999), None);

    let err = adapter.create(&desired).await.expect_err("unknown owner");

    assert!(matches!(err, CoreError::NotFound { entity: "user", .. }));
    assert!(catalog.statements().is_empty());
    assert_eq!(catalog.open_sessions(), 0);
}

#[tokio::test]
async fn create_duplicate_name_fails() {
    let (catalog, adapter) = setup();
    adapter.create(&analytics()).await.expect("first create");

    let err = adapter.create(&analytics()).await.expect_err("duplicate");

    assert!(matches!(err, CoreError::Statement { .. }));
    assert_eq!(catalog.database_count(), 1);
}

#[tokio::test]
async fn read_missing_database_is_not_found() {
    let (_catalog, adapter) = setup();

    let err = adapter.read(DatabaseId::new(1)).await.expect_err("missing");

    assert!(err.is_not_found());
}

#[tokio::test]
async fn read_maps_null_limit_to_absent() {
    let (catalog, adapter) = setup();
    let id = catalog.insert_database(DatabaseRow {
        name: "legacy".into(),
        owner: ETL,
        connection_limit: None,
    });

    let read = adapter.read(id).await.expect("read");

    assert_eq!(read.connection_limit, None);
}

#[tokio::test]
async fn rename_then_drop_targets_new_name() {
    let (catalog, adapter) = setup();
    let current = adapter.create(&analytics()).await.expect("create");
    catalog.clear_statements();

    let mut desired = current.clone();
    desired.name = "reporting".into();
    let renamed = adapter.update(&current, &desired).await.expect("rename");

    assert_eq!(renamed.name, "reporting");
    assert_eq!(renamed.id, current.id);
    assert_eq!(
        catalog.statements(),
        vec![r#"ALTER DATABASE "analytics" RENAME TO "reporting""#]
    );

    catalog.clear_statements();
    adapter.delete(&renamed).await.expect("drop");
    assert_eq!(catalog.statements(), vec![r#"DROP DATABASE "reporting""#]);
    assert_eq!(catalog.database_count(), 0);
}

#[tokio::test]
async fn owner_change_issues_only_owner_statement() {
    let (catalog, adapter) = setup();
    let current = adapter.create(&analytics()).await.expect("create");
    catalog.clear_statements();

    let mut desired = current.clone();
    desired.owner = BI;
    let updated = adapter.update(&current, &desired).await.expect("update");

    assert_eq!(
        catalog.statements(),
        vec![r#"ALTER DATABASE "analytics" OWNER TO "bi_admin""#]
    );
    assert_eq!(updated.owner, BI);
}

#[tokio::test]
async fn limit_change_leaves_name_and_owner() {
    let (catalog, adapter) = setup();
    let current = adapter.create(&analytics()).await.expect("create");
    catalog.clear_statements();

    let mut desired = current.clone();
    desired.connection_limit = Some(ConnectionLimit::limited(10));
    let updated = adapter.update(&current, &desired).await.expect("update");

    assert_eq!(
        catalog.statements(),
        vec![r#"ALTER DATABASE "analytics" CONNECTION LIMIT 10"#]
    );
    assert_eq!(updated.name, current.name);
    assert_eq!(updated.owner, current.owner);
    assert_eq!(updated.connection_limit, Some(ConnectionLimit::limited(10)));
}

#[tokio::test]
async fn clearing_limit_resets_to_unlimited() {
    let (catalog, adapter) = setup();
    let current = adapter.create(&analytics()).await.expect("create");
    catalog.clear_statements();

    let mut desired = current.clone();
    desired.connection_limit = None;
    let updated = adapter.update(&current, &desired).await.expect("update");

    assert_eq!(
        catalog.statements(),
        vec![r#"ALTER DATABASE "analytics" CONNECTION LIMIT UNLIMITED"#]
    );
    assert_eq!(updated.connection_limit, Some(ConnectionLimit::unlimited()));
}

#[tokio::test]
async fn combined_update_uses_new_name_after_rename() {
    let (catalog, adapter) = setup();
    let current = adapter.create(&analytics()).await.expect("create");
    catalog.clear_statements();

    let desired = DatabaseResource {
        id: current.id,
        name: "reporting".into(),
        owner: BI,
        connection_limit: Some(ConnectionLimit::limited(5)),
    };
    let updated = adapter.update(&current, &desired).await.expect("update");

    assert_eq!(
        catalog.statements(),
        vec![
            r#"ALTER DATABASE "analytics" RENAME TO "reporting""#,
            r#"ALTER DATABASE "reporting" OWNER TO "bi_admin""#,
            r#"ALTER DATABASE "reporting" CONNECTION LIMIT 5"#,
        ]
    );
    assert_eq!(updated, desired);
}

#[tokio::test]
async fn failed_update_statement_rolls_back_everything() {
    let (catalog, adapter) = setup();
    let current = adapter.create(&analytics()).await.expect("create");
    catalog.reject_statement("CONNECTION LIMIT", "connection limit exceeds cluster maximum");

    let desired = DatabaseResource {
        id: current.id,
        name: "reporting".into(),
        owner: ETL,
        connection_limit: Some(ConnectionLimit::limited(5000)),
    };
    let err = adapter.update(&current, &desired).await.expect_err("rejected");

    assert!(matches!(err, CoreError::Statement { .. }));
    let row = catalog.database(current.id.unwrap()).expect("still present");
    assert_eq!(row.name, "analytics");
    assert_eq!(row.connection_limit.as_deref(), Some("50"));
    assert_eq!(catalog.open_sessions(), 0);
}

#[tokio::test]
async fn update_with_unknown_owner_runs_no_statement() {
    let (catalog, adapter) = setup();
    let current = adapter.create(&analytics()).await.expect("create");
    catalog.clear_statements();

    let mut desired = current.clone();
    desired.name = "reporting".into();
    desired.owner = OwnerId::new(999);
    let err = adapter.update(&current, &desired).await.expect_err("unknown owner");

    assert!(matches!(err, CoreError::NotFound { entity: "user", .. }));
    assert!(catalog.statements().is_empty());
}

#[tokio::test]
async fn update_without_changes_only_refreshes() {
    let (catalog, adapter) = setup();
    let current = adapter.create(&analytics()).await.expect("create");
    catalog.clear_statements();

    let updated = adapter.update(&current, &current).await.expect("noop");

    assert!(catalog.statements().is_empty());
    assert_eq!(updated, current);
}

#[tokio::test]
async fn update_requires_identifier() {
    let (_catalog, adapter) = setup();
    let untracked = analytics();

    let err = adapter
        .update(&untracked, &untracked)
        .await
        .expect_err("no id");

    assert!(matches!(err, CoreError::InvalidState { .. }));
}

#[tokio::test]
async fn exists_distinguishes_absent_from_unreachable() {
    let (catalog, adapter) = setup();
    let created = adapter.create(&analytics()).await.expect("create");
    let id = created.id.unwrap();

    assert!(adapter.exists(id).await.expect("exists"));
    assert!(!adapter.exists(DatabaseId::new(42)).await.expect("never existed"));

    adapter.delete(&created).await.expect("drop");
    assert!(!adapter.exists(id).await.expect("deleted"));

    catalog.set_failing_lookups(true);
    let err = adapter.exists(id).await.expect_err("lookup failure");
    assert!(matches!(err, CoreError::Connection { .. }));
    catalog.set_failing_lookups(false);

    catalog.set_unreachable(true);
    let err = adapter.exists(id).await.expect_err("unreachable");
    assert!(matches!(err, CoreError::Connection { .. }));
    assert_eq!(catalog.open_sessions(), 0);
}

#[tokio::test]
async fn delete_surfaces_engine_error() {
    let (_catalog, adapter) = setup();
    let ghost = DatabaseResource {
        id: Some(DatabaseId::new(7)),
        ..analytics()
    };

    let err = adapter.delete(&ghost).await.expect_err("missing");

    assert!(matches!(err, CoreError::Statement { .. }));
}

#[tokio::test]
async fn import_returns_populated_resource() {
    let (catalog, adapter) = setup();
    let id = catalog.insert_database(DatabaseRow {
        name: "warehouse".into(),
        owner: BI,
        connection_limit: Some("25".into()),
    });

    let imported = adapter.import(id).await.expect("import");

    assert_eq!(
        imported,
        DatabaseResource {
            id: Some(id),
            name: "warehouse".into(),
            owner: BI,
            connection_limit: Some(ConnectionLimit::limited(25)),
        }
    );
}

#[tokio::test]
async fn owner_resolution_is_aligned_with_input() {
    let (catalog, _adapter) = setup();
    catalog.add_user(OwnerId::new(300), "analyst");
    let mut session = catalog.begin().await.expect("begin");

    let names = OwnerResolver::resolve(&mut session, &[BI, OwnerId::new(300), ETL])
        .await
        .expect("resolve");

    assert_eq!(names, vec!["bi_admin", "analyst", "etl_user"]);
    session.rollback().await.expect("rollback");
}

#[tokio::test]
async fn owner_resolution_is_all_or_nothing() {
    let (catalog, _adapter) = setup();
    let mut session = catalog.begin().await.expect("begin");

    let err = OwnerResolver::resolve(&mut session, &[ETL, OwnerId::new(999), BI])
        .await
        .expect_err("one invalid id");

    match err {
        CoreError::NotFound { entity, id } => {
            assert_eq!(entity, "user");
            assert_eq!(id, "999");
        }
        other => panic!("unexpected error: {other}"),
    }
    session.rollback().await.expect("rollback");
}
