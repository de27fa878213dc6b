//! PostgreSQL-protocol catalog adapter for warehouse clusters.

mod catalog;
mod util;

pub use catalog::{PgCatalog, PgCatalogSession};
pub use util::{create_pg_pool, map_sqlx_error};
