//! Core domain types and traits for the warehouse database resource provider.

pub mod config;
pub mod database;
pub mod error;
pub mod ids;
pub mod traits;

pub use config::{ConnectionConfig, LoggingConfig, ProviderConfig, SettleConfig};
pub use database::{ConnectionLimit, DatabaseResource, DatabaseRow};
pub use error::{CoreError, CoreResult};
pub use ids::{DatabaseId, OwnerId};
pub use traits::{Catalog, CatalogSession};
