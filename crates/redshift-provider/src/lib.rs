//! Database resource adapter.
//! Translates declarative database state into DDL against a cluster catalog.

mod adapter;
pub mod ddl;
pub mod handler;
mod owner;
mod settle;
pub mod testing;

pub use adapter::DatabaseAdapter;
pub use handler::{
    database_schema, Attribute, AttributeType, DatabaseResourceHandler, DatabaseState,
    ResourceSchema, RESOURCE_TYPE,
};
pub use owner::OwnerResolver;
pub use settle::await_database_id;
