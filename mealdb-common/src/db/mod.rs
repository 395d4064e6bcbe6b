//! Database connection and schema

pub mod init;
pub mod schema;
pub mod table_schemas;

pub use init::{connect, init_database, init_schema, Database};
pub use schema::{SchemaIntrospector, SqlDialect};
pub use table_schemas::{schema_statements, TABLE_NAMES};
