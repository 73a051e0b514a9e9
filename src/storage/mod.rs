//! DuckDB schema and migrations.

pub mod migrations;
pub mod schema;
