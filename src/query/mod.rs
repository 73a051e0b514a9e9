//! Read-side query layer: parameter normalization, the backend contract, and
//! the DuckDB implementation behind it.

pub mod duckdb;
pub mod funnel;
pub mod normalize;
pub mod service;
pub mod top_products;

use chrono::{DateTime, Utc};

/// Formats a UTC instant for binding into a `CAST(? AS TIMESTAMP)` parameter.
pub(crate) fn sql_timestamp(instant: &DateTime<Utc>) -> String {
    instant.naive_utc().format("%Y-%m-%d %H:%M:%S%.f").to_string()
}
