//! Storefront Analytics: self-hosted e-commerce event analytics.
//!
//! Ingests commerce events (product views, cart adds, checkouts, purchases)
//! into DuckDB and serves conversion funnel and top-product reports over a
//! small HTTP API.

pub mod api;
pub mod clock;
pub mod config;
pub mod ingest;
pub mod query;
pub mod server;
pub mod storage;
