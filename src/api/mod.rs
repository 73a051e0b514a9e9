//! HTTP API handlers and error mapping.

pub mod analytics;
pub mod errors;
