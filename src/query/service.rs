//! Analytics backend contract.
//!
//! Handlers resolve raw parameters first and then delegate to this trait with
//! arguments that are already valid, so implementations never re-check the
//! range or the limit. The DuckDB implementation lives in
//! [`crate::query::duckdb`]; tests substitute in-memory stubs.

use crate::query::normalize::TimeRange;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One step of the conversion funnel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunnelStage {
    pub stage: String,
    /// Distinct visitors who reached this stage inside the range.
    pub visitors: u64,
    /// Share of first-stage visitors who reached this stage.
    pub conversion_rate: f64,
}

/// Conversion funnel report over a time range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunnelReport {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub stages: Vec<FunnelStage>,
    /// Last-stage visitors over first-stage visitors. 0.0 when the funnel is empty.
    pub overall_conversion_rate: f64,
}

/// Aggregated performance of a single product over a time range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopProductMetric {
    pub product_id: String,
    pub product_name: Option<String>,
    pub views: u64,
    pub purchases: u64,
    pub units_sold: u64,
    pub revenue: f64,
}

/// Read-side analytics engine behind the reporting endpoints.
#[async_trait]
pub trait AnalyticsService: Send + Sync {
    /// Computes the conversion funnel for the given range.
    async fn funnel_report(&self, range: TimeRange) -> anyhow::Result<FunnelReport>;

    /// Ranks products by revenue, purchases, then views, descending.
    /// Returns at most `limit` entries.
    async fn top_products(
        &self,
        range: TimeRange,
        limit: u32,
    ) -> anyhow::Result<Vec<TopProductMetric>>;
}
