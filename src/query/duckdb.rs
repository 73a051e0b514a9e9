use crate::query::normalize::TimeRange;
use crate::query::service::{AnalyticsService, FunnelReport, TopProductMetric};
use crate::query::{funnel, top_products};
use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

/// DuckDB-backed [`AnalyticsService`].
///
/// Queries run on a blocking thread so holding the shared connection lock
/// never stalls a Tokio worker.
pub struct DuckDbAnalytics {
    conn: Arc<Mutex<duckdb::Connection>>,
}

impl DuckDbAnalytics {
    pub const fn new(conn: Arc<Mutex<duckdb::Connection>>) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl AnalyticsService for DuckDbAnalytics {
    async fn funnel_report(&self, range: TimeRange) -> Result<FunnelReport> {
        let conn = Arc::clone(&self.conn);
        let report = tokio::task::spawn_blocking(move || {
            let conn = conn.lock();
            funnel::query_funnel_report(&conn, &range)
        })
        .await
        .context("Funnel query task panicked")??;

        Ok(report)
    }

    async fn top_products(&self, range: TimeRange, limit: u32) -> Result<Vec<TopProductMetric>> {
        let conn = Arc::clone(&self.conn);
        let metrics = tokio::task::spawn_blocking(move || {
            let conn = conn.lock();
            top_products::query_top_products(&conn, &range, limit)
        })
        .await
        .context("Top products query task panicked")??;

        Ok(metrics)
    }
}
