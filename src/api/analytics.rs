use crate::api::errors::ApiError;
use crate::clock::Clock;
use crate::ingest::handler::AppState;
use crate::query::normalize::{clamp_limit, resolve_time_range, QueryDefaults, TimeRange};
use crate::query::service::{FunnelReport, TopProductMetric};
use axum::extract::{Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Query parameters for `GET /api/v1/analytics/funnel`.
#[derive(Debug, Default, Deserialize)]
pub struct FunnelParams {
    pub from: Option<String>,
    pub to: Option<String>,
}

/// Query parameters for `GET /api/v1/analytics/top-products`.
///
/// `limit` stays signed here so negative values clamp instead of failing
/// extraction.
#[derive(Debug, Default, Deserialize)]
pub struct TopProductsParams {
    pub from: Option<String>,
    pub to: Option<String>,
    pub limit: Option<i64>,
}

impl FunnelParams {
    fn time_range(
        &self,
        defaults: &QueryDefaults,
        clock: &dyn Clock,
    ) -> Result<TimeRange, ApiError> {
        resolve_range_params(self.from.as_deref(), self.to.as_deref(), defaults, clock)
    }
}

impl TopProductsParams {
    fn time_range(
        &self,
        defaults: &QueryDefaults,
        clock: &dyn Clock,
    ) -> Result<TimeRange, ApiError> {
        resolve_range_params(self.from.as_deref(), self.to.as_deref(), defaults, clock)
    }

    fn result_limit(&self, defaults: &QueryDefaults) -> u32 {
        clamp_limit(self.limit, defaults)
    }
}

fn resolve_range_params(
    from: Option<&str>,
    to: Option<&str>,
    defaults: &QueryDefaults,
    clock: &dyn Clock,
) -> Result<TimeRange, ApiError> {
    let from = from.map(|raw| parse_timestamp("from", raw)).transpose()?;
    let to = to.map(|raw| parse_timestamp("to", raw)).transpose()?;
    Ok(resolve_time_range(from, to, defaults, clock)?)
}

fn parse_timestamp(field: &str, raw: &str) -> Result<DateTime<Utc>, ApiError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|_| {
            ApiError::BadRequest(format!(
                "Invalid {field} timestamp: '{raw}'. Use RFC 3339, e.g. 2024-01-01T00:00:00Z"
            ))
        })
}

/// GET /api/v1/analytics/funnel - Conversion funnel over the requested range.
pub async fn get_funnel(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FunnelParams>,
) -> Result<Json<FunnelReport>, ApiError> {
    let range = params.time_range(&state.defaults, state.clock.as_ref())?;

    let report = state.analytics.funnel_report(range).await?;
    state.analytics_queries_total.fetch_add(1, Ordering::Relaxed);

    Ok(Json(report))
}

/// GET /api/v1/analytics/top-products - Product ranking over the requested range.
pub async fn get_top_products(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TopProductsParams>,
) -> Result<Json<Vec<TopProductMetric>>, ApiError> {
    let range = params.time_range(&state.defaults, state.clock.as_ref())?;
    let limit = params.result_limit(&state.defaults);

    let products = state.analytics.top_products(range, limit).await?;
    state.analytics_queries_total.fetch_add(1, Ordering::Relaxed);

    Ok(Json(products))
}
