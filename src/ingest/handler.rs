use crate::clock::Clock;
use crate::ingest::buffer::{CommerceEvent, EventBuffer};
use crate::query::normalize::QueryDefaults;
use crate::query::service::AnalyticsService;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Inbound commerce event payload.
#[derive(Debug, Deserialize)]
pub struct EventPayload {
    /// Caller-assigned visitor identifier.
    pub visitor_id: String,
    /// Event name (e.g., "product_view", "purchase").
    pub name: String,
    pub product_id: Option<String>,
    pub product_name: Option<String>,
    /// Units purchased, for purchase events.
    pub quantity: Option<u32>,
    pub revenue_amount: Option<f64>,
    /// ISO 4217 code, truncated to three characters.
    pub revenue_currency: Option<String>,
    /// RFC 3339 instant. Defaults to receipt time.
    pub timestamp: Option<String>,
}

/// Shared application state handed to every route.
pub struct AppState {
    pub buffer: EventBuffer,
    pub analytics: Arc<dyn AnalyticsService>,
    pub clock: Arc<dyn Clock>,
    pub defaults: QueryDefaults,
    pub dashboard_origin: Option<String>,
    pub events_ingested_total: AtomicU64,
    pub analytics_queries_total: AtomicU64,
}

/// POST /api/v1/events - Ingestion endpoint.
///
/// Validates the payload and pushes the event into the buffer.
pub async fn ingest_event(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<EventPayload>,
) -> impl IntoResponse {
    // Validate required fields
    if payload.visitor_id.is_empty() || payload.name.is_empty() {
        return StatusCode::BAD_REQUEST;
    }

    // Length validation to prevent abuse
    if payload.visitor_id.len() > 256
        || payload.name.len() > 256
        || payload.product_id.as_ref().is_some_and(|p| p.len() > 256)
        || payload.product_name.as_ref().is_some_and(|p| p.len() > 512)
    {
        return StatusCode::BAD_REQUEST;
    }

    let timestamp = match payload.timestamp.as_deref() {
        Some(raw) => match DateTime::parse_from_rfc3339(raw) {
            Ok(parsed) => parsed.with_timezone(&Utc),
            Err(_) => return StatusCode::BAD_REQUEST,
        },
        None => state.clock.now(),
    };

    let event = CommerceEvent {
        event_id: uuid::Uuid::new_v4().to_string(),
        visitor_id: sanitize_string(&payload.visitor_id, 256),
        timestamp: timestamp.naive_utc(),
        event_name: sanitize_string(&payload.name, 256),
        product_id: payload
            .product_id
            .as_deref()
            .map(|p| sanitize_string(p, 256)),
        product_name: payload
            .product_name
            .as_deref()
            .map(|p| sanitize_string(p, 512)),
        quantity: payload.quantity,
        revenue_amount: payload.revenue_amount,
        revenue_currency: payload
            .revenue_currency
            .as_deref()
            .map(|c| sanitize_string(c, 3)),
    };

    match state.buffer.push(event) {
        Ok(_) => {
            state.events_ingested_total.fetch_add(1, Ordering::Relaxed);
            StatusCode::ACCEPTED
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to buffer event");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Sanitize a string by truncating to max length and removing control characters.
fn sanitize_string(input: &str, max_len: usize) -> String {
    input
        .chars()
        .filter(|c| !c.is_control())
        .take(max_len)
        .collect()
}
