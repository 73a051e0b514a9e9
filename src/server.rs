use crate::api::analytics;
use crate::ingest::handler::{ingest_event, AppState};
use axum::extract::DefaultBodyLimit;
use axum::extract::State;
use axum::http::{header, Method};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Build the Axum router with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    // Permissive CORS for ingestion (storefront trackers run on any origin)
    let ingestion_cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    // Restrictive CORS for the reporting routes
    let analytics_cors = build_dashboard_cors(state.dashboard_origin.as_deref());

    let analytics_routes = Router::new()
        .route("/analytics/funnel", get(analytics::get_funnel))
        .route("/analytics/top-products", get(analytics::get_top_products))
        .layer(analytics_cors);

    // Ingestion with permissive CORS and 16 KB body limit (max valid event ~2 KB)
    let ingestion_routes = Router::new()
        .route("/events", post(ingest_event))
        .layer(DefaultBodyLimit::max(16_384))
        .layer(ingestion_cors);

    let api_routes = Router::new()
        .merge(ingestion_routes)
        .merge(analytics_routes);

    Router::new()
        .route("/health", get(health_check))
        .route("/health/detailed", get(detailed_health_check))
        .route("/metrics", get(prometheus_metrics))
        .nest("/api/v1", api_routes)
        .layer(TimeoutLayer::new(std::time::Duration::from_secs(30)))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Build CORS layer for the reporting routes based on configured origin.
fn build_dashboard_cors(dashboard_origin: Option<&str>) -> CorsLayer {
    dashboard_origin.map_or_else(
        || {
            // No dashboard origin configured: allow all origins.
            // Set `dashboard_origin` in config to restrict cross-origin access.
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        },
        |origin| {
            let allowed_origin = origin
                .parse::<axum::http::HeaderValue>()
                .unwrap_or_else(|_| axum::http::HeaderValue::from_static("*"));
            CorsLayer::new()
                .allow_origin(allowed_origin)
                .allow_methods([Method::GET])
                .allow_headers([header::CONTENT_TYPE])
        },
    )
}

/// GET /health - Simple health check endpoint.
async fn health_check() -> &'static str {
    "ok"
}

/// GET /health/detailed - Detailed health check with system info.
async fn detailed_health_check(
    State(state): State<Arc<AppState>>,
) -> axum::Json<serde_json::Value> {
    use std::sync::atomic::Ordering;

    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "buffered_events": state.buffer.len(),
        "events_ingested_total": state.events_ingested_total.load(Ordering::Relaxed),
        "analytics_queries_total": state.analytics_queries_total.load(Ordering::Relaxed),
    }))
}

/// GET /metrics - Prometheus-compatible metrics endpoint.
async fn prometheus_metrics(
    State(state): State<Arc<AppState>>,
) -> ([(header::HeaderName, &'static str); 1], String) {
    use std::fmt::Write;
    use std::sync::atomic::Ordering;

    let buffered = state.buffer.len();
    let events_ingested = state.events_ingested_total.load(Ordering::Relaxed);
    let queries_served = state.analytics_queries_total.load(Ordering::Relaxed);

    let mut out = String::with_capacity(1024);
    let _ = writeln!(
        out,
        "# HELP analytics_buffered_events Number of events in the in-memory buffer"
    );
    let _ = writeln!(out, "# TYPE analytics_buffered_events gauge");
    let _ = writeln!(out, "analytics_buffered_events {buffered}");
    let _ = writeln!(
        out,
        "# HELP analytics_events_ingested_total Total events successfully buffered since startup"
    );
    let _ = writeln!(out, "# TYPE analytics_events_ingested_total counter");
    let _ = writeln!(out, "analytics_events_ingested_total {events_ingested}");
    let _ = writeln!(
        out,
        "# HELP analytics_queries_total Total reporting queries served since startup"
    );
    let _ = writeln!(out, "# TYPE analytics_queries_total counter");
    let _ = writeln!(out, "analytics_queries_total {queries_served}");

    ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], out)
}
