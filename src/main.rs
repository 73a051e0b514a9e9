use duckdb::Connection;
use parking_lot::Mutex;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use storefront_analytics::clock::SystemClock;
use storefront_analytics::config::Config;
use storefront_analytics::ingest::buffer::EventBuffer;
use storefront_analytics::ingest::handler::AppState;
use storefront_analytics::query::duckdb::DuckDbAnalytics;
use storefront_analytics::{server, storage};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storefront_analytics=info,tower_http=info".into()),
        )
        .init();

    // Load configuration
    let config_path = std::env::args().nth(1);
    let config = Config::load(config_path.as_deref().map(std::path::Path::new));

    tracing::info!(
        host = %config.host,
        port = config.port,
        "Starting Storefront Analytics"
    );

    // Initialize DuckDB
    let conn = Connection::open_in_memory().expect("Failed to open DuckDB");
    storage::migrations::run_migrations(&conn).expect("Failed to run migrations");

    let conn = Arc::new(Mutex::new(conn));
    let buffer = EventBuffer::new(config.flush_event_count, Arc::clone(&conn));
    let analytics = Arc::new(DuckDbAnalytics::new(conn));

    let state = Arc::new(AppState {
        buffer,
        analytics,
        clock: Arc::new(SystemClock),
        defaults: config.query_defaults(),
        dashboard_origin: config.dashboard_origin.clone(),
        events_ingested_total: AtomicU64::new(0),
        analytics_queries_total: AtomicU64::new(0),
    });

    // Set up periodic flush
    let flush_state = Arc::clone(&state);
    let flush_interval = config.flush_interval_secs;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(flush_interval));
        loop {
            interval.tick().await;
            match flush_state.buffer.flush() {
                Ok(count) if count > 0 => {
                    tracing::info!(count, "Periodic flush completed");
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!(error = %e, "Periodic flush failed");
                }
            }
        }
    });

    let app = server::build_router(state);
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind to {addr}: {e}"));

    tracing::info!(addr = %addr, "Listening");
    axum::serve(listener, app).await.expect("Server error");
}
