use crate::query::normalize::{self, QueryDefaults};
use serde::Deserialize;
use std::path::Path;

/// Application configuration loaded from environment variables or TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_flush_count")]
    pub flush_event_count: usize,
    #[serde(default = "default_flush_interval_secs")]
    pub flush_interval_secs: u64,
    /// Lookback window in days applied when a report request omits `from`.
    #[serde(default = "default_window_days")]
    pub default_window_days: u32,
    /// Result count applied when a top-products request omits `limit`.
    #[serde(default = "default_limit")]
    pub default_limit: u32,
    /// Upper bound for the top-products `limit` parameter.
    #[serde(default = "default_max_limit")]
    pub max_limit: u32,
    /// Dashboard origin for CORS restrictions on the reporting routes.
    /// If not set, reporting routes allow any origin.
    #[serde(default)]
    pub dashboard_origin: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    8080
}

const fn default_flush_count() -> usize {
    500
}

const fn default_flush_interval_secs() -> u64 {
    30
}

const fn default_window_days() -> u32 {
    normalize::DEFAULT_WINDOW_DAYS
}

const fn default_limit() -> u32 {
    normalize::DEFAULT_LIMIT
}

const fn default_max_limit() -> u32 {
    normalize::MAX_LIMIT
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            flush_event_count: default_flush_count(),
            flush_interval_secs: default_flush_interval_secs(),
            default_window_days: default_window_days(),
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            dashboard_origin: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, falling back to defaults.
    ///
    /// Environment variables override file values:
    /// - `ANALYTICS_HOST` → host
    /// - `ANALYTICS_PORT` → port
    /// - `ANALYTICS_FLUSH_COUNT` → flush_event_count
    /// - `ANALYTICS_FLUSH_INTERVAL` → flush_interval_secs
    /// - `ANALYTICS_WINDOW_DAYS` → default_window_days
    /// - `ANALYTICS_DEFAULT_LIMIT` → default_limit
    /// - `ANALYTICS_MAX_LIMIT` → max_limit
    /// - `ANALYTICS_DASHBOARD_ORIGIN` → dashboard_origin
    pub fn load(config_path: Option<&Path>) -> Self {
        let mut config =
            config_path.map_or_else(Self::default, |path| match std::fs::read_to_string(path) {
                Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                    tracing::warn!("Failed to parse config file: {e}, using defaults");
                    Self::default()
                }),
                Err(e) => {
                    tracing::warn!("Failed to read config file: {e}, using defaults");
                    Self::default()
                }
            });

        // Environment variable overrides
        if let Ok(host) = std::env::var("ANALYTICS_HOST") {
            config.host = host;
        }
        if let Ok(port) = std::env::var("ANALYTICS_PORT") {
            if let Ok(p) = port.parse() {
                config.port = p;
            }
        }
        if let Ok(count) = std::env::var("ANALYTICS_FLUSH_COUNT") {
            if let Ok(c) = count.parse() {
                config.flush_event_count = c;
            }
        }
        if let Ok(interval) = std::env::var("ANALYTICS_FLUSH_INTERVAL") {
            if let Ok(i) = interval.parse() {
                config.flush_interval_secs = i;
            }
        }
        if let Ok(days) = std::env::var("ANALYTICS_WINDOW_DAYS") {
            if let Ok(d) = days.parse() {
                config.default_window_days = d;
            }
        }
        if let Ok(limit) = std::env::var("ANALYTICS_DEFAULT_LIMIT") {
            if let Ok(l) = limit.parse() {
                config.default_limit = l;
            }
        }
        if let Ok(limit) = std::env::var("ANALYTICS_MAX_LIMIT") {
            if let Ok(l) = limit.parse() {
                config.max_limit = l;
            }
        }
        if let Ok(origin) = std::env::var("ANALYTICS_DASHBOARD_ORIGIN") {
            config.dashboard_origin = Some(origin);
        }

        config
    }

    /// Defaults handed to the query normalizer.
    pub const fn query_defaults(&self) -> QueryDefaults {
        QueryDefaults {
            window_days: self.default_window_days,
            default_limit: self.default_limit,
            max_limit: self.max_limit,
        }
    }
}
