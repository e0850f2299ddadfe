//! Configuration module

use chrono::{DateTime, TimeZone, Utc};
use std::env;
use std::time::Duration;

use crate::models::parse_timestamp;

/// Where simulation rows are read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowSourceKind {
    /// `get-data-for-range` on the predictor backend
    Predictor,
    /// The in-memory dataset store
    Local,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// Predictor backend base URL
    pub predictor_url: String,

    /// Timeout per predictor call, in seconds
    pub predictor_timeout_secs: u64,

    /// Delay between streamed rows, in milliseconds
    pub pacing_interval_ms: u64,

    /// Capacity of the per-connection event channel
    pub event_buffer: usize,

    pub row_source: RowSourceKind,

    /// First synthetic timestamp assigned at ingestion
    pub dataset_epoch: DateTime<Utc>,

    /// Upload size limit in megabytes
    pub max_upload_mb: usize,

    /// Also send uploaded files to the predictor backend
    pub forward_uploads: bool,

    /// Allowed CORS origin; any origin when unset
    pub cors_origin: Option<String>,

    /// Environment (development, production)
    pub environment: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            port: parsed("PORT", 8080),

            predictor_url: env::var("PREDICTOR_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),

            predictor_timeout_secs: parsed("PREDICTOR_TIMEOUT_SECS", 5),

            pacing_interval_ms: parsed("PACING_INTERVAL_MS", 1000),

            event_buffer: parsed::<usize>("EVENT_BUFFER", 32).max(1),

            row_source: match env::var("ROW_SOURCE").as_deref() {
                Ok("local") => RowSourceKind::Local,
                _ => RowSourceKind::Predictor,
            },

            dataset_epoch: env::var("DATASET_EPOCH")
                .ok()
                .and_then(|s| parse_timestamp(&s))
                .unwrap_or_else(default_epoch),

            max_upload_mb: parsed("MAX_UPLOAD_MB", 200),

            forward_uploads: env::var("FORWARD_UPLOADS")
                .map(|s| s.to_lowercase() != "false" && s != "0")
                .unwrap_or(true),

            cors_origin: env::var("CORS_ORIGIN").ok().filter(|s| !s.is_empty()),

            environment: env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
        }
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn predictor_timeout(&self) -> Duration {
        Duration::from_secs(self.predictor_timeout_secs)
    }

    pub fn pacing_interval(&self) -> Duration {
        Duration::from_millis(self.pacing_interval_ms)
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            predictor_url: "http://localhost:8000".to_string(),
            predictor_timeout_secs: 5,
            pacing_interval_ms: 1000,
            event_buffer: 32,
            row_source: RowSourceKind::Predictor,
            dataset_epoch: default_epoch(),
            max_upload_mb: 200,
            forward_uploads: true,
            cors_origin: None,
            environment: "development".to_string(),
        }
    }
}

fn default_epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

fn parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
