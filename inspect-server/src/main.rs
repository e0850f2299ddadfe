//! IntelliInspect Backend Server
//!
//! Dataset windows, model training proxy and real-time simulation replay.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  INTELLIINSPECT BACKEND                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐  ┌───────────┐  ┌─────────────────────────┐ │
//! │  │  REST API │  │  Dataset  │  │  Simulation Hub         │ │
//! │  │  (Axum)   │  │  Store    │  │  (WebSocket, paced)     │ │
//! │  └─────┬─────┘  └─────┬─────┘  └────────────┬────────────┘ │
//! │        └──────────────┼──────────────────────┘              │
//! │                       ▼                                     │
//! │                ┌─────────────┐                             │
//! │                │  Predictor  │                             │
//! │                └─────────────┘                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod error;
mod handlers;
mod ingest;
mod models;
mod services;
mod store;

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::{Config, RowSourceKind};
use services::{PredictorClient, RowSource, SimulationController};
use store::DatasetStore;

pub use error::{AppError, AppResult};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "intelliinspect_server=debug,tower_http=debug".into());
    if config.is_production() {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!("IntelliInspect server starting...");
    tracing::info!("Predictor: {}", config.predictor_url);

    let predictor = Arc::new(
        PredictorClient::new(&config.predictor_url, config.predictor_timeout())
            .context("failed to build predictor client")?,
    );

    // Build application state
    let state = AppState::new(config.clone(), predictor);

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<DatasetStore>,
    pub predictor: Arc<PredictorClient>,
    pub simulation: SimulationController,
}

impl AppState {
    pub fn new(config: Config, predictor: Arc<PredictorClient>) -> Self {
        let store = Arc::new(DatasetStore::new());

        let rows: Arc<dyn RowSource> = match config.row_source {
            RowSourceKind::Predictor => predictor.clone(),
            RowSourceKind::Local => store.clone(),
        };
        tracing::info!("Simulation rows from {:?} source", config.row_source);

        let simulation = SimulationController::new(rows, predictor.clone(), config.pacing_interval());

        Self { config, store, predictor, simulation }
    }
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    let origin = state
        .config
        .cors_origin
        .as_deref()
        .map(|o| o.parse::<axum::http::HeaderValue>());
    let cors = match origin {
        Some(Ok(origin)) => CorsLayer::new().allow_origin(origin),
        Some(Err(_)) => {
            tracing::warn!("Invalid CORS_ORIGIN, allowing any origin");
            CorsLayer::new().allow_origin(Any)
        }
        None => CorsLayer::new().allow_origin(Any),
    }
    .allow_methods(Any)
    .allow_headers(Any);

    let api_routes = Router::new()
        // Dataset
        .route("/api/dataset/upload", post(handlers::dataset::upload))
        .route("/api/dataset/summary", get(handlers::dataset::summary))
        .route("/api/dataset/validate-ranges", post(handlers::dataset::validate_ranges))

        // Model
        .route("/api/model/train", post(handlers::model::train))
        .route("/api/model/feature-importance", get(handlers::model::feature_importance))
        .route("/api/prediction/predict-single", post(handlers::model::predict_single))
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes()));

    Router::new()
        .route("/health", get(handlers::health::check))
        .route("/simulationHub", get(handlers::simulation::hub))
        .merge(api_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
