//! EcoAmigo Backend
//!
//! REST backend for the community eco-habits tracker: quiz results, tips,
//! habit tracking and the community wall, persisted as JSON documents in SQLite.

mod api;
mod config;
mod db;
mod errors;
mod instrument;
mod logsink;
mod models;

use std::sync::Arc;

use axum::{middleware, routing::get, Router};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::DocumentStore;
use logsink::{LogKind, LogSink};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<DocumentStore>,
    pub logs: Arc<LogSink>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Record an entry in the log sink. A failed flush is reported through
    /// `tracing` and never fails the request being served.
    pub fn log(&self, kind: LogKind, message: impl Into<String>, data: Value) {
        if let Err(e) = self.logs.record(kind, message, data) {
            tracing::warn!("Failed to write log buffer: {}", e);
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting EcoAmigo Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Log directory: {:?}", config.log_dir);
    tracing::info!("Bind address: {}", config.bind_addr);

    let logs = Arc::new(LogSink::new(&config.log_dir, config.log_buffer_size));

    // Initialize database
    let pool = match db::init_database(&config.db_path).await {
        Ok(pool) => pool,
        Err(e) => {
            logs.error("Failed to connect to the document store", &e)?;
            return Err(e.into());
        }
    };
    logs.info(
        "Connected to the document store",
        json!({ "path": config.db_path.display().to_string() }),
    )?;
    let store = Arc::new(DocumentStore::new(pool, config.store_timeout));

    // Create application state
    let state = AppState {
        store: store.clone(),
        logs: logs.clone(),
        config: Arc::new(config.clone()),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    logs.info(
        format!("Server started on http://{}", config.bind_addr),
        Value::Null,
    )?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down");
    store.close().await;
    let flushed = logs.flush()?;
    tracing::info!("Flushed {} buffered log entries", flushed);

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API routes
    let api_routes = api::routes();

    // Health check
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    instrument::instrument_layer,
                )),
        )
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

/// Resolves on Ctrl-C.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
