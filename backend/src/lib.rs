//! Coffee Shop Material Ledger - Backend
//!
//! Tracks what the shop's menu consumes from stock: recipe resolution,
//! consumption aggregation, weighted-average costing, profit reporting and
//! the daily contracting ledger.

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod cache;
pub mod config;
pub mod error;
pub mod handlers;
pub mod queue;
pub mod routes;
pub mod services;

pub use config::Config;

use cache::ReportCache;
use queue::MessageQueue;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub config: Arc<Config>,
    pub cache: ReportCache,
    pub queue: Arc<dyn MessageQueue>,
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "Coffee Shop Material Ledger API v1"
}

/// Liveness probe
async fn health_check() -> &'static str {
    "OK"
}
