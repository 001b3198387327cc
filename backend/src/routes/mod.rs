//! Route definitions for the material ledger API

use axum::{
    routing::{get, post},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/contracting", contracting_routes())
        .nest("/materials", material_routes())
        .nest("/recipes", recipe_routes())
        .nest("/reports", report_routes())
}

/// Daily contracting and reconciliation routes
fn contracting_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_contractings).post(handlers::create_contracting),
        )
        .route("/calculate-consumption", get(handlers::calculate_consumption))
        .route("/calculate-remaining", post(handlers::calculate_remaining))
        .route("/available", get(handlers::get_available_quantity))
        .route("/remains", post(handlers::record_remain))
        .route(
            "/orders/:order_id/consumption",
            post(handlers::enqueue_order_consumption),
        )
        .route(
            "/:id",
            get(handlers::get_contracting).put(handlers::update_contracting),
        )
}

/// Material catalogue routes
fn material_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_materials))
        .route("/:id", get(handlers::get_material))
}

/// Recipe routes
fn recipe_routes() -> Router<AppState> {
    Router::new().route("/:product_id/resolve", get(handlers::resolve_recipe))
}

/// Reporting routes
fn report_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/profit-on-material-import",
            get(handlers::get_profit_on_material_import),
        )
        .route("/cogs-breakdown", get(handlers::get_cogs_breakdown))
        .route(
            "/material-consumption",
            get(handlers::get_material_consumption_report),
        )
        .route("/dashboard", get(handlers::get_dashboard))
}
