//! REST API for the cost dashboard

pub mod handlers;
pub mod service;

pub use service::DashboardService;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub fn create_router(service: Arc<DashboardService>) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(handlers::health))
        .route("/api/v1/dashboard", get(handlers::get_dashboard))
        .route("/api/v1/overview", get(handlers::get_overview))
        .route("/api/v1/orders", get(handlers::get_orders))
        .route("/api/v1/aggregates", get(handlers::get_aggregates))
        .route("/api/v1/forecast", get(handlers::get_forecast))
        .route("/api/v1/recommendations", get(handlers::get_recommendations))
        // State and middleware
        .with_state(service)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
