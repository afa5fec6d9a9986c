use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handler::{self, AppState};

/// Build the axum router with all protolab endpoints.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handler::health_handler))
        .route("/status", get(handler::status_handler))
        .route("/reset", post(handler::reset_handler))
        .route("/merge", post(handler::merge_handler))
        .route("/merge-with", post(handler::merge_with_handler))
        .route("/merge-defaults-deep", post(handler::merge_defaults_deep_handler))
        .route("/scenarios/run", post(handler::run_battery_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
