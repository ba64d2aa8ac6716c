//! Router configuration for the HTTP API.
//!
//! This module sets up all routes, middleware (CORS, compression, tracing),
//! and creates the axum router ready for serving.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers;
use super::state::AppState;

/// Create the main application router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Windows
        .route(
            "/windows/{assessment_id}/{student_id}",
            get(handlers::get_window).put(handlers::assign_window),
        )
        .route(
            "/windows/{assessment_id}/{student_id}/reschedules",
            get(handlers::window_history),
        )
        // Access polling
        .route("/access/{assessment_id}/{student_id}", get(handlers::check_access))
        // Reschedules
        .route(
            "/reschedules",
            get(handlers::list_reschedules).post(handlers::create_reschedule),
        )
        .route("/reschedules/validate", post(handlers::validate_reschedule))
        .route("/reschedules/{id}", get(handlers::get_reschedule))
        .route("/reschedules/{id}/cancel", post(handlers::cancel_reschedule))
        .route("/students/{id}/reschedules", get(handlers::student_reschedules));

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/v1", api_v1)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
