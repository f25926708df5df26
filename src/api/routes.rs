//! Route configuration.

use crate::api::{handlers, middleware};
use crate::state::AppState;
use axum::Router;
use axum::routing::{delete, get, post};
use std::sync::Arc;

/// Creates the API router.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Session
        .route("/api/v1/session", get(handlers::get_session))
        .route("/api/v1/session/refresh", post(handlers::refresh_session))
        // Resources
        .route(
            "/api/v1/users",
            post(handlers::create_user),
        )
        .route("/api/v1/users/{login}", get(handlers::get_user))
        .route("/api/v1/positions", get(handlers::get_positions))
        // Passthrough
        .route("/api/v1/execute", post(handlers::execute))
        // Cache administration
        .route("/api/v1/cache/{key}", delete(handlers::invalidate_cache))
        .layer(axum::middleware::from_fn_with_state(
            Arc::clone(&state),
            middleware::auth_middleware,
        ))
        .with_state(state)
}
