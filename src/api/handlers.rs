//! API request handlers.

use crate::cache::ResourceKind;
use crate::error::GatewayError;
use crate::models::{
    CreateUserRequest, ExecuteRequest, FetchResponse, HealthResponse, InvalidateResponse,
    PositionQuery, SessionResponse, to_query_params,
};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, Query, State};
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;

// ============================================================================
// Health
// ============================================================================

/// Health check endpoint.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service health and upstream status", body = HealthResponse)
    ),
    tag = "Health"
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let session = state.session.status().await;
    let cache = state.cache.stats();

    let status = if cache.shared_configured && cache.shared_degraded {
        "degraded"
    } else {
        "healthy"
    };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        session,
        cache: cache.into(),
    })
}

// ============================================================================
// Session
// ============================================================================

/// Get the upstream session status.
#[utoipa::path(
    get,
    path = "/api/v1/session",
    responses(
        (status = 200, description = "Current session state", body = SessionResponse)
    ),
    tag = "Session"
)]
pub async fn get_session(State(state): State<Arc<AppState>>) -> Json<SessionResponse> {
    Json(SessionResponse {
        success: true,
        session: state.session.status().await,
    })
}

/// Force re-authentication with the upstream server.
#[utoipa::path(
    post,
    path = "/api/v1/session/refresh",
    responses(
        (status = 200, description = "Re-authentication succeeded", body = SessionResponse),
        (status = 502, description = "Handshake rejected or malformed"),
        (status = 504, description = "Upstream unreachable")
    ),
    tag = "Session"
)]
pub async fn refresh_session(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SessionResponse>, GatewayError> {
    state.session.force_refresh().await?;

    Ok(Json(SessionResponse {
        success: true,
        session: state.session.status().await,
    }))
}

// ============================================================================
// Resources
// ============================================================================

/// Get a user record, served from cache when fresh.
#[utoipa::path(
    get,
    path = "/api/v1/users/{login}",
    params(
        ("login" = String, Path, description = "User login")
    ),
    responses(
        (status = 200, description = "User record", body = FetchResponse),
        (status = 502, description = "Upstream error"),
        (status = 504, description = "Upstream unreachable")
    ),
    tag = "Resources"
)]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(login): Path<String>,
) -> Result<Json<FetchResponse>, GatewayError> {
    let mut params = BTreeMap::new();
    params.insert("login".to_string(), login);

    let fetched = state
        .dispatcher
        .fetch_resource(ResourceKind::User, &params)
        .await?;

    Ok(Json(FetchResponse::new(fetched.value, fetched.cached)))
}

/// Get open positions for exactly one of a login list, group pattern or
/// ticket list.
#[utoipa::path(
    get,
    path = "/api/v1/positions",
    params(
        ("login" = Option<String>, Query, description = "Comma-separated login list"),
        ("group" = Option<String>, Query, description = "Group pattern"),
        ("ticket" = Option<String>, Query, description = "Comma-separated ticket list"),
        ("symbol" = Option<String>, Query, description = "Optional symbol filter")
    ),
    responses(
        (status = 200, description = "Open positions", body = FetchResponse),
        (status = 400, description = "Selector rule violated"),
        (status = 502, description = "Upstream error")
    ),
    tag = "Resources"
)]
pub async fn get_positions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PositionQuery>,
) -> Result<Json<FetchResponse>, GatewayError> {
    let params = query.into_params();

    let fetched = state
        .dispatcher
        .fetch_resource(ResourceKind::Position, &params)
        .await?;

    Ok(Json(FetchResponse::new(fetched.value, fetched.cached)))
}

/// Create a user upstream. Bypasses the cache and invalidates the user's
/// entry on success.
#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = CreateUserRequest,
    responses(
        (status = 200, description = "Upstream user/add response", body = FetchResponse),
        (status = 502, description = "Upstream error")
    ),
    tag = "Resources"
)]
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateUserRequest>,
) -> Result<Json<FetchResponse>, GatewayError> {
    let params = to_query_params(request.params);
    let value = state.dispatcher.execute("user/add", &params).await?;

    Ok(Json(FetchResponse::new(value, false)))
}

// ============================================================================
// Passthrough & cache administration
// ============================================================================

/// Execute an arbitrary WebAPI endpoint with the gateway's session.
#[utoipa::path(
    post,
    path = "/api/v1/execute",
    request_body = ExecuteRequest,
    responses(
        (status = 200, description = "Upstream response", body = FetchResponse),
        (status = 400, description = "Empty endpoint"),
        (status = 502, description = "Upstream error")
    ),
    tag = "Passthrough"
)]
pub async fn execute(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ExecuteRequest>,
) -> Result<Json<FetchResponse>, GatewayError> {
    let params = to_query_params(request.params);
    let value = state.dispatcher.execute(&request.endpoint, &params).await?;

    Ok(Json(FetchResponse::new(value, false)))
}

/// Remove a cache entry from both tiers.
#[utoipa::path(
    delete,
    path = "/api/v1/cache/{key}",
    params(
        ("key" = String, Path, description = "Canonical cache key, e.g. `user:login=46108`")
    ),
    responses(
        (status = 200, description = "Entry removed", body = InvalidateResponse)
    ),
    tag = "Cache"
)]
pub async fn invalidate_cache(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Json<InvalidateResponse> {
    state.dispatcher.invalidate_key(&key).await;

    Json(InvalidateResponse { key })
}
