//! API middleware for API-key checking and rate limiting.

use crate::auth::DEFAULT_RATE_LIMIT;
use crate::error::GatewayError;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Header name for API key.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Prefix for rate-limiting callers without a valid key.
const ANONYMOUS_KEY_PREFIX: &str = "anon_";

/// API-key and rate-limit middleware.
///
/// With keys configured, a missing or invalid `X-API-Key` is rejected with
/// 401 before the handler runs. Without keys the surface is open and
/// callers are rate-limited by client IP. The health endpoint is exempt so
/// monitoring never needs credentials.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.uri().path() == "/health" {
        return next.run(request).await;
    }

    let api_key = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let caller = if state.api_keys.open_access() {
        format!("{}{}", ANONYMOUS_KEY_PREFIX, extract_client_ip(&request))
    } else {
        match api_key {
            Some(ref key) if state.api_keys.validate_key(key) => key.clone(),
            _ => return GatewayError::InvalidApiKey.into_response(),
        }
    };

    let allowed = state
        .api_keys
        .check_rate_limit(&caller, DEFAULT_RATE_LIMIT);

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let reset = now + 60;

    if !allowed {
        return GatewayError::RateLimitExceeded {
            limit: DEFAULT_RATE_LIMIT,
            reset,
            retry_after: 60,
        }
        .into_response();
    }

    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    if let Ok(value) = DEFAULT_RATE_LIMIT.to_string().parse() {
        headers.insert("X-RateLimit-Limit", value);
    }
    if let Ok(value) = reset.to_string().parse() {
        headers.insert("X-RateLimit-Reset", value);
    }

    response
}

/// Extract client IP from request.
fn extract_client_ip(request: &Request<Body>) -> String {
    if let Some(forwarded) = request.headers().get("X-Forwarded-For")
        && let Ok(value) = forwarded.to_str()
        && let Some(ip) = value.split(',').next()
    {
        return ip.trim().to_string();
    }

    if let Some(real_ip) = request.headers().get("X-Real-IP")
        && let Ok(value) = real_ip.to_str()
    {
        return value.to_string();
    }

    "unknown".to_string()
}
