//! Error types for the gateway core and its REST surface.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

#[cfg(test)]
mod tests;

/// API error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error message.
    pub error: String,
    /// Error code.
    pub code: String,
}

/// Rate limit error response body.
#[derive(Debug, Serialize)]
pub struct RateLimitErrorResponse {
    /// Error message.
    pub error: String,
    /// Error code.
    pub code: String,
    /// Maximum requests allowed.
    pub limit: u32,
    /// Unix timestamp when the rate limit resets.
    pub reset: u64,
    /// Seconds until reset.
    pub retry_after: u64,
}

/// Authentication handshake failures.
///
/// Kept as its own cloneable type so a single handshake outcome can be
/// fanned out to every caller waiting on it.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    /// Upstream response missing or malformed an expected handshake field.
    #[error("handshake protocol violation: {0}")]
    ProtocolViolation(String),

    /// Handshake completed but the server rejected the credentials.
    #[error("authentication rejected by server: {0}")]
    Rejected(String),

    /// Transport failure or timeout during the handshake.
    #[error("upstream unavailable during handshake: {0}")]
    Upstream(String),
}

/// Gateway error types.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Upstream response missing or malformed an expected field.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// The upstream server rejected the credentials.
    #[error("authentication rejected: {0}")]
    AuthRejected(String),

    /// Transport failure or timeout on an upstream call.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Upstream returned a non-success HTTP status.
    #[error("upstream error ({status}): {message}")]
    Upstream {
        /// HTTP status code returned by the upstream server.
        status: u16,
        /// Response body or reason.
        message: String,
    },

    /// Caller-supplied parameters violate a resource's rules.
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// Missing or invalid API key.
    #[error("invalid or missing API key")]
    InvalidApiKey,

    /// Rate limit exceeded.
    #[error("rate limit exceeded")]
    RateLimitExceeded {
        /// Maximum requests allowed.
        limit: u32,
        /// Unix timestamp when the rate limit resets.
        reset: u64,
        /// Seconds until reset.
        retry_after: u64,
    },

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<AuthError> for GatewayError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::ProtocolViolation(msg) => GatewayError::ProtocolViolation(msg),
            AuthError::Rejected(code) => GatewayError::AuthRejected(code),
            AuthError::Upstream(msg) => GatewayError::UpstreamUnavailable(msg),
        }
    }
}

impl GatewayError {
    /// Status code and stable error code for this error kind.
    #[must_use]
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            GatewayError::ProtocolViolation(_) => (StatusCode::BAD_GATEWAY, "PROTOCOL_VIOLATION"),
            GatewayError::AuthRejected(_) => (StatusCode::BAD_GATEWAY, "AUTH_REJECTED"),
            GatewayError::UpstreamUnavailable(_) => {
                (StatusCode::GATEWAY_TIMEOUT, "UPSTREAM_UNAVAILABLE")
            }
            GatewayError::Upstream { .. } => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
            GatewayError::InvalidParameters(_) => (StatusCode::BAD_REQUEST, "INVALID_PARAMETERS"),
            GatewayError::InvalidApiKey => (StatusCode::UNAUTHORIZED, "INVALID_API_KEY"),
            GatewayError::RateLimitExceeded { .. } => {
                (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMIT_EXCEEDED")
            }
            GatewayError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        match &self {
            GatewayError::RateLimitExceeded {
                limit,
                reset,
                retry_after,
            } => {
                let body = Json(RateLimitErrorResponse {
                    error: "Rate limit exceeded".to_string(),
                    code: "RATE_LIMIT_EXCEEDED".to_string(),
                    limit: *limit,
                    reset: *reset,
                    retry_after: *retry_after,
                });

                (
                    StatusCode::TOO_MANY_REQUESTS,
                    [
                        ("X-RateLimit-Limit", limit.to_string()),
                        ("X-RateLimit-Reset", reset.to_string()),
                        ("Retry-After", retry_after.to_string()),
                    ],
                    body,
                )
                    .into_response()
            }
            _ => {
                let (status, code) = self.status_and_code();

                let body = Json(ErrorResponse {
                    error: self.to_string(),
                    code: code.to_string(),
                });

                (status, body).into_response()
            }
        }
    }
}
