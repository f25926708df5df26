//! Request and response types for the gateway API.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;


/// Selector for the position lookup family. The gateway accepts exactly
/// one selector per request; the enum makes that rule unrepresentable to
/// violate from this client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PositionSelector {
    /// Comma-separated login list.
    Login(String),
    /// Group pattern, e.g. `demo*`.
    Group(String),
    /// Comma-separated ticket list.
    Ticket(String),
}

impl PositionSelector {
    /// Query parameter name and value for this selector.
    #[must_use]
    pub fn as_query(&self) -> (&'static str, &str) {
        match self {
            Self::Login(value) => ("login", value),
            Self::Group(value) => ("group", value),
            Self::Ticket(value) => ("ticket", value),
        }
    }
}

// ============================================================================
// Health & Session
// ============================================================================

/// Session state snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatus {
    /// State name: `unauthenticated`, `authenticating`, `authenticated` or
    /// `invalid`.
    pub state: String,
    /// When the session was authenticated (RFC 3339).
    #[serde(default)]
    pub authenticated_at: Option<String>,
    /// Seconds until the session expires.
    #[serde(default)]
    pub expires_in_secs: Option<u64>,
    /// When the last keep-alive probe succeeded (RFC 3339).
    #[serde(default)]
    pub last_keepalive: Option<String>,
}

/// Cache tier status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStatus {
    /// Entries currently held in the fast tier.
    pub local_entries: usize,
    /// Fast tier hits since startup.
    pub local_hits: u64,
    /// Fast tier misses since startup.
    pub local_misses: u64,
    /// Fast tier TTL expirations since startup.
    pub local_expirations: u64,
    /// Shared tier state: `disabled`, `ok` or `degraded`.
    pub shared: String,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service version.
    pub version: String,
    /// Response timestamp (RFC 3339).
    pub timestamp: String,
    /// Upstream session state.
    pub session: SessionStatus,
    /// Cache tier status.
    pub cache: CacheStatus,
}

/// Session status/refresh response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    /// Whether the operation succeeded.
    pub success: bool,
    /// Session state snapshot.
    pub session: SessionStatus,
}

// ============================================================================
// Resources & Passthrough
// ============================================================================

/// A fetched resource, tagged with its origin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchResponse {
    /// Whether the request succeeded.
    pub success: bool,
    /// The upstream response body.
    pub data: Value,
    /// Whether the value was served from the gateway's cache.
    pub cached: bool,
}

/// Request body for the arbitrary-endpoint passthrough.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteRequest {
    /// WebAPI endpoint path, e.g. `user/get`.
    pub endpoint: String,
    /// Query parameters for the endpoint.
    #[serde(default)]
    pub params: BTreeMap<String, Value>,
}

/// Response for explicit cache invalidation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvalidateResponse {
    /// The invalidated key.
    pub key: String,
}

/// Error response body returned by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error message.
    pub error: String,
    /// Stable error code.
    pub code: String,
}
