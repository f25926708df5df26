//! Request/response DTOs for the REST API.

use crate::cache::CacheStats;
use crate::session::SessionStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// Health check response.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Overall service status: `healthy` or `degraded`.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Response timestamp.
    pub timestamp: DateTime<Utc>,
    /// Upstream session state.
    pub session: SessionStatus,
    /// Cache tier status.
    pub cache: CacheStatusResponse,
}

/// Cache tier status for the health endpoint.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CacheStatusResponse {
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

impl From<CacheStats> for CacheStatusResponse {
    fn from(stats: CacheStats) -> Self {
        let shared = if !stats.shared_configured {
            "disabled"
        } else if stats.shared_degraded {
            "degraded"
        } else {
            "ok"
        };

        Self {
            local_entries: stats.local.len,
            local_hits: stats.local.hits,
            local_misses: stats.local.misses,
            local_expirations: stats.local.expirations,
            shared: shared.to_string(),
        }
    }
}

/// A fetched resource, tagged with its origin.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FetchResponse {
    /// Always `true`; errors use the error response shape.
    pub success: bool,
    /// The upstream response body.
    pub data: Value,
    /// Whether the value was served from the cache.
    pub cached: bool,
}

impl FetchResponse {
    /// Wraps a dispatched value.
    #[must_use]
    pub fn new(data: Value, cached: bool) -> Self {
        Self {
            success: true,
            data,
            cached,
        }
    }
}

/// Request body for the arbitrary-endpoint passthrough.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ExecuteRequest {
    /// WebAPI endpoint path, e.g. `user/get`.
    pub endpoint: String,
    /// Query parameters for the endpoint.
    #[serde(default)]
    pub params: BTreeMap<String, Value>,
}

/// Request body for user creation.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    /// Parameters forwarded to the upstream `user/add` call.
    #[serde(flatten)]
    pub params: BTreeMap<String, Value>,
}

/// Query parameters for the position lookup family.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct PositionQuery {
    /// Comma-separated login list selector.
    pub login: Option<String>,
    /// Group pattern selector.
    pub group: Option<String>,
    /// Comma-separated ticket list selector.
    pub ticket: Option<String>,
    /// Optional symbol filter, combined with any selector.
    pub symbol: Option<String>,
}

impl PositionQuery {
    /// Flattens the query into upstream parameters. Exclusivity is
    /// enforced by the dispatcher, not here.
    #[must_use]
    pub fn into_params(self) -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();
        if let Some(login) = self.login {
            params.insert("login".to_string(), login);
        }
        if let Some(group) = self.group {
            params.insert("group".to_string(), group);
        }
        if let Some(ticket) = self.ticket {
            params.insert("ticket".to_string(), ticket);
        }
        if let Some(symbol) = self.symbol {
            params.insert("symbol".to_string(), symbol);
        }
        params
    }
}

/// Response for session refresh and status requests.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionResponse {
    /// Whether the operation succeeded.
    pub success: bool,
    /// Session state snapshot.
    pub session: SessionStatus,
}

/// Response for explicit cache invalidation.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InvalidateResponse {
    /// The invalidated key.
    pub key: String,
}

/// Converts JSON parameter values into the string form the WebAPI expects
/// in query strings. Strings pass through unquoted; everything else keeps
/// its JSON rendering.
#[must_use]
pub fn to_query_params(params: BTreeMap<String, Value>) -> BTreeMap<String, String> {
    params
        .into_iter()
        .map(|(name, value)| {
            let rendered = match value {
                Value::String(text) => text,
                other => other.to_string(),
            };
            (name, rendered)
        })
        .collect()
}
