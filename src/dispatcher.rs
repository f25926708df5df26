//! Request dispatch over the session manager and response cache.
//!
//! The dispatcher is the only component that composes the others: it
//! validates parameters, consults the cache, ensures a live session, calls
//! upstream, and applies the bounded retry rule: an authentication-scoped
//! upstream failure triggers exactly one re-authenticate-and-retry; a
//! second one surfaces.

use crate::cache::{ResourceKind, ResponseCache, cache_key};
use crate::error::GatewayError;
use crate::session::SessionManager;
use crate::transport::{UpstreamResponse, UpstreamTransport};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[cfg(test)]
mod tests;

/// Passthrough endpoints whose success invalidates a user's cached record.
const USER_MUTATION_ENDPOINTS: &[&str] = &["user/add", "user/update", "user/delete"];

/// Position-lookup selectors; a request must supply exactly one.
const POSITION_SELECTORS: &[&str] = &["login", "group", "ticket"];

/// A dispatched result, tagged with its origin.
#[derive(Debug, Clone)]
pub struct Fetched {
    /// The upstream (or cached) response body.
    pub value: Value,
    /// Whether the value came from the cache.
    pub cached: bool,
}

/// Composes the session manager, cache and transport to answer requests.
pub struct Dispatcher {
    transport: Arc<UpstreamTransport>,
    session: Arc<SessionManager>,
    cache: Arc<ResponseCache>,
}

impl Dispatcher {
    /// Creates a dispatcher over the shared components.
    #[must_use]
    pub fn new(
        transport: Arc<UpstreamTransport>,
        session: Arc<SessionManager>,
        cache: Arc<ResponseCache>,
    ) -> Self {
        Self {
            transport,
            session,
            cache,
        }
    }

    /// Validates the parameter set for a resource kind. Runs before any
    /// I/O; a violation costs no upstream call.
    pub fn validate_params(
        kind: ResourceKind,
        params: &BTreeMap<String, String>,
    ) -> Result<(), GatewayError> {
        match kind {
            ResourceKind::User => {
                if !params.contains_key("login") {
                    return Err(GatewayError::InvalidParameters(
                        "user lookup requires a login".to_string(),
                    ));
                }
            }
            ResourceKind::Position => {
                let supplied: Vec<&str> = POSITION_SELECTORS
                    .iter()
                    .copied()
                    .filter(|s| params.contains_key(*s))
                    .collect();
                if supplied.len() != 1 {
                    return Err(GatewayError::InvalidParameters(format!(
                        "position lookup requires exactly one of login, group or ticket (got {})",
                        if supplied.is_empty() {
                            "none".to_string()
                        } else {
                            supplied.join(", ")
                        }
                    )));
                }
            }
        }
        Ok(())
    }

    /// Fetches a resource, serving from cache when fresh and populating it
    /// on miss.
    ///
    /// # Errors
    /// `InvalidParameters` before any I/O, or an upstream/auth error kind.
    pub async fn fetch_resource(
        &self,
        kind: ResourceKind,
        params: &BTreeMap<String, String>,
    ) -> Result<Fetched, GatewayError> {
        Self::validate_params(kind, params)?;

        let key = cache_key(kind, params);
        if let Some(value) = self.cache.get(&key, kind).await {
            debug!(%key, "cache hit");
            return Ok(Fetched {
                value,
                cached: true,
            });
        }

        debug!(%key, "cache miss");
        let resp = self.authed_get(kind.endpoint(), params).await?;
        self.cache.put(&key, &resp.body, kind).await;

        Ok(Fetched {
            value: resp.body,
            cached: false,
        })
    }

    /// Executes an arbitrary WebAPI endpoint with a live session. Results
    /// are never cached; known mutations invalidate the affected cache
    /// entry on success.
    ///
    /// # Errors
    /// `InvalidParameters` for an empty endpoint, or an upstream/auth
    /// error kind.
    pub async fn execute(
        &self,
        endpoint: &str,
        params: &BTreeMap<String, String>,
    ) -> Result<Value, GatewayError> {
        let endpoint = endpoint.trim_matches('/');
        if endpoint.is_empty() {
            return Err(GatewayError::InvalidParameters(
                "endpoint must not be empty".to_string(),
            ));
        }

        let resp = self.authed_get(endpoint, params).await?;

        // A present-but-failed retcode means the operation did not take
        // effect upstream, so cached reads are still accurate.
        let succeeded = resp.retcode().is_none_or(|code| code.starts_with('0'));
        if succeeded
            && USER_MUTATION_ENDPOINTS.contains(&endpoint)
            && let Some(login) = params.get("login")
        {
            let mut affected = BTreeMap::new();
            affected.insert("login".to_string(), login.clone());
            let key = cache_key(ResourceKind::User, &affected);
            info!(%key, endpoint, "invalidating cache entry after mutation");
            self.cache.invalidate(&key).await;
        }

        Ok(resp.body)
    }

    /// Removes a cache entry from both tiers.
    pub async fn invalidate_key(&self, key: &str) {
        self.cache.invalidate(key).await;
    }

    /// Issues an authenticated GET, re-authenticating at most once when the
    /// upstream stops accepting the session mid-flight.
    async fn authed_get(
        &self,
        endpoint: &str,
        params: &BTreeMap<String, String>,
    ) -> Result<UpstreamResponse, GatewayError> {
        let query: Vec<(&str, String)> = params
            .iter()
            .map(|(name, value)| (name.as_str(), value.clone()))
            .collect();

        self.session.acquire().await?;
        let resp = self.transport.get(endpoint, &query).await?;

        if !resp.is_auth_failure() {
            return Self::unwrap(endpoint, resp);
        }

        warn!(
            endpoint,
            status = resp.status,
            "upstream rejected session, re-authenticating once"
        );
        self.session
            .invalidate(&format!("upstream returned status {}", resp.status))
            .await;
        self.session.acquire().await?;

        let resp = self.transport.get(endpoint, &query).await?;
        Self::unwrap(endpoint, resp)
    }

    fn unwrap(endpoint: &str, resp: UpstreamResponse) -> Result<UpstreamResponse, GatewayError> {
        if resp.is_success() {
            Ok(resp)
        } else {
            Err(GatewayError::Upstream {
                status: resp.status,
                message: format!("{}: {}", endpoint, summarize_body(&resp.body)),
            })
        }
    }
}

fn summarize_body(body: &Value) -> String {
    match body {
        Value::String(text) => text.chars().take(200).collect(),
        other => {
            let text = other.to_string();
            text.chars().take(200).collect()
        }
    }
}
