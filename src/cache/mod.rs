//! Two-tier response cache.
//!
//! A fast in-process tier backed by an optional shared HTTP tier. The two
//! tiers hold independent copies with independently enforced TTLs and are
//! reconciled only by write-through: a shared-tier hit backfills the fast
//! tier, a `put` writes to both, and nothing is synchronized proactively.

pub mod local;
pub mod shared;

use crate::config::CacheConfig;
use local::{LocalCache, LocalCacheStats};
use serde_json::Value;
use shared::SharedCache;
use std::collections::BTreeMap;
use std::time::Duration;

/// Category of cacheable upstream data, each with its own TTL policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// Account/user records. Change rarely; longer TTL.
    User,
    /// Open-position records. Change continuously; shorter TTL.
    Position,
}

impl ResourceKind {
    /// Stable key prefix for this kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::User => "user",
            ResourceKind::Position => "position",
        }
    }

    /// Upstream endpoint serving this kind.
    #[must_use]
    pub fn endpoint(self) -> &'static str {
        match self {
            ResourceKind::User => "user/get",
            ResourceKind::Position => "position/get",
        }
    }

    /// Configured TTL for this kind.
    #[must_use]
    pub fn ttl(self, config: &CacheConfig) -> Duration {
        match self {
            ResourceKind::User => Duration::from_secs(config.user_ttl_secs),
            ResourceKind::Position => Duration::from_secs(config.position_ttl_secs),
        }
    }
}

/// Builds the canonical cache key for a resource: kind prefix plus the
/// parameters in sorted `k=v` form, so equivalent requests share one entry.
#[must_use]
pub fn cache_key(kind: ResourceKind, params: &BTreeMap<String, String>) -> String {
    let mut key = String::from(kind.as_str());
    for (name, value) in params {
        key.push(if key.contains('=') { '&' } else { ':' });
        key.push_str(name);
        key.push('=');
        key.push_str(value);
    }
    key
}

/// Combined snapshot of both tiers for the health endpoint.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Fast tier counters.
    pub local: LocalCacheStats,
    /// Whether a shared tier is configured.
    pub shared_configured: bool,
    /// Whether the shared tier is currently degraded.
    pub shared_degraded: bool,
}

/// The two-tier response cache.
pub struct ResponseCache {
    config: CacheConfig,
    local: LocalCache,
    shared: Option<SharedCache>,
}

impl ResponseCache {
    /// Creates the cache from configuration. A shared tier that cannot be
    /// set up leaves the cache running on the fast tier alone.
    #[must_use]
    pub fn new(config: CacheConfig, shared_timeout: Duration) -> Self {
        let shared = config
            .shared_url
            .as_deref()
            .and_then(|url| SharedCache::connect(url, shared_timeout));

        Self {
            config,
            local: LocalCache::new(),
            shared,
        }
    }

    /// Looks up `key`: fast tier first, then the shared tier. A shared-tier
    /// hit is written through to the fast tier before returning.
    pub async fn get(&self, key: &str, kind: ResourceKind) -> Option<Value> {
        let ttl = kind.ttl(&self.config);

        if let Some(value) = self.local.get(key, ttl) {
            return Some(value);
        }

        if let Some(shared) = &self.shared
            && let Some(value) = shared.get(key, ttl).await
        {
            self.local.put(key, value.clone());
            return Some(value);
        }

        None
    }

    /// Stores `value` in the fast tier and, best effort, the shared tier.
    pub async fn put(&self, key: &str, value: &Value, kind: ResourceKind) {
        self.local.put(key, value.clone());

        if let Some(shared) = &self.shared {
            shared.put(key, value, kind.ttl(&self.config)).await;
        }
    }

    /// Removes `key` from both tiers immediately.
    pub async fn invalidate(&self, key: &str) {
        self.local.remove(key);

        if let Some(shared) = &self.shared {
            shared.remove(key).await;
        }
    }

    /// Current tier status and counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            local: self.local.stats(),
            shared_configured: self.shared.is_some(),
            shared_degraded: self.shared.as_ref().is_some_and(SharedCache::is_degraded),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> CacheConfig {
        CacheConfig {
            user_ttl_secs: 60,
            position_ttl_secs: 30,
            shared_url: None,
        }
    }

    #[test]
    fn test_cache_key_canonical_order() {
        let mut params = BTreeMap::new();
        params.insert("login".to_string(), "46108".to_string());
        assert_eq!(cache_key(ResourceKind::User, &params), "user:login=46108");

        let mut params = BTreeMap::new();
        params.insert("symbol".to_string(), "EURUSD".to_string());
        params.insert("group".to_string(), "demo*".to_string());
        // BTreeMap iteration sorts by name regardless of insertion order.
        assert_eq!(
            cache_key(ResourceKind::Position, &params),
            "position:group=demo*&symbol=EURUSD"
        );
    }

    #[test]
    fn test_cache_key_no_params() {
        assert_eq!(cache_key(ResourceKind::Position, &BTreeMap::new()), "position");
    }

    #[test]
    fn test_ttl_policy_per_kind() {
        let config = config();
        assert_eq!(ResourceKind::User.ttl(&config), Duration::from_secs(60));
        assert_eq!(ResourceKind::Position.ttl(&config), Duration::from_secs(30));
    }

    #[test]
    fn test_endpoints() {
        assert_eq!(ResourceKind::User.endpoint(), "user/get");
        assert_eq!(ResourceKind::Position.endpoint(), "position/get");
    }

    #[tokio::test]
    async fn test_fast_tier_round_trip_without_shared() {
        let cache = ResponseCache::new(config(), Duration::from_secs(1));

        assert_eq!(cache.get("user:login=1", ResourceKind::User).await, None);

        cache
            .put("user:login=1", &json!({"login": 1}), ResourceKind::User)
            .await;
        assert_eq!(
            cache.get("user:login=1", ResourceKind::User).await,
            Some(json!({"login": 1}))
        );

        cache.invalidate("user:login=1").await;
        assert_eq!(cache.get("user:login=1", ResourceKind::User).await, None);

        let stats = cache.stats();
        assert!(!stats.shared_configured);
        assert!(!stats.shared_degraded);
    }

    #[tokio::test]
    async fn test_unreachable_shared_tier_never_errors() {
        // Nothing listens on this port; every shared-tier call must be
        // absorbed and the fast tier must keep the cache correct.
        let cache = ResponseCache::new(
            CacheConfig {
                shared_url: Some("http://127.0.0.1:1".to_string()),
                ..config()
            },
            Duration::from_millis(200),
        );

        cache
            .put("user:login=1", &json!({"login": 1}), ResourceKind::User)
            .await;
        assert_eq!(
            cache.get("user:login=1", ResourceKind::User).await,
            Some(json!({"login": 1}))
        );

        let stats = cache.stats();
        assert!(stats.shared_configured);
        assert!(stats.shared_degraded);
    }
}
