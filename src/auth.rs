//! API-key checking for the gateway's own HTTP surface.
//!
//! Keys are provisioned in configuration and compared by SHA-256 hash so
//! the raw keys never sit in memory longer than startup. An empty key list
//! means open access (the development default of the original service).

use crate::config::AuthConfig;
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::collections::{HashSet, VecDeque};
use std::time::{SystemTime, UNIX_EPOCH};

/// Requests per minute allowed per caller.
pub const DEFAULT_RATE_LIMIT: u32 = 100;

/// Sliding-window rate limiter keyed by caller identity.
#[derive(Debug, Default)]
pub struct RateLimiter {
    /// Request timestamps (ms) per caller.
    windows: DashMap<String, VecDeque<u64>>,
}

impl RateLimiter {
    /// Creates an empty limiter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a request for `caller` and reports whether it is allowed
    /// under `limit` requests per minute.
    pub fn check_and_record(&self, caller: &str, limit: u32) -> bool {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        let window_start = now.saturating_sub(60_000);

        let mut entry = self.windows.entry(caller.to_string()).or_default();
        let window = entry.value_mut();

        while let Some(&front) = window.front() {
            if front < window_start {
                window.pop_front();
            } else {
                break;
            }
        }

        if window.len() < limit as usize {
            window.push_back(now);
            true
        } else {
            false
        }
    }
}

/// Validates inbound API keys and rate-limits callers.
#[derive(Debug, Default)]
pub struct ApiKeyStore {
    key_hashes: HashSet<String>,
    rate_limiter: RateLimiter,
}

impl ApiKeyStore {
    /// Builds the store from configuration.
    #[must_use]
    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            key_hashes: config.api_keys.iter().map(|k| Self::hash_key(k)).collect(),
            rate_limiter: RateLimiter::new(),
        }
    }

    fn hash_key(key: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Whether no keys are configured, i.e. the surface is open.
    #[must_use]
    pub fn open_access(&self) -> bool {
        self.key_hashes.is_empty()
    }

    /// Checks a raw key against the configured set.
    #[must_use]
    pub fn validate_key(&self, raw_key: &str) -> bool {
        self.key_hashes.contains(&Self::hash_key(raw_key))
    }

    /// Records a request for `caller` under the given per-minute limit.
    pub fn check_rate_limit(&self, caller: &str, limit: u32) -> bool {
        self.rate_limiter.check_and_record(caller, limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthConfig;

    #[test]
    fn test_empty_config_is_open_access() {
        let store = ApiKeyStore::from_config(&AuthConfig::default());
        assert!(store.open_access());
        assert!(!store.validate_key("anything"));
    }

    #[test]
    fn test_configured_keys_validate() {
        let store = ApiKeyStore::from_config(&AuthConfig {
            api_keys: vec!["k1".to_string(), "k2".to_string()],
        });

        assert!(!store.open_access());
        assert!(store.validate_key("k1"));
        assert!(store.validate_key("k2"));
        assert!(!store.validate_key("k3"));
        assert!(!store.validate_key(""));
    }

    #[test]
    fn test_rate_limiter_caps_requests() {
        let limiter = RateLimiter::new();

        for _ in 0..10 {
            assert!(limiter.check_and_record("caller", 10));
        }
        assert!(!limiter.check_and_record("caller", 10));
    }

    #[test]
    fn test_rate_limiter_isolates_callers() {
        let limiter = RateLimiter::new();

        for _ in 0..5 {
            assert!(limiter.check_and_record("a", 5));
        }
        assert!(!limiter.check_and_record("a", 5));
        assert!(limiter.check_and_record("b", 5));
    }
}
