//! Optional shared cache tier.
//!
//! Talks to an external key/value service over plain HTTP so multiple
//! gateway instances can share fetched responses. Every operation is best
//! effort: a failure flips the tier into degraded mode (logged once) and
//! the caller proceeds on the fast tier alone.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

/// Envelope stored in the shared tier. The gateway enforces TTL from
/// `stored_at_ms` itself, independent of any expiry the remote service
/// applies.
#[derive(Debug, Serialize, Deserialize)]
struct SharedEntry {
    stored_at_ms: u64,
    value: Value,
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Client for the shared cache service.
pub struct SharedCache {
    client: reqwest::Client,
    base_url: String,
    degraded: AtomicBool,
}

impl SharedCache {
    /// Creates a shared tier client. Returns `None` when the HTTP client
    /// cannot be built, which leaves the cache on the fast tier alone.
    pub fn connect(base_url: &str, timeout: Duration) -> Option<Self> {
        let client = match reqwest::Client::builder().timeout(timeout).build() {
            Ok(client) => client,
            Err(e) => {
                warn!("shared cache disabled, client build failed: {e}");
                return None;
            }
        };

        Some(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            degraded: AtomicBool::new(false),
        })
    }

    /// Whether the last operation against the tier failed.
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }

    fn note_failure(&self, op: &str, detail: &str) {
        if !self.degraded.swap(true, Ordering::Relaxed) {
            warn!("shared cache degraded ({op}): {detail}");
        }
    }

    fn note_success(&self) {
        if self.degraded.swap(false, Ordering::Relaxed) {
            info!("shared cache recovered");
        }
    }

    fn cache_url(&self) -> String {
        format!("{}/cache", self.base_url)
    }

    /// Fetches `key` if the stored entry is younger than `ttl`.
    pub async fn get(&self, key: &str, ttl: Duration) -> Option<Value> {
        let resp = self
            .client
            .get(self.cache_url())
            .query(&[("key", key)])
            .send()
            .await;

        let resp = match resp {
            Ok(resp) => resp,
            Err(e) => {
                self.note_failure("get", &e.to_string());
                return None;
            }
        };

        if resp.status().as_u16() == 404 {
            self.note_success();
            return None;
        }
        if !resp.status().is_success() {
            self.note_failure("get", &format!("status {}", resp.status()));
            return None;
        }

        match resp.json::<SharedEntry>().await {
            Ok(entry) => {
                self.note_success();
                let age_ms = now_ms().saturating_sub(entry.stored_at_ms);
                if Duration::from_millis(age_ms) < ttl {
                    Some(entry.value)
                } else {
                    None
                }
            }
            Err(e) => {
                self.note_failure("get", &e.to_string());
                None
            }
        }
    }

    /// Stores `value` under `key`. The TTL is passed to the remote service
    /// as a housekeeping hint; freshness is still enforced on read.
    pub async fn put(&self, key: &str, value: &Value, ttl: Duration) {
        let entry = SharedEntry {
            stored_at_ms: now_ms(),
            value: value.clone(),
        };

        let result = self
            .client
            .put(self.cache_url())
            .query(&[("key", key.to_string()), ("ttl_secs", ttl.as_secs().to_string())])
            .json(&entry)
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => self.note_success(),
            Ok(resp) => self.note_failure("put", &format!("status {}", resp.status())),
            Err(e) => self.note_failure("put", &e.to_string()),
        }
    }

    /// Removes `key` from the tier.
    pub async fn remove(&self, key: &str) {
        let result = self
            .client
            .delete(self.cache_url())
            .query(&[("key", key)])
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() || resp.status().as_u16() == 404 => {
                self.note_success();
            }
            Ok(resp) => self.note_failure("remove", &format!("status {}", resp.status())),
            Err(e) => self.note_failure("remove", &e.to_string()),
        }
    }
}
