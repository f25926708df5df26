//! Upstream session lifecycle.
//!
//! The gateway holds exactly one authenticated WebAPI session. The manager
//! owns its state machine (`Unauthenticated | Authenticating |
//! Authenticated | Invalid`); every transition happens under the slot
//! mutex, and at most one handshake is in flight at any time. Callers that
//! arrive while a handshake is running subscribe to its outcome instead of
//! starting their own, so N concurrent acquisitions produce exactly one
//! `auth/start`/`auth/answer` pair.

use crate::config::{SessionConfig, UpstreamConfig};
use crate::error::AuthError;
use crate::hasher;
use crate::transport::UpstreamTransport;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, info, warn};
use utoipa::ToSchema;

/// Endpoint used by the keep-alive probe. Server time is the cheapest
/// authenticated call the manager API offers.
const KEEPALIVE_ENDPOINT: &str = "time/server";

/// Immutable credential set, fixed at process start.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Manager login.
    pub login: String,
    /// Shared secret.
    pub password: String,
    /// Agent string for `auth/start`.
    pub agent: String,
    /// Protocol version.
    pub version: u32,
    /// Connection type (`manager`).
    pub connect_type: String,
}

impl From<&UpstreamConfig> for Credentials {
    fn from(config: &UpstreamConfig) -> Self {
        Self {
            login: config.login.clone(),
            password: config.password.clone(),
            agent: config.agent.clone(),
            version: config.version,
            connect_type: config.connect_type.clone(),
        }
    }
}

/// An authenticated session.
///
/// The wire-level session rides on the transport's cookie store; this
/// value is the metadata needed to reason about its lifetime.
#[derive(Debug, Clone)]
pub struct Session {
    authenticated_at: Instant,
    expires_at: Instant,
    /// Wall-clock handshake completion time, for reporting.
    pub authenticated_at_utc: DateTime<Utc>,
}

impl Session {
    /// Whether the session TTL has elapsed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    /// Time until expiry, zero when already expired.
    #[must_use]
    pub fn expires_in(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }

    /// Age of the session.
    #[must_use]
    pub fn age(&self) -> Duration {
        self.authenticated_at.elapsed()
    }
}

/// Serializable session state snapshot for the health/status endpoints.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionStatus {
    /// Current state name.
    pub state: String,
    /// When the current session was authenticated (RFC 3339).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authenticated_at: Option<DateTime<Utc>>,
    /// Seconds until the current session expires.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in_secs: Option<u64>,
    /// When the last keep-alive probe succeeded (RFC 3339).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_keepalive: Option<DateTime<Utc>>,
}

enum Slot {
    Unauthenticated,
    Authenticating(broadcast::Sender<Result<Session, AuthError>>),
    Authenticated(Session),
    Invalid { reason: String },
}

impl Slot {
    fn state_name(&self) -> &'static str {
        match self {
            Slot::Unauthenticated => "unauthenticated",
            Slot::Authenticating(_) => "authenticating",
            Slot::Authenticated(_) => "authenticated",
            Slot::Invalid { .. } => "invalid",
        }
    }
}

/// Owns the single upstream session and serializes all handshakes.
pub struct SessionManager {
    transport: Arc<UpstreamTransport>,
    credentials: Credentials,
    ttl: Duration,
    keepalive_interval: Duration,
    slot: Mutex<Slot>,
    last_keepalive: parking_lot::RwLock<Option<DateTime<Utc>>>,
}

impl SessionManager {
    /// Creates a manager over the given transport.
    #[must_use]
    pub fn new(
        transport: Arc<UpstreamTransport>,
        credentials: Credentials,
        config: &SessionConfig,
    ) -> Self {
        Self {
            transport,
            credentials,
            ttl: config.ttl(),
            keepalive_interval: config.keepalive_interval(),
            slot: Mutex::new(Slot::Unauthenticated),
            last_keepalive: parking_lot::RwLock::new(None),
        }
    }

    /// Returns a session guaranteed authenticated and unexpired at the
    /// moment of return. No I/O when the current session is still live;
    /// otherwise joins or starts the single handshake flight.
    ///
    /// # Errors
    /// Propagates the handshake outcome shared by every concurrent caller.
    pub async fn acquire(self: &Arc<Self>) -> Result<Session, AuthError> {
        let mut rx = {
            let mut slot = self.slot.lock().await;
            match &*slot {
                Slot::Authenticated(session) if !session.is_expired() => {
                    return Ok(session.clone());
                }
                Slot::Authenticating(tx) => tx.subscribe(),
                _ => {
                    let (tx, rx) = broadcast::channel(1);
                    *slot = Slot::Authenticating(tx);

                    // The flight runs detached so a caller that gives up
                    // cannot strand the waiters mid-handshake.
                    let manager = Arc::clone(self);
                    tokio::spawn(async move { manager.run_handshake().await });

                    rx
                }
            }
        };

        match rx.recv().await {
            Ok(outcome) => outcome,
            Err(_) => Err(AuthError::Upstream(
                "authentication task failed before completing".to_string(),
            )),
        }
    }

    /// Unconditionally discards the current session and authenticates
    /// again. Collapses into an already-running handshake if one exists.
    ///
    /// # Errors
    /// Propagates the handshake outcome.
    pub async fn force_refresh(self: &Arc<Self>) -> Result<Session, AuthError> {
        {
            let mut slot = self.slot.lock().await;
            if !matches!(&*slot, Slot::Authenticating(_)) {
                info!("forcing session refresh");
                *slot = Slot::Invalid {
                    reason: "forced refresh".to_string(),
                };
            }
        }
        self.acquire().await
    }

    /// Marks the session invalid. The next [`Self::acquire`] call
    /// re-authenticates; this call itself never does.
    pub async fn invalidate(&self, reason: &str) {
        let mut slot = self.slot.lock().await;
        // An in-flight handshake owns the slot; its outcome supersedes.
        if !matches!(&*slot, Slot::Authenticating(_)) {
            warn!("session invalidated: {reason}");
            *slot = Slot::Invalid {
                reason: reason.to_string(),
            };
        }
    }

    /// Snapshot of the current session state.
    pub async fn status(&self) -> SessionStatus {
        let slot = self.slot.lock().await;
        let (authenticated_at, expires_in_secs) = match &*slot {
            Slot::Authenticated(session) => (
                Some(session.authenticated_at_utc),
                Some(session.expires_in().as_secs()),
            ),
            _ => (None, None),
        };

        SessionStatus {
            state: slot.state_name().to_string(),
            authenticated_at,
            expires_in_secs,
            last_keepalive: *self.last_keepalive.read(),
        }
    }

    /// Runs the keep-alive loop until the process exits. Spawned once at
    /// startup; failures invalidate the session and leave re-authentication
    /// to the next demand-driven acquire.
    pub async fn run_keepalive(self: Arc<Self>) {
        let mut interval = tokio::time::interval(self.keepalive_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick fires immediately; skip it so the probe starts one
        // interval after startup.
        interval.tick().await;

        loop {
            interval.tick().await;
            self.keepalive_probe().await;
        }
    }

    async fn keepalive_probe(&self) {
        {
            let slot = self.slot.lock().await;
            match &*slot {
                Slot::Authenticated(session) if !session.is_expired() => {}
                _ => return,
            }
        }

        match self.transport.get(KEEPALIVE_ENDPOINT, &[]).await {
            Ok(resp) if resp.is_success() => {
                debug!("keep-alive probe ok");
                *self.last_keepalive.write() = Some(Utc::now());
            }
            Ok(resp) => {
                self.invalidate(&format!(
                    "keep-alive probe returned status {}",
                    resp.status
                ))
                .await;
            }
            Err(e) => {
                self.invalidate(&format!("keep-alive probe failed: {e}")).await;
            }
        }
    }

    /// Performs one handshake and publishes the outcome to every waiter.
    async fn run_handshake(&self) {
        let outcome = self.handshake().await;

        let mut slot = self.slot.lock().await;
        let next = match &outcome {
            Ok(session) => {
                info!(
                    login = %self.credentials.login,
                    "upstream authentication successful"
                );
                Slot::Authenticated(session.clone())
            }
            Err(e) => {
                warn!("upstream authentication failed: {e}");
                Slot::Invalid {
                    reason: e.to_string(),
                }
            }
        };

        if let Slot::Authenticating(tx) = std::mem::replace(&mut *slot, next) {
            // Waiters may all have gone away; that is fine.
            let _ = tx.send(outcome);
        }
    }

    /// The two-step challenge-response exchange.
    async fn handshake(&self) -> Result<Session, AuthError> {
        let creds = &self.credentials;
        debug!("starting handshake against {}", self.transport.base_url());

        let start = self
            .transport
            .get(
                "auth/start",
                &[
                    ("version", creds.version.to_string()),
                    ("agent", creds.agent.clone()),
                    ("login", creds.login.clone()),
                    ("type", creds.connect_type.clone()),
                ],
            )
            .await?;
        if !start.is_success() {
            return Err(AuthError::Upstream(format!(
                "auth/start returned status {}",
                start.status
            )));
        }

        let srv_rand = start
            .body
            .get("srv_rand")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                AuthError::ProtocolViolation("auth/start response missing srv_rand".to_string())
            })?;

        let answer = hasher::challenge_answer(&creds.password, srv_rand)?;
        let cli_rand = hasher::client_nonce();

        let resp = self
            .transport
            .get(
                "auth/answer",
                &[
                    ("srv_rand_answer", answer),
                    ("cli_rand", cli_rand.clone()),
                ],
            )
            .await?;
        if !resp.is_success() {
            return Err(AuthError::Upstream(format!(
                "auth/answer returned status {}",
                resp.status
            )));
        }

        let retcode = resp.retcode().ok_or_else(|| {
            AuthError::ProtocolViolation("auth/answer response missing retcode".to_string())
        })?;
        if !retcode.starts_with('0') {
            return Err(AuthError::Rejected(retcode.to_string()));
        }

        // Mutual authentication: the server proves the shared secret over
        // our nonce. A mismatch is suspicious but not fatal.
        if let Some(proof) = resp.body.get("cli_rand_answer").and_then(Value::as_str)
            && !hasher::verify_server_proof(&creds.password, &cli_rand, proof)
        {
            warn!("server authentication proof mismatch");
        }

        let now = Instant::now();
        Ok(Session {
            authenticated_at: now,
            expires_at: now + self.ttl,
            authenticated_at_utc: Utc::now(),
        })
    }
}
