//! Integration test harness for the MT5 WebAPI Gateway.
//!
//! Boots everything in-process on ephemeral ports: a mock WebAPI upstream
//! that speaks the real challenge-response handshake, and optionally the
//! gateway itself served over HTTP. Tests drive the stack through
//! [`gateway_client`] or against the components directly, with no external
//! server required.

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use mt5_webapi_gateway::api::create_router;
use mt5_webapi_gateway::config::{
    AuthConfig, CacheConfig, Config, ServerConfig, SessionConfig, UpstreamConfig,
};
use mt5_webapi_gateway::hasher;
use mt5_webapi_gateway::state::AppState;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::net::TcpListener;

/// Manager password the mock upstream validates against.
pub const PASSWORD: &str = "ApiDubai@2025";

/// Manager login the mock upstream expects.
pub const LOGIN: &str = "47325";

/// Fixed server challenge the mock hands out.
pub const SRV_RAND: &str = "0f1e2d3c4b5a69788796a5b4c3d2e1f0";

/// Call counters and behavior switches for the mock upstream.
#[derive(Debug, Default)]
pub struct MockState {
    /// `auth/start` calls observed.
    pub auth_start_calls: AtomicUsize,
    /// `auth/answer` calls observed.
    pub auth_answer_calls: AtomicUsize,
    /// `user/get` calls observed.
    pub user_get_calls: AtomicUsize,
    /// `user/add` and `user/update` calls observed.
    pub user_add_calls: AtomicUsize,
    /// `position/get` calls observed.
    pub position_get_calls: AtomicUsize,
    /// `time/server` calls observed.
    pub time_server_calls: AtomicUsize,
    /// Milliseconds `auth/start` stalls before answering. Lets tests hold
    /// a handshake open while more callers pile in.
    pub auth_delay_ms: AtomicUsize,
    /// When set, `auth/answer` rejects with an invalid-password retcode.
    pub reject_credentials: AtomicBool,
    /// Number of upcoming resource calls to answer with 401.
    pub deny_next_fetches: AtomicUsize,
    /// When set, `time/server` answers 500.
    pub fail_keepalive: AtomicBool,
}

impl MockState {
    fn consume_denial(&self) -> bool {
        self.deny_next_fetches
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

/// A mock WebAPI upstream bound to an ephemeral port.
pub struct MockUpstream {
    /// Base URL (`http://127.0.0.1:<port>`).
    pub base_url: String,
    /// Shared counters and switches.
    pub state: Arc<MockState>,
}

async fn auth_start(State(state): State<Arc<MockState>>) -> Json<serde_json::Value> {
    state.auth_start_calls.fetch_add(1, Ordering::SeqCst);

    let delay = state.auth_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay as u64)).await;
    }

    Json(json!({ "retcode": "0 Done", "srv_rand": SRV_RAND }))
}

async fn auth_answer(
    State(state): State<Arc<MockState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<serde_json::Value> {
    state.auth_answer_calls.fetch_add(1, Ordering::SeqCst);

    let expected = hasher::challenge_answer(PASSWORD, SRV_RAND).expect("valid challenge");
    let answer_ok = params.get("srv_rand_answer") == Some(&expected);

    if state.reject_credentials.load(Ordering::SeqCst) || !answer_ok {
        return Json(json!({ "retcode": "3 Invalid password" }));
    }

    // Prove the shared secret over the client nonce the way the real
    // server does: the same MD5 chain, fed the nonce instead of the
    // challenge.
    let proof = params
        .get("cli_rand")
        .and_then(|cli_rand| hasher::challenge_answer(PASSWORD, cli_rand).ok())
        .unwrap_or_default();

    Json(json!({ "retcode": "0 Done", "cli_rand_answer": proof }))
}

async fn user_get(
    State(state): State<Arc<MockState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    state.user_get_calls.fetch_add(1, Ordering::SeqCst);

    if state.consume_denial() {
        return (StatusCode::UNAUTHORIZED, "session expired").into_response();
    }

    let login = params.get("login").cloned().unwrap_or_default();
    Json(json!({
        "retcode": "0 Done",
        "answer": { "Login": login, "Name": "Test User", "Group": "demo\\usd" }
    }))
    .into_response()
}

async fn user_add(
    State(state): State<Arc<MockState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    state.user_add_calls.fetch_add(1, Ordering::SeqCst);

    if state.consume_denial() {
        return (StatusCode::UNAUTHORIZED, "session expired").into_response();
    }

    let login = params.get("login").cloned().unwrap_or_default();
    Json(json!({
        "retcode": "0 Done",
        "answer": { "Login": login }
    }))
    .into_response()
}

async fn position_get(
    State(state): State<Arc<MockState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    state.position_get_calls.fetch_add(1, Ordering::SeqCst);

    if state.consume_denial() {
        return (StatusCode::UNAUTHORIZED, "session expired").into_response();
    }

    Json(json!({
        "retcode": "0 Done",
        "answer": [
            { "Position": 1, "Symbol": "EURUSD", "Login": params.get("login") }
        ]
    }))
    .into_response()
}

async fn time_server(State(state): State<Arc<MockState>>) -> Response {
    state.time_server_calls.fetch_add(1, Ordering::SeqCst);

    if state.fail_keepalive.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "maintenance").into_response();
    }

    Json(json!({ "retcode": "0 Done", "time": "2025.01.01 00:00:00" })).into_response()
}

/// Starts the mock upstream on an ephemeral port.
pub async fn spawn_mock_upstream() -> MockUpstream {
    let state = Arc::new(MockState::default());

    let app = Router::new()
        .route("/api/auth/start", get(auth_start))
        .route("/api/auth/answer", get(auth_answer))
        .route("/api/user/get", get(user_get))
        .route("/api/user/add", get(user_add))
        .route("/api/user/update", get(user_add))
        .route("/api/position/get", get(position_get))
        .route("/api/time/server", get(time_server))
        .with_state(Arc::clone(&state));

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock upstream");
    let addr = listener.local_addr().expect("mock upstream addr");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve mock upstream");
    });

    MockUpstream {
        base_url: format!("http://{addr}"),
        state,
    }
}

/// Gateway configuration pointed at a mock upstream, with fast timeouts.
#[must_use]
pub fn test_config(upstream_url: &str) -> Config {
    Config {
        server: ServerConfig::default(),
        upstream: UpstreamConfig {
            base_url: upstream_url.to_string(),
            login: LOGIN.to_string(),
            password: PASSWORD.to_string(),
            request_timeout_secs: 5,
            ..Default::default()
        },
        session: SessionConfig {
            ttl_secs: 300,
            keepalive_secs: 1,
        },
        cache: CacheConfig::default(),
        auth: AuthConfig::default(),
    }
}

/// A gateway instance served on an ephemeral port.
pub struct Gateway {
    /// Base URL of the gateway HTTP surface.
    pub base_url: String,
    /// The state behind the router, for direct component access.
    pub state: Arc<AppState>,
}

/// Builds the gateway from `config` and serves it on an ephemeral port.
/// The keep-alive loop is not started; tests spawn it when they need it.
pub async fn spawn_gateway(config: Config) -> Gateway {
    let state = Arc::new(AppState::from_config(config).expect("build state"));
    let app = create_router(Arc::clone(&state));

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind gateway");
    let addr = listener.local_addr().expect("gateway addr");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve gateway");
    });

    Gateway {
        base_url: format!("http://{addr}"),
        state,
    }
}

/// Creates a client for a spawned gateway.
#[must_use]
pub fn create_test_client(
    gateway: &Gateway,
    api_key: Option<&str>,
) -> gateway_client::GatewayClient {
    gateway_client::GatewayClient::new(gateway_client::ClientConfig {
        base_url: gateway.base_url.clone(),
        timeout: Duration::from_secs(5),
        api_key: api_key.map(str::to_string),
    })
    .expect("build client")
}
