//! Minimal HTTP transport for the upstream WebAPI.
//!
//! The WebAPI session is cookie-based: once `auth/answer` succeeds, the
//! server pins the session to the cookies it handed out during the
//! handshake. A single shared [`reqwest::Client`] with its cookie store
//! enabled therefore carries the authenticated session for every later
//! call.

use crate::config::UpstreamConfig;
use crate::error::{AuthError, GatewayError};
use serde_json::Value;

/// Transport-level failures, before any protocol interpretation.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Connection failure or timeout.
    #[error("request failed: {0}")]
    Request(String),

    /// Upstream returned 2xx with a body that is not JSON.
    #[error("invalid response body: {0}")]
    Body(String),
}

impl From<TransportError> for AuthError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Request(msg) => AuthError::Upstream(msg),
            TransportError::Body(msg) => AuthError::ProtocolViolation(msg),
        }
    }
}

impl From<TransportError> for GatewayError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Request(msg) => GatewayError::UpstreamUnavailable(msg),
            TransportError::Body(msg) => GatewayError::ProtocolViolation(msg),
        }
    }
}

/// A parsed upstream response.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    /// HTTP status code.
    pub status: u16,
    /// Parsed JSON body. Non-JSON error bodies are wrapped as a string.
    pub body: Value,
}

impl UpstreamResponse {
    /// Whether the HTTP status is 2xx.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Whether the status indicates the session is no longer accepted.
    #[must_use]
    pub fn is_auth_failure(&self) -> bool {
        self.status == 401 || self.status == 403
    }

    /// The WebAPI result code, if the body carries one.
    #[must_use]
    pub fn retcode(&self) -> Option<&str> {
        self.body.get("retcode").and_then(Value::as_str)
    }

    /// Whether the result code signals success. The WebAPI convention is a
    /// textual code whose form starts with `"0"` (e.g. `"0 Done"`).
    #[must_use]
    pub fn retcode_ok(&self) -> bool {
        self.retcode().is_some_and(|code| code.starts_with('0'))
    }
}

/// HTTP client wrapper for the upstream WebAPI.
#[derive(Debug, Clone)]
pub struct UpstreamTransport {
    client: reqwest::Client,
    base_url: String,
}

impl UpstreamTransport {
    /// Creates a transport from the upstream configuration.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new(config: &UpstreamConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .cookie_store(true)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| GatewayError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Base URL this transport talks to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issues `GET /api/<path>` with the given query parameters.
    ///
    /// # Errors
    /// Returns [`TransportError::Request`] on connection failure or timeout
    /// and [`TransportError::Body`] when a 2xx response is not JSON.
    pub async fn get(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<UpstreamResponse, TransportError> {
        let url = format!("{}/api/{}", self.base_url, path.trim_start_matches('/'));

        let resp = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| TransportError::Request(format!("GET {path}: {e}")))?;

        let status = resp.status().as_u16();
        let text = resp
            .text()
            .await
            .map_err(|e| TransportError::Request(format!("GET {path}: {e}")))?;

        let body = match serde_json::from_str(&text) {
            Ok(value) => value,
            Err(_) if (200..300).contains(&status) => {
                return Err(TransportError::Body(format!(
                    "GET {path}: expected JSON, got {} bytes",
                    text.len()
                )));
            }
            // Error bodies are passed through as-is for diagnostics.
            Err(_) => Value::String(text),
        };

        Ok(UpstreamResponse { status, body })
    }
}
