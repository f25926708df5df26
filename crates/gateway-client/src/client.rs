//! HTTP client for the gateway API.

use crate::error::Error;
use crate::types::*;
use reqwest::Client;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

#[cfg(test)]
mod tests;

/// Header carrying the gateway API key.
const API_KEY_HEADER: &str = "X-API-Key";

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the gateway (e.g., "http://localhost:8000").
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
    /// API key sent with every request, if the gateway requires one.
    pub api_key: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout: Duration::from_secs(30),
            api_key: None,
        }
    }
}

/// HTTP client for the MT5 WebAPI Gateway.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl GatewayClient {
    /// Creates a new client with the given configuration.
    ///
    /// # Errors
    /// Returns error if the base URL is invalid or the HTTP client cannot
    /// be built.
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        Url::parse(&config.base_url)?;
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
        })
    }

    /// Creates a new client with default configuration.
    ///
    /// # Errors
    /// Returns error if the base URL is invalid or the HTTP client cannot
    /// be built.
    pub fn with_base_url(base_url: &str) -> Result<Self, Error> {
        Self::new(ClientConfig {
            base_url: base_url.to_string(),
            ..Default::default()
        })
    }

    /// Base URL this client talks to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        let mut builder = self.client.request(method, url);
        if let Some(key) = &self.api_key {
            builder = builder.header(API_KEY_HEADER, key);
        }
        builder
    }

    // ========================================================================
    // Health & Session
    // ========================================================================

    /// Performs a health check.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn health_check(&self) -> Result<HealthResponse, Error> {
        let url = format!("{}/health", self.base_url);
        let resp = self.request(reqwest::Method::GET, url).send().await?;
        self.handle_response(resp).await
    }

    /// Gets the upstream session status.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn session_status(&self) -> Result<SessionResponse, Error> {
        let url = format!("{}/api/v1/session", self.base_url);
        let resp = self.request(reqwest::Method::GET, url).send().await?;
        self.handle_response(resp).await
    }

    /// Forces re-authentication with the upstream server.
    ///
    /// # Errors
    /// Returns error if the request fails or the handshake is rejected.
    pub async fn refresh_session(&self) -> Result<SessionResponse, Error> {
        let url = format!("{}/api/v1/session/refresh", self.base_url);
        let resp = self.request(reqwest::Method::POST, url).send().await?;
        self.handle_response(resp).await
    }

    // ========================================================================
    // Resources
    // ========================================================================

    /// Gets a user record by login.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn get_user(&self, login: &str) -> Result<FetchResponse, Error> {
        let url = format!("{}/api/v1/users/{}", self.base_url, login);
        let resp = self.request(reqwest::Method::GET, url).send().await?;
        self.handle_response(resp).await
    }

    /// Gets open positions for the given selector, with an optional symbol
    /// filter.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn get_positions(
        &self,
        selector: PositionSelector,
        symbol: Option<&str>,
    ) -> Result<FetchResponse, Error> {
        let url = format!("{}/api/v1/positions", self.base_url);
        let (name, value) = selector.as_query();

        let mut query: Vec<(&str, &str)> = vec![(name, value)];
        if let Some(symbol) = symbol {
            query.push(("symbol", symbol));
        }

        let resp = self
            .request(reqwest::Method::GET, url)
            .query(&query)
            .send()
            .await?;
        self.handle_response(resp).await
    }

    /// Creates a user upstream.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn create_user(
        &self,
        params: &BTreeMap<String, Value>,
    ) -> Result<FetchResponse, Error> {
        let url = format!("{}/api/v1/users", self.base_url);
        let resp = self
            .request(reqwest::Method::POST, url)
            .json(params)
            .send()
            .await?;
        self.handle_response(resp).await
    }

    // ========================================================================
    // Passthrough & cache administration
    // ========================================================================

    /// Executes an arbitrary WebAPI endpoint through the gateway.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn execute(&self, request: &ExecuteRequest) -> Result<FetchResponse, Error> {
        let url = format!("{}/api/v1/execute", self.base_url);
        let resp = self
            .request(reqwest::Method::POST, url)
            .json(request)
            .send()
            .await?;
        self.handle_response(resp).await
    }

    /// Removes a cache entry from both gateway tiers.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn invalidate_cache(&self, key: &str) -> Result<InvalidateResponse, Error> {
        let url = format!("{}/api/v1/cache/{}", self.base_url, key);
        let resp = self.request(reqwest::Method::DELETE, url).send().await?;
        self.handle_response(resp).await
    }

    // ========================================================================
    // Internal Helpers
    // ========================================================================

    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, Error> {
        let status = resp.status();

        if status.is_success() {
            Ok(resp.json().await?)
        } else if status.as_u16() == 401 {
            let text = resp.text().await.unwrap_or_default();
            Err(Error::Unauthorized(text))
        } else if status.as_u16() == 404 {
            let text = resp.text().await.unwrap_or_default();
            Err(Error::NotFound(text))
        } else {
            let text = resp.text().await.unwrap_or_default();
            Err(Error::Api {
                status: status.as_u16(),
                message: text,
            })
        }
    }
}
