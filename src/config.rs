//! Configuration module for loading and parsing TOML configuration files.

use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Minimum WebAPI protocol version the manager API accepts.
const MIN_PROTOCOL_VERSION: u32 = 484;

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse TOML configuration.
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    /// Invalid configuration value.
    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// HTTP server configuration.
    pub server: ServerConfig,
    /// Upstream WebAPI endpoint and credentials.
    pub upstream: UpstreamConfig,
    /// Session lifecycle configuration.
    pub session: SessionConfig,
    /// Response cache configuration.
    pub cache: CacheConfig,
    /// HTTP surface authentication.
    pub auth: AuthConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port number to listen on.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// Upstream WebAPI configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the WebAPI server, e.g. `https://92.204.169.182:443`.
    pub base_url: String,
    /// Manager login.
    pub login: String,
    /// Manager password (the handshake shared secret).
    pub password: String,
    /// Agent string reported in `auth/start`.
    pub agent: String,
    /// WebAPI protocol version. Must be >= 484.
    pub version: u32,
    /// Connection type reported in `auth/start`.
    pub connect_type: String,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Accept invalid TLS certificates (the manager API is commonly served
    /// on a bare IP with a self-signed certificate).
    pub accept_invalid_certs: bool,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            login: String::new(),
            password: String::new(),
            agent: "WebManager".to_string(),
            version: 1290,
            connect_type: "manager".to_string(),
            request_timeout_secs: 30,
            accept_invalid_certs: false,
        }
    }
}

impl UpstreamConfig {
    /// Per-request timeout as a [`Duration`].
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Session lifecycle configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Session time-to-live in seconds.
    pub ttl_secs: u64,
    /// Keep-alive probe interval in seconds.
    pub keepalive_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 300,
            keepalive_secs: 20,
        }
    }
}

impl SessionConfig {
    /// Session time-to-live as a [`Duration`].
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// Keep-alive interval as a [`Duration`].
    #[must_use]
    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_secs(self.keepalive_secs)
    }
}

/// Response cache configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// TTL for account/user records in seconds.
    pub user_ttl_secs: u64,
    /// TTL for open-position records in seconds.
    pub position_ttl_secs: u64,
    /// Base URL of the optional shared cache tier. `None` disables it.
    pub shared_url: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            user_ttl_secs: 60,
            position_ttl_secs: 30,
            shared_url: None,
        }
    }
}

/// HTTP surface authentication configuration.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AuthConfig {
    /// Accepted API keys. Empty list means open access.
    pub api_keys: Vec<String>,
}

impl Config {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    /// Returns error if content cannot be parsed.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.upstream.base_url.is_empty() {
            return Err(ConfigError::InvalidValue(
                "upstream.base_url must be set".to_string(),
            ));
        }
        if self.upstream.login.is_empty() {
            return Err(ConfigError::InvalidValue(
                "upstream.login must be set".to_string(),
            ));
        }
        if self.upstream.password.is_empty() {
            return Err(ConfigError::InvalidValue(
                "upstream.password must be set".to_string(),
            ));
        }
        if self.upstream.version < MIN_PROTOCOL_VERSION {
            return Err(ConfigError::InvalidValue(format!(
                "upstream.version must be >= {MIN_PROTOCOL_VERSION}"
            )));
        }
        if self.upstream.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "upstream.request_timeout_secs must be positive".to_string(),
            ));
        }
        if self.session.ttl_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "session.ttl_secs must be positive".to_string(),
            ));
        }
        if self.session.keepalive_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "session.keepalive_secs must be positive".to_string(),
            ));
        }
        if self.cache.user_ttl_secs == 0 || self.cache.position_ttl_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "cache TTLs must be positive".to_string(),
            ));
        }

        Ok(())
    }
}
