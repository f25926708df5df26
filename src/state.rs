//! Application state management.

use crate::auth::ApiKeyStore;
use crate::cache::ResponseCache;
use crate::config::Config;
use crate::dispatcher::Dispatcher;
use crate::error::GatewayError;
use crate::session::{Credentials, SessionManager};
use crate::transport::UpstreamTransport;
use std::sync::Arc;
use tracing::info;

/// Application state shared across all handlers.
pub struct AppState {
    /// Loaded configuration.
    pub config: Config,
    /// Upstream session manager.
    pub session: Arc<SessionManager>,
    /// Two-tier response cache.
    pub cache: Arc<ResponseCache>,
    /// Request dispatcher.
    pub dispatcher: Dispatcher,
    /// API-key store for the HTTP surface.
    pub api_keys: ApiKeyStore,
}

impl AppState {
    /// Builds the component graph from configuration: one transport (the
    /// session carrier), one session manager, one cache, one dispatcher.
    ///
    /// # Errors
    /// Returns error if the upstream HTTP client cannot be built.
    pub fn from_config(config: Config) -> Result<Self, GatewayError> {
        let transport = Arc::new(UpstreamTransport::new(&config.upstream)?);
        let session = Arc::new(SessionManager::new(
            Arc::clone(&transport),
            Credentials::from(&config.upstream),
            &config.session,
        ));
        let cache = Arc::new(ResponseCache::new(
            config.cache.clone(),
            config.upstream.request_timeout(),
        ));
        let dispatcher = Dispatcher::new(
            Arc::clone(&transport),
            Arc::clone(&session),
            Arc::clone(&cache),
        );
        let api_keys = ApiKeyStore::from_config(&config.auth);

        if api_keys.open_access() {
            info!("no API keys configured, surface is open");
        }

        Ok(Self {
            config,
            session,
            cache,
            dispatcher,
            api_keys,
        })
    }

    /// Spawns the session keep-alive loop.
    pub fn spawn_keepalive(&self) {
        tokio::spawn(Arc::clone(&self.session).run_keepalive());
    }
}
