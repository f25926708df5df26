//! MT5 WebAPI Gateway Server
//!
//! Caching session gateway in front of the MT5 WebAPI manager interface.

use mt5_webapi_gateway::api::create_router;
use mt5_webapi_gateway::config::Config;
use mt5_webapi_gateway::state::AppState;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use mt5_webapi_gateway::models::{
    CacheStatusResponse, CreateUserRequest, ExecuteRequest, FetchResponse, HealthResponse,
    InvalidateResponse, SessionResponse,
};
use mt5_webapi_gateway::session::SessionStatus;

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    paths(
        mt5_webapi_gateway::api::handlers::health_check,
        mt5_webapi_gateway::api::handlers::get_session,
        mt5_webapi_gateway::api::handlers::refresh_session,
        mt5_webapi_gateway::api::handlers::get_user,
        mt5_webapi_gateway::api::handlers::get_positions,
        mt5_webapi_gateway::api::handlers::create_user,
        mt5_webapi_gateway::api::handlers::execute,
        mt5_webapi_gateway::api::handlers::invalidate_cache,
    ),
    components(
        schemas(
            HealthResponse,
            CacheStatusResponse,
            SessionStatus,
            SessionResponse,
            FetchResponse,
            CreateUserRequest,
            ExecuteRequest,
            InvalidateResponse,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Session", description = "Upstream session lifecycle"),
        (name = "Resources", description = "Cached resource access"),
        (name = "Passthrough", description = "Arbitrary WebAPI endpoint execution"),
        (name = "Cache", description = "Cache administration"),
    ),
    info(
        title = "MT5 WebAPI Gateway",
        version = "0.2.0",
        description = "Caching session gateway for the MT5 WebAPI",
        license(name = "MIT")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path =
        std::env::var("GATEWAY_CONFIG").unwrap_or_else(|_| "gateway.toml".to_string());
    let config = Config::load(&config_path)?;
    info!("Loaded configuration from {}", config_path);
    info!("Upstream WebAPI server: {}", config.upstream.base_url);

    // Host and port from environment override the config file
    let host = std::env::var("HOST").unwrap_or_else(|_| config.server.host.clone());
    let port: u16 = match std::env::var("PORT") {
        Ok(value) => value.parse()?,
        Err(_) => config.server.port,
    };

    // Create application state
    let state = Arc::new(AppState::from_config(config)?);

    // Start the keep-alive loop and attempt an eager first authentication
    // so the first caller does not pay for the handshake. A failure here is
    // not fatal; the next request retries on demand.
    state.spawn_keepalive();
    if let Err(e) = state.session.acquire().await {
        warn!("initial authentication failed (will retry on first request): {e}");
    }

    info!("Starting MT5 WebAPI Gateway on {}:{}", host, port);
    info!(
        "Swagger UI available at http://{}:{}/swagger-ui/",
        host, port
    );

    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the router
    let app = create_router(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start the server
    let addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
