//! HTTP client library for the MT5 WebAPI Gateway.
//!
//! This crate provides a typed HTTP client for the gateway's REST API:
//! session lifecycle, cached resource fetches and the arbitrary-endpoint
//! passthrough.
//!
//! # Example
//!
//! ```no_run
//! use gateway_client::{ClientConfig, GatewayClient, PositionSelector};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), gateway_client::Error> {
//!     let client = GatewayClient::new(ClientConfig {
//!         base_url: "http://localhost:8000".into(),
//!         timeout: Duration::from_secs(30),
//!         api_key: Some("k1".into()),
//!     })?;
//!
//!     let health = client.health_check().await?;
//!     println!("Status: {}", health.status);
//!
//!     let user = client.get_user("46108").await?;
//!     println!("Cached: {}", user.cached);
//!
//!     let positions = client
//!         .get_positions(PositionSelector::Group("demo*".into()), None)
//!         .await?;
//!     println!("Positions: {}", positions.data);
//!
//!     Ok(())
//! }
//! ```

mod client;
mod error;
mod types;

pub use client::{ClientConfig, GatewayClient};
pub use error::Error;
pub use types::*;
