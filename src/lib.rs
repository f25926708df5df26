//! # MT5 WebAPI Gateway
//!
//! A long-lived caching gateway in front of the MT5 WebAPI manager
//! interface. The gateway authenticates once using the vendor's MD5
//! challenge-response handshake, keeps that session alive with a periodic
//! probe, and answers downstream HTTP callers through a two-tier response
//! cache so repeated lookups do not each pay an upstream round trip or a
//! re-authentication. Built with [Axum](https://crates.io/crates/axum) for
//! the HTTP surface and [reqwest](https://crates.io/crates/reqwest) for the
//! upstream side.
//!
//! ## Key Features
//!
//! - **Single-flight authentication**: concurrent callers that need a
//!   session while one handshake is running all share its outcome; the
//!   upstream never sees two competing handshakes.
//!
//! - **Session keep-alive**: a background probe refreshes the session's
//!   liveness; a failed probe invalidates it so the next request
//!   re-authenticates on demand.
//!
//! - **Two-tier response cache**: a fast in-process tier backed by an
//!   optional shared tier, with per-resource TTLs and graceful degradation
//!   when the shared tier is unreachable.
//!
//! - **Bounded retry**: an upstream call rejected for authentication
//!   triggers exactly one re-authenticate-and-retry before surfacing.
//!
//! - **OpenAPI Documentation**: Swagger UI at `/swagger-ui/`.
//!
//! ## Architecture
//!
//! ```text
//! HTTP caller → api (axum) → Dispatcher → ResponseCache (local + shared)
//!                                       → SessionManager → UpstreamTransport → MT5 WebAPI
//! ```
//!
//! ## Module Structure
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`api`] | Route handlers, router configuration and middleware |
//! | [`auth`] | API-key checking for the gateway's own callers |
//! | [`cache`] | Two-tier response cache with per-resource TTLs |
//! | [`config`] | TOML configuration loading and validation |
//! | [`dispatcher`] | Cache-then-fetch orchestration with bounded retry |
//! | [`error`] | Gateway error taxonomy with `IntoResponse` mapping |
//! | [`hasher`] | MD5 challenge-response credential hashing |
//! | [`models`] | Request/response DTOs with OpenAPI schemas |
//! | [`session`] | Session state machine, single-flight handshake, keep-alive |
//! | [`state`] | Application state wiring |
//! | [`transport`] | Minimal HTTP client for the upstream WebAPI |
//!
//! ## API Endpoints
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | GET | `/health` | Health, session and cache status |
//! | GET | `/api/v1/session` | Session state snapshot |
//! | POST | `/api/v1/session/refresh` | Force re-authentication |
//! | GET | `/api/v1/users/{login}` | User record (cached, 60 s TTL) |
//! | GET | `/api/v1/positions` | Open positions (cached, 30 s TTL) |
//! | POST | `/api/v1/users` | Create a user upstream |
//! | POST | `/api/v1/execute` | Arbitrary WebAPI endpoint passthrough |
//! | DELETE | `/api/v1/cache/{key}` | Explicit cache invalidation |
//!
//! ## Example Usage
//!
//! ```bash
//! # Start against a config file
//! GATEWAY_CONFIG=gateway.toml cargo run
//!
//! # Fetch a user (second call within 60 s is served from cache)
//! curl -H 'X-API-Key: k1' http://localhost:8000/api/v1/users/46108
//!
//! # Open positions for a group
//! curl -H 'X-API-Key: k1' 'http://localhost:8000/api/v1/positions?group=demo*'
//!
//! # Arbitrary endpoint passthrough
//! curl -X POST -H 'X-API-Key: k1' -H 'Content-Type: application/json' \
//!   -d '{"endpoint": "time/server"}' http://localhost:8000/api/v1/execute
//! ```

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod hasher;
pub mod models;
pub mod session;
pub mod state;
pub mod transport;
