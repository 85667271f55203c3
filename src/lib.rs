#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::unused_async)]

//! fancy-gateway library: an MCP server fronting a single PowerExchange device.
//!
//! Remote MCP clients speak JSON-RPC 2.0 over `POST /mcp`. Each `tools/call`
//! is validated, mapped to a fixed device path, and sent to the device as a
//! plain HTTP GET.
//!
//! ## API surface
//!
//! | Method | Path      | Auth | Description                      |
//! |--------|-----------|------|----------------------------------|
//! | POST   | `/mcp`    | Yes  | JSON-RPC 2.0 (MCP methods)       |
//! | GET    | `/health` | No   | Liveness probe                   |
//! | GET    | `/`       | No   | Server name, version, tool names |
//!
//! ## Layout
//!
//! ```text
//! config.rs        TOML + env-var configuration
//! auth.rs          Authorization header middleware
//! protocol.rs      JSON-RPC envelopes and error codes
//! mcp.rs           method dispatch
//! tools/
//!   mod.rs         ToolName enumeration
//!   mapper.rs      argument validation, tool -> device command
//!   catalog.rs     tools/list definitions and schemas
//! safety.rs        power ceiling clamp
//! device.rs        outbound device HTTP client
//! routes/          axum handlers for /mcp, /health, /
//! ```

pub mod auth;
pub mod config;
pub mod device;
pub mod mcp;
pub mod protocol;
pub mod routes;
pub mod safety;
pub mod state;
pub mod tools;

use axum::{
    middleware,
    routing::{get, post},
    Extension, Router,
};
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::trace::TraceLayer;

pub use auth::AuthToken;
pub use config::Config;
pub use state::AppState;

/// Build the full router: public `/health` and `/`, token-guarded `/mcp`.
///
/// Only `/mcp` is behind the concurrency limit, so requests stuck on a slow
/// device never hold up the liveness probe.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(routes::health::health))
        .route("/", get(routes::info::info));

    let authed_routes = Router::new()
        .route("/mcp", post(routes::mcp::mcp))
        .layer(GlobalConcurrencyLimitLayer::new(
            state.config.server.max_concurrent_requests,
        ))
        .layer(middleware::from_fn(auth::require_token));

    Router::new()
        .merge(public_routes)
        .merge(authed_routes)
        .layer(Extension(AuthToken(state.config.auth.token.clone())))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
