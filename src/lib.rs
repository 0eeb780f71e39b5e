//! Read-only viewer for an Algorand event-ticketing application.
//!
//! Reads the application's global state through algod, keeps a wallet
//! session through pluggable providers, and presents both either as plain
//! text or through a small local HTTP/WebSocket API.

pub mod app;
pub mod chain;
pub mod config;
pub mod error;
pub mod render;
pub mod routes;
pub mod state;
pub mod viewer;
pub mod wallet;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;

use state::AppState;

/// Build the full HTTP router: `/api/*` plus `/ws`.
pub fn build_router(state: Arc<AppState>) -> Router {
    let api = routes::api_router(state.clone());

    let app = Router::new()
        .nest("/api", api)
        .merge(routes::ws::router().with_state(state));

    // CORS for local development
    app.layer(CorsLayer::very_permissive())
}
