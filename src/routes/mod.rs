mod health;
mod session;
mod view;
pub mod ws;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// Build the `/api` sub-router with all API routes.
pub fn api_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(health::router())
        .merge(view::router())
        .merge(session::router())
        .with_state(state)
}
