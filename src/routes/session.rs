use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::{error::ErrorMessage, state::AppState, wallet::Session};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    #[serde(flatten)]
    session: Session,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// `GET /api/session` — current wallet session.
async fn get_session(State(state): State<Arc<AppState>>) -> Json<SessionResponse> {
    Json(SessionResponse {
        session: state.app.wallet.session().await,
        error: None,
    })
}

/// `POST /api/session/connect` — connect the first registered provider.
async fn connect(State(state): State<Arc<AppState>>) -> (StatusCode, Json<SessionResponse>) {
    let result = state.app.connect_wallet().await;
    let session = state.app.wallet.session().await;
    match result {
        Ok(()) => (StatusCode::OK, Json(SessionResponse { session, error: None })),
        Err(e) => (
            StatusCode::BAD_GATEWAY,
            Json(SessionResponse {
                session,
                error: Some(ErrorMessage::from(&e).to_string()),
            }),
        ),
    }
}

/// `POST /api/session/disconnect` — close the active session, if any.
async fn disconnect(State(state): State<Arc<AppState>>) -> Json<SessionResponse> {
    state.app.disconnect_wallet().await;
    Json(SessionResponse {
        session: state.app.wallet.session().await,
        error: None,
    })
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/session", get(get_session))
        .route("/session/connect", post(connect))
        .route("/session/disconnect", post(disconnect))
}
