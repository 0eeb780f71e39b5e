use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{
    config::parse_app_id,
    state::AppState,
    viewer::{Snapshot, ViewState},
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewResponse {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    app_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    snapshot: Option<Snapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    remaining_tickets: Option<i128>,
    #[serde(skip_serializing_if = "Option::is_none")]
    price_algo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    wallet_error: Option<String>,
}

impl From<ViewState> for ViewResponse {
    fn from(view: ViewState) -> Self {
        let snapshot = view.snapshot;
        Self {
            status: view.status.label(),
            message: view.status.error().map(|m| m.to_string()),
            app_id: view.app_id,
            remaining_tickets: snapshot.as_ref().and_then(Snapshot::remaining_tickets),
            price_algo: snapshot.as_ref().and_then(Snapshot::price_algo),
            wallet_error: view.wallet_error.map(|m| m.to_string()),
            snapshot,
        }
    }
}

/// `GET /api/view` — current view status and snapshot.
async fn get_view(State(state): State<Arc<AppState>>) -> Json<ViewResponse> {
    Json(state.app.viewer.view().into())
}

/// Run a fetch cycle on its own task so a client hanging up does not cancel it.
async fn sync_detached(state: &Arc<AppState>, app_id: Option<u64>) -> Result<(), StatusCode> {
    let task_state = state.clone();
    tokio::spawn(async move { task_state.app.viewer.sync(app_id).await })
        .await
        .map(|_| ())
        .map_err(|e| {
            tracing::error!(error = %e, "contract state sync task failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })
}

/// `POST /api/view/refresh` — re-read state for the current identifier.
async fn refresh_view(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ViewResponse>, StatusCode> {
    let app_id = state.app.viewer.app_id();
    sync_detached(&state, app_id).await?;
    Ok(Json(state.app.viewer.view().into()))
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawAppId {
    Number(u64),
    Text(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetAppIdRequest {
    app_id: Option<RawAppId>,
}

/// `PUT /api/view/app-id` — switch to another application and read it.
async fn set_app_id(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SetAppIdRequest>,
) -> Result<Json<ViewResponse>, StatusCode> {
    let app_id = match req.app_id {
        Some(RawAppId::Number(id)) => Some(id).filter(|&id| id != 0),
        Some(RawAppId::Text(text)) => parse_app_id(Some(&text)),
        None => None,
    };
    tracing::info!(?app_id, "contract identifier changed");
    sync_detached(&state, app_id).await?;
    Ok(Json(state.app.viewer.view().into()))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/view", get(get_view))
        .route("/view/refresh", post(refresh_view))
        .route("/view/app-id", put(set_app_id))
}
