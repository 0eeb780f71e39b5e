use tokio::sync::broadcast;

use crate::app::TicketingApp;

/// Shared server state.
pub struct AppState {
    pub app: TicketingApp,
    /// Broadcast channel for WebSocket events (view status, session changes).
    pub event_tx: broadcast::Sender<String>,
}
