//! Contract state viewer.
//!
//! Owns the view state for one event-ticketing application: fetches the
//! application's global state, decodes it into a [`Snapshot`] and tracks
//! whether the view is loading, ready or failed.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tokio::sync::broadcast;

use crate::{
    chain::{EventTicketingClient, GlobalStateReader, ReadSender, ResolveBy, TicketingGlobalState},
    error::{ErrorMessage, ViewerError},
};

pub const MICROALGOS_PER_ALGO: u64 = 1_000_000;

/// Outcome of the most recent fetch attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewStatus {
    Loading,
    Error(ErrorMessage),
    Ready,
}

impl ViewStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ViewStatus::Loading => "loading",
            ViewStatus::Error(_) => "error",
            ViewStatus::Ready => "ready",
        }
    }

    pub fn error(&self) -> Option<&ErrorMessage> {
        match self {
            ViewStatus::Error(msg) => Some(msg),
            _ => None,
        }
    }
}

/// Decoded copy of the application's global state.
///
/// Fields absent from the node's response stay `None`, except the ticket
/// token id which reads as `0` ("not minted yet").
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub event_name: Option<String>,
    pub ticket_price: Option<u64>,
    pub total_tickets: Option<u64>,
    pub tickets_sold: Option<u64>,
    pub ticket_asa_id: u64,
}

impl Snapshot {
    pub fn decode(state: &TicketingGlobalState) -> Result<Self, ViewerError> {
        Ok(Self {
            event_name: state.event_name.as_ref().map(|v| v.as_string()).transpose()?,
            ticket_price: state.ticket_price.as_ref().map(|v| v.as_u64()).transpose()?,
            total_tickets: state.total_tickets.as_ref().map(|v| v.as_u64()).transpose()?,
            tickets_sold: state.tickets_sold.as_ref().map(|v| v.as_u64()).transpose()?,
            ticket_asa_id: state
                .ticket_asa_id
                .as_ref()
                .map(|v| v.as_u64())
                .transpose()?
                .unwrap_or(0),
        })
    }

    /// `total - sold`, or `None` when either side is unknown.
    ///
    /// Negative when the remote state is inconsistent; shown as received.
    pub fn remaining_tickets(&self) -> Option<i128> {
        match (self.total_tickets, self.tickets_sold) {
            (Some(total), Some(sold)) => Some(i128::from(total) - i128::from(sold)),
            _ => None,
        }
    }

    pub fn price_algo(&self) -> Option<String> {
        self.ticket_price.map(microalgos_to_algo)
    }

    pub fn is_minted(&self) -> bool {
        self.ticket_asa_id != 0
    }
}

/// Format a microalgo amount as a decimal ALGO string without trailing zeros.
pub fn microalgos_to_algo(micro: u64) -> String {
    let whole = micro / MICROALGOS_PER_ALGO;
    let frac = micro % MICROALGOS_PER_ALGO;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{frac:06}");
    format!("{whole}.{}", frac.trim_end_matches('0'))
}

/// Everything the view layer needs to draw the event section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    pub app_id: Option<u64>,
    pub status: ViewStatus,
    pub snapshot: Option<Snapshot>,
    /// Last wallet connection failure. Kept apart from `status` so a fetch
    /// finishing later cannot hide it.
    pub wallet_error: Option<ErrorMessage>,
    pub(crate) generation: u64,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            app_id: None,
            status: ViewStatus::Loading,
            snapshot: None,
            wallet_error: None,
            generation: 0,
        }
    }
}

pub struct ContractViewer {
    reader: Arc<dyn GlobalStateReader>,
    state: Mutex<ViewState>,
    event_tx: Option<broadcast::Sender<String>>,
}

impl ContractViewer {
    pub fn new(reader: Arc<dyn GlobalStateReader>) -> Self {
        Self {
            reader,
            state: Mutex::new(ViewState::default()),
            event_tx: None,
        }
    }

    /// Publish status transitions as JSON on `event_tx`.
    pub fn with_events(mut self, event_tx: broadcast::Sender<String>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    pub fn view(&self) -> ViewState {
        self.lock().clone()
    }

    pub fn app_id(&self) -> Option<u64> {
        self.lock().app_id
    }

    /// Run one fetch cycle for `app_id` and return the resulting status.
    ///
    /// A `None` identifier fails immediately without touching the network.
    /// When a newer cycle starts before this one finishes, this cycle's
    /// result is dropped.
    pub async fn sync(&self, app_id: Option<u64>) -> ViewStatus {
        let generation = {
            let mut state = self.lock();
            state.generation += 1;
            state.app_id = app_id;
            state.snapshot = None;
            state.status = match app_id {
                Some(_) => ViewStatus::Loading,
                None => ViewStatus::Error(ErrorMessage::from(&ViewerError::Configuration(
                    "missing contract identifier".into(),
                ))),
            };
            self.publish(&state);
            state.generation
        };

        let Some(app_id) = app_id else {
            tracing::warn!("no contract identifier configured, skipping state read");
            return self.lock().status.clone();
        };

        let mut guard = LoadingGuard {
            viewer: self,
            generation,
            armed: true,
        };

        tracing::info!(app_id, "reading contract global state");
        let outcome = self.fetch(app_id).await;
        guard.armed = false;

        let mut state = self.lock();
        if state.generation != generation {
            tracing::debug!(app_id, generation, "discarding stale contract state");
            return state.status.clone();
        }

        match outcome {
            Ok(snapshot) => {
                state.status = ViewStatus::Ready;
                state.snapshot = Some(snapshot);
            }
            Err(e) => {
                tracing::error!(app_id, kind = e.kind(), error = %e, "failed to read contract state");
                state.status = ViewStatus::Error(ErrorMessage::from(&e));
            }
        }
        self.publish(&state);
        state.status.clone()
    }

    /// Re-run the fetch cycle for the current identifier.
    pub async fn refresh(&self) -> ViewStatus {
        let app_id = self.app_id();
        self.sync(app_id).await
    }

    /// Record a wallet connection failure next to the fetch status.
    pub fn report_wallet_error(&self, error: &ViewerError) {
        let mut state = self.lock();
        state.wallet_error = Some(ErrorMessage::from(error));
        self.publish(&state);
    }

    pub fn clear_wallet_error(&self) {
        let mut state = self.lock();
        if state.wallet_error.take().is_some() {
            self.publish(&state);
        }
    }

    async fn fetch(&self, app_id: u64) -> Result<Snapshot, ViewerError> {
        let client = EventTicketingClient::new(
            ReadSender::ephemeral(),
            ResolveBy::Id(app_id),
            self.reader.clone(),
        )?;
        let state = client.get_global_state().await?;
        let snapshot = Snapshot::decode(&state)?;
        tracing::debug!(
            app_id = client.app_id(),
            sender = client.sender_address(),
            event_name = ?snapshot.event_name,
            ticket_price = ?snapshot.ticket_price,
            total_tickets = ?snapshot.total_tickets,
            tickets_sold = ?snapshot.tickets_sold,
            ticket_asa_id = snapshot.ticket_asa_id,
            "contract state read"
        );
        Ok(snapshot)
    }

    fn lock(&self) -> MutexGuard<'_, ViewState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn publish(&self, state: &ViewState) {
        let Some(tx) = &self.event_tx else { return };
        let event = serde_json::json!({
            "type": "view:status",
            "status": state.status.label(),
            "appId": state.app_id,
            "message": state.status.error().map(|m| m.to_string()),
            "walletError": state.wallet_error.as_ref().map(|m| m.to_string()),
        });
        let _ = tx.send(event.to_string());
    }
}

/// Moves a cycle out of `Loading` if its future is dropped mid-fetch.
struct LoadingGuard<'a> {
    viewer: &'a ContractViewer,
    generation: u64,
    armed: bool,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.viewer.lock();
        if state.generation == self.generation && state.status == ViewStatus::Loading {
            state.status = ViewStatus::Error(ErrorMessage::bounded("contract state read was interrupted"));
            self.viewer.publish(&state);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use super::*;
    use crate::chain::{RawGlobalState, StateValue};

    /// Reader returning a canned response and counting calls.
    struct FakeReader {
        response: Result<RawGlobalState, ViewerError>,
        calls: AtomicUsize,
    }

    impl FakeReader {
        fn ok(state: RawGlobalState) -> Arc<Self> {
            Arc::new(Self {
                response: Ok(state),
                calls: AtomicUsize::new(0),
            })
        }

        fn err(e: ViewerError) -> Arc<Self> {
            Arc::new(Self {
                response: Err(e),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GlobalStateReader for FakeReader {
        async fn application_global_state(&self, _app_id: u64) -> Result<RawGlobalState, ViewerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.response.clone()
        }
    }

    fn concert_state() -> RawGlobalState {
        let mut raw = RawGlobalState::default();
        raw.insert(&b"name"[..], StateValue::Bytes(b"Concert".to_vec()));
        raw.insert(&b"price"[..], StateValue::Uint(5_000_000));
        raw.insert(&b"total"[..], StateValue::Uint(100));
        raw.insert(&b"sold"[..], StateValue::Uint(30));
        raw.insert(&b"asa_id"[..], StateValue::Uint(777));
        raw
    }

    #[tokio::test]
    async fn unconfigured_id_fails_without_network_call() {
        let reader = FakeReader::ok(concert_state());
        let viewer = ContractViewer::new(reader.clone());

        let status = viewer.sync(None).await;

        assert_eq!(status.label(), "error");
        assert!(status.error().unwrap().text.contains("contract identifier"));
        assert_eq!(reader.calls(), 0);
    }

    #[tokio::test]
    async fn full_response_yields_ready_snapshot() {
        let reader = FakeReader::ok(concert_state());
        let viewer = ContractViewer::new(reader.clone());

        assert_eq!(viewer.sync(Some(42)).await, ViewStatus::Ready);
        assert_eq!(reader.calls(), 1);

        let view = viewer.view();
        let snap = view.snapshot.unwrap();
        assert_eq!(
            snap,
            Snapshot {
                event_name: Some("Concert".into()),
                ticket_price: Some(5_000_000),
                total_tickets: Some(100),
                tickets_sold: Some(30),
                ticket_asa_id: 777,
            }
        );
        assert_eq!(snap.remaining_tickets(), Some(70));
        assert_eq!(snap.price_algo().as_deref(), Some("5"));
    }

    #[tokio::test]
    async fn missing_token_id_reads_as_zero() {
        let full = concert_state();
        let mut raw = RawGlobalState::default();
        for key in [&b"name"[..], b"price", b"total", b"sold"] {
            raw.insert(key, full.get(key).unwrap().clone());
        }
        let viewer = ContractViewer::new(FakeReader::ok(raw));

        viewer.sync(Some(42)).await;
        let snap = viewer.view().snapshot.unwrap();
        assert_eq!(snap.ticket_asa_id, 0);
        assert!(!snap.is_minted());
    }

    #[tokio::test]
    async fn missing_price_keeps_remaining_computable() {
        let mut raw = RawGlobalState::default();
        raw.insert(&b"total"[..], StateValue::Uint(10));
        raw.insert(&b"sold"[..], StateValue::Uint(4));
        let viewer = ContractViewer::new(FakeReader::ok(raw));

        assert_eq!(viewer.sync(Some(42)).await, ViewStatus::Ready);
        let snap = viewer.view().snapshot.unwrap();
        assert_eq!(snap.ticket_price, None);
        assert_eq!(snap.price_algo(), None);
        assert_eq!(snap.event_name, None);
        assert_eq!(snap.remaining_tickets(), Some(6));
    }

    #[tokio::test]
    async fn inconsistent_counts_are_rendered_as_received() {
        let mut raw = RawGlobalState::default();
        raw.insert(&b"total"[..], StateValue::Uint(5));
        raw.insert(&b"sold"[..], StateValue::Uint(7));
        let viewer = ContractViewer::new(FakeReader::ok(raw));

        viewer.sync(Some(1)).await;
        assert_eq!(viewer.view().snapshot.unwrap().remaining_tickets(), Some(-2));
    }

    #[tokio::test]
    async fn remote_failure_is_bounded_error() {
        let long = format!(
            "network unreachable and then {}",
            "some extremely long diagnostic text ".repeat(8)
        );
        let viewer = ContractViewer::new(FakeReader::err(ViewerError::RemoteRead(long.clone())));

        let status = viewer.sync(Some(42)).await;
        let msg = status.error().unwrap();
        assert!(msg.truncated);
        assert_eq!(msg.text.chars().count(), 100);
        assert!(long.starts_with(&msg.text));
        assert!(msg.to_string().ends_with("..."));
        assert!(viewer.view().snapshot.is_none());
    }

    #[tokio::test]
    async fn wrong_field_type_is_decode_error() {
        let mut raw = concert_state();
        raw.insert(&b"name"[..], StateValue::Uint(9));
        let viewer = ContractViewer::new(FakeReader::ok(raw));

        let status = viewer.sync(Some(42)).await;
        assert_eq!(status.label(), "error");
        assert_ne!(viewer.view().status, ViewStatus::Loading);
    }

    #[tokio::test]
    async fn refresh_reuses_current_identifier() {
        let reader = FakeReader::ok(concert_state());
        let viewer = ContractViewer::new(reader.clone());

        viewer.sync(Some(42)).await;
        viewer.refresh().await;
        assert_eq!(reader.calls(), 2);
        assert_eq!(viewer.app_id(), Some(42));
    }

    #[tokio::test]
    async fn status_transitions_are_broadcast() {
        let (tx, mut rx) = broadcast::channel(8);
        let viewer = ContractViewer::new(FakeReader::ok(concert_state())).with_events(tx);

        viewer.sync(Some(42)).await;

        let first: serde_json::Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        let second: serde_json::Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(first["status"], "loading");
        assert_eq!(second["status"], "ready");
        assert_eq!(second["appId"], 42);
    }

    /// Reader that blocks until released, for ordering tests.
    struct GatedReader {
        gate: Notify,
        state: RawGlobalState,
    }

    #[async_trait]
    impl GlobalStateReader for GatedReader {
        async fn application_global_state(&self, _app_id: u64) -> Result<RawGlobalState, ViewerError> {
            self.gate.notified().await;
            Ok(self.state.clone())
        }
    }

    #[tokio::test]
    async fn superseded_fetch_does_not_overwrite_newer_state() {
        let reader = Arc::new(GatedReader {
            gate: Notify::new(),
            state: concert_state(),
        });
        let viewer = Arc::new(ContractViewer::new(reader.clone()));

        let slow = {
            let viewer = viewer.clone();
            tokio::spawn(async move { viewer.sync(Some(42)).await })
        };
        while viewer.app_id() != Some(42) {
            tokio::task::yield_now().await;
        }

        // A newer cycle with no identifier settles immediately.
        viewer.sync(None).await;
        reader.gate.notify_one();
        slow.await.unwrap();

        let view = viewer.view();
        assert_eq!(view.app_id, None);
        assert_eq!(view.status.label(), "error");
        assert!(view.snapshot.is_none());
    }

    #[tokio::test]
    async fn wallet_error_survives_fetch_completion() {
        let reader = Arc::new(GatedReader {
            gate: Notify::new(),
            state: concert_state(),
        });
        let viewer = Arc::new(ContractViewer::new(reader.clone()));

        let fetch = {
            let viewer = viewer.clone();
            tokio::spawn(async move { viewer.sync(Some(42)).await })
        };
        while viewer.app_id() != Some(42) {
            tokio::task::yield_now().await;
        }

        viewer.report_wallet_error(&ViewerError::WalletConnection(
            "wallet connection could not be established".into(),
        ));
        reader.gate.notify_one();
        assert_eq!(fetch.await.unwrap(), ViewStatus::Ready);

        let view = viewer.view();
        assert_eq!(view.status, ViewStatus::Ready);
        assert_eq!(
            view.wallet_error.unwrap().text,
            "wallet connection could not be established"
        );

        viewer.clear_wallet_error();
        assert!(viewer.view().wallet_error.is_none());
    }

    #[tokio::test]
    async fn dropped_fetch_does_not_stay_loading() {
        let reader = Arc::new(GatedReader {
            gate: Notify::new(),
            state: concert_state(),
        });
        let viewer = ContractViewer::new(reader);

        let timed_out =
            tokio::time::timeout(std::time::Duration::from_millis(20), viewer.sync(Some(42))).await;
        assert!(timed_out.is_err());

        let status = viewer.view().status;
        assert_eq!(status.label(), "error");
        assert!(status.error().unwrap().text.contains("interrupted"));
    }

    #[test]
    fn price_formatting() {
        assert_eq!(microalgos_to_algo(5_000_000), "5");
        assert_eq!(microalgos_to_algo(1_500_000), "1.5");
        assert_eq!(microalgos_to_algo(1), "0.000001");
        assert_eq!(microalgos_to_algo(0), "0");
        assert_eq!(microalgos_to_algo(12_345_678), "12.345678");
    }
}
