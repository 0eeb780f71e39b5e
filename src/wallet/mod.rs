//! Wallet session management.
//!
//! [`WalletManager`] owns the registered providers and the single active
//! session. Everything else only reads [`Session`] snapshots or asks the
//! manager to connect/disconnect.

pub mod kmd;
pub mod local;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{broadcast, Mutex};

use crate::{chain::TransactionSigner, error::ViewerError};

pub use kmd::KmdProvider;
pub use local::LocalKeyProvider;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalletAccount {
    pub address: String,
}

/// What a provider hands back after a successful connect.
pub struct Connection {
    pub account: WalletAccount,
    pub signer: Arc<dyn TransactionSigner>,
}

/// A wallet backend that can open and close a session.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    fn id(&self) -> &str;

    fn name(&self) -> &str;

    /// `Ok(None)` means the backend answered but no account is available.
    async fn connect(&self) -> Result<Option<Connection>, ViewerError>;

    async fn disconnect(&self) -> Result<(), ViewerError>;
}

/// Read-only view of the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub active_address: Option<String>,
    pub providers: Vec<String>,
    pub active_provider: Option<String>,
    pub has_signer: bool,
}

impl Session {
    pub fn is_connected(&self) -> bool {
        self.active_address.is_some()
    }
}

struct ActiveSession {
    provider: Arc<dyn WalletProvider>,
    account: WalletAccount,
    signer: Arc<dyn TransactionSigner>,
}

pub struct WalletManager {
    providers: Vec<Arc<dyn WalletProvider>>,
    active: Mutex<Option<ActiveSession>>,
    /// Serializes connect attempts without blocking session reads.
    connecting: Mutex<()>,
    event_tx: Option<broadcast::Sender<String>>,
}

impl WalletManager {
    pub fn new(providers: Vec<Arc<dyn WalletProvider>>) -> Self {
        Self {
            providers,
            active: Mutex::new(None),
            connecting: Mutex::new(()),
            event_tx: None,
        }
    }

    pub fn with_events(mut self, event_tx: broadcast::Sender<String>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    pub async fn session(&self) -> Session {
        let active = self.active.lock().await;
        Session {
            active_address: active.as_ref().map(|s| s.account.address.clone()),
            providers: self.providers.iter().map(|p| p.id().to_string()).collect(),
            active_provider: active.as_ref().map(|s| s.provider.id().to_string()),
            has_signer: active.is_some(),
        }
    }

    pub async fn signer(&self) -> Option<Arc<dyn TransactionSigner>> {
        self.active.lock().await.as_ref().map(|s| s.signer.clone())
    }

    /// Open a session with the first registered provider.
    ///
    /// No-op when a session is already active or nothing is registered.
    /// On failure the session stays disconnected. The session stays
    /// readable while the provider is being contacted.
    pub async fn connect(&self) -> Result<(), ViewerError> {
        let _attempt = self.connecting.lock().await;
        if self.active.lock().await.is_some() {
            return Ok(());
        }
        let Some(provider) = self.providers.first() else {
            tracing::debug!("no wallet providers registered");
            return Ok(());
        };

        tracing::info!(provider = provider.id(), "connecting wallet");
        let connection = match provider.connect().await {
            Ok(Some(connection)) => connection,
            Ok(None) => {
                return Err(ViewerError::WalletConnection(
                    "wallet connection could not be established".into(),
                ))
            }
            Err(ViewerError::WalletConnection(msg)) => return Err(ViewerError::WalletConnection(msg)),
            Err(e) => {
                return Err(ViewerError::WalletConnection(format!(
                    "wallet connection could not be established: {e}"
                )))
            }
        };

        tracing::info!(
            provider = provider.id(),
            address = %connection.account.address,
            "wallet connected"
        );
        *self.active.lock().await = Some(ActiveSession {
            provider: provider.clone(),
            account: connection.account,
            signer: connection.signer,
        });
        self.publish().await;
        Ok(())
    }

    /// Close the active session, if any. Returns whether one was closed.
    ///
    /// The session is cleared even when the provider reports an error.
    pub async fn disconnect(&self) -> bool {
        let Some(session) = self.active.lock().await.take() else {
            return false;
        };

        if let Err(e) = session.provider.disconnect().await {
            tracing::warn!(provider = session.provider.id(), error = %e, "wallet disconnect failed");
        }
        tracing::info!(provider = session.provider.id(), "wallet disconnected");
        self.publish().await;
        true
    }

    async fn publish(&self) {
        let Some(tx) = &self.event_tx else { return };
        let session = self.session().await;
        let event = serde_json::json!({
            "type": "session:changed",
            "activeAddress": session.active_address,
            "activeProvider": session.active_provider,
        });
        let _ = tx.send(event.to_string());
    }
}
