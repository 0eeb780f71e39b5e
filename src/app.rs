//! The viewer and the wallet session wired together.

use crate::{
    error::ViewerError,
    viewer::{ContractViewer, ViewState},
    wallet::{Session, WalletManager},
};

pub struct TicketingApp {
    pub viewer: ContractViewer,
    pub wallet: WalletManager,
}

impl TicketingApp {
    pub fn new(viewer: ContractViewer, wallet: WalletManager) -> Self {
        Self { viewer, wallet }
    }

    /// Connect the first provider; a failure is recorded on the view.
    pub async fn connect_wallet(&self) -> Result<(), ViewerError> {
        match self.wallet.connect().await {
            Ok(()) => {
                self.viewer.clear_wallet_error();
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "wallet connection failed");
                self.viewer.report_wallet_error(&e);
                Err(e)
            }
        }
    }

    pub async fn disconnect_wallet(&self) {
        self.wallet.disconnect().await;
        self.viewer.clear_wallet_error();
    }

    pub async fn snapshot(&self) -> (Session, ViewState) {
        (self.wallet.session().await, self.viewer.view())
    }
}
