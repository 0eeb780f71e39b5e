//! Wallet provider backed by a hex-encoded Ed25519 seed file.

use std::{path::PathBuf, sync::Arc};

use async_trait::async_trait;

use super::{Connection, WalletAccount, WalletProvider};
use crate::{
    chain::{Account, LocalSigner},
    error::ViewerError,
};

pub struct LocalKeyProvider {
    path: PathBuf,
}

impl LocalKeyProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn load(&self) -> Result<Account, ViewerError> {
        let text = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            ViewerError::WalletConnection(format!("cannot read key file {}: {e}", self.path.display()))
        })?;
        let hex_seed = text.trim();
        let hex_seed = hex_seed.strip_prefix("0x").unwrap_or(hex_seed);
        let bytes = hex::decode(hex_seed)
            .map_err(|e| ViewerError::WalletConnection(format!("key file is not valid hex: {e}")))?;
        let seed: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
            ViewerError::WalletConnection(format!("key seed must be 32 bytes, got {}", v.len()))
        })?;
        Ok(Account::from_seed(&seed))
    }
}

#[async_trait]
impl WalletProvider for LocalKeyProvider {
    fn id(&self) -> &str {
        "local-key"
    }

    fn name(&self) -> &str {
        "Local key file"
    }

    async fn connect(&self) -> Result<Option<Connection>, ViewerError> {
        let account = self.load().await?;
        let address = account.address().to_string();
        tracing::debug!(path = %self.path.display(), %address, "loaded local key");
        Ok(Some(Connection {
            account: WalletAccount { address },
            signer: Arc::new(LocalSigner::new(account)),
        }))
    }

    async fn disconnect(&self) -> Result<(), ViewerError> {
        Ok(())
    }
}
