//! KMD (key management daemon) wallet provider.
//!
//! Opens a named KMD wallet, uses its first key as the session account and
//! signs through the daemon. The wallet handle is released on disconnect.

use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use tokio::sync::Mutex;

use super::{Connection, WalletAccount, WalletProvider};
use crate::{
    chain::{account::decode_address, TransactionSigner},
    config::KmdConfig,
    error::ViewerError,
};

const TOKEN_HEADER: &str = "X-KMD-API-Token";

#[derive(Clone)]
struct KmdHttp {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

#[derive(Deserialize)]
struct KmdError {
    message: String,
}

impl KmdHttp {
    async fn call<T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T, ViewerError> {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.http.request(method, &url);
        if !self.token.is_empty() {
            req = req.header(TOKEN_HEADER, &self.token);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| ViewerError::WalletConnection(format!("KMD request to {path} failed: {e}")))?;
        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| ViewerError::WalletConnection(format!("failed to read KMD response: {e}")))?;

        if !status.is_success() {
            let message = serde_json::from_str::<KmdError>(&text)
                .map(|e| e.message)
                .unwrap_or_else(|_| status.to_string());
            return Err(ViewerError::WalletConnection(format!("KMD {path}: {message}")));
        }

        serde_json::from_str(&text)
            .map_err(|e| ViewerError::Decode(format!("malformed KMD response for {path}: {e}")))
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: Value) -> Result<T, ViewerError> {
        self.call(reqwest::Method::POST, path, Some(body)).await
    }
}

#[derive(Deserialize)]
struct ListWalletsResponse {
    #[serde(default)]
    wallets: Vec<KmdWallet>,
}

#[derive(Deserialize)]
struct KmdWallet {
    id: String,
    name: String,
}

#[derive(Deserialize)]
struct InitResponse {
    wallet_handle_token: String,
}

#[derive(Deserialize)]
struct ListKeysResponse {
    #[serde(default)]
    addresses: Vec<String>,
}

#[derive(Deserialize)]
struct SignResponse {
    sig: String,
}

pub struct KmdProvider {
    client: KmdHttp,
    name: String,
    wallet_name: String,
    wallet_password: String,
    handle: Mutex<Option<String>>,
}

impl KmdProvider {
    pub fn new(config: &KmdConfig) -> Self {
        Self {
            client: KmdHttp {
                http: reqwest::Client::new(),
                base_url: config.base_url(),
                token: config.token.clone(),
            },
            name: format!("KMD ({})", config.wallet_name),
            wallet_name: config.wallet_name.clone(),
            wallet_password: config.wallet_password.clone(),
            handle: Mutex::new(None),
        }
    }

    async fn release(&self, handle: &str) -> Result<(), ViewerError> {
        let _: Value = self
            .client
            .post(
                "/v1/wallet/release",
                serde_json::json!({ "wallet_handle_token": handle }),
            )
            .await?;
        Ok(())
    }

    /// Release a handle on a failure path, where the original error wins.
    async fn release_after_failure(&self, handle: &str) {
        if let Err(e) = self.release(handle).await {
            tracing::warn!(wallet = %self.wallet_name, error = %e, "failed to release KMD wallet handle");
        }
    }
}

#[async_trait]
impl WalletProvider for KmdProvider {
    fn id(&self) -> &str {
        "kmd"
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn connect(&self) -> Result<Option<Connection>, ViewerError> {
        let wallets: ListWalletsResponse = self
            .client
            .call(reqwest::Method::GET, "/v1/wallets", None)
            .await?;
        let wallet = wallets
            .wallets
            .into_iter()
            .find(|w| w.name == self.wallet_name)
            .ok_or_else(|| {
                ViewerError::WalletConnection(format!("KMD wallet {:?} not found", self.wallet_name))
            })?;

        let init: InitResponse = self
            .client
            .post(
                "/v1/wallet/init",
                serde_json::json!({
                    "wallet_id": wallet.id,
                    "wallet_password": self.wallet_password,
                }),
            )
            .await?;
        let handle = init.wallet_handle_token;

        let keys: ListKeysResponse = match self
            .client
            .post(
                "/v1/key/list",
                serde_json::json!({ "wallet_handle_token": handle }),
            )
            .await
        {
            Ok(keys) => keys,
            Err(e) => {
                self.release_after_failure(&handle).await;
                return Err(e);
            }
        };

        let Some(address) = keys.addresses.into_iter().next() else {
            tracing::warn!(wallet = %self.wallet_name, "KMD wallet has no keys");
            self.release_after_failure(&handle).await;
            return Ok(None);
        };
        if let Err(e) = decode_address(&address) {
            self.release_after_failure(&handle).await;
            return Err(ViewerError::WalletConnection(format!(
                "KMD returned an invalid address: {e}"
            )));
        }

        *self.handle.lock().await = Some(handle.clone());
        Ok(Some(Connection {
            account: WalletAccount {
                address: address.clone(),
            },
            signer: Arc::new(KmdSigner {
                client: self.client.clone(),
                handle,
                password: self.wallet_password.clone(),
                address,
            }),
        }))
    }

    async fn disconnect(&self) -> Result<(), ViewerError> {
        let handle = self.handle.lock().await.take();
        match handle {
            Some(handle) => self.release(&handle).await,
            None => Ok(()),
        }
    }
}

/// Signs arbitrary data with a key held by KMD.
pub struct KmdSigner {
    client: KmdHttp,
    handle: String,
    password: String,
    address: String,
}

#[async_trait]
impl TransactionSigner for KmdSigner {
    fn address(&self) -> &str {
        &self.address
    }

    async fn sign(&self, data: &[u8]) -> Result<[u8; 64], ViewerError> {
        let resp: SignResponse = self
            .client
            .post(
                "/v1/program/sign",
                serde_json::json!({
                    "wallet_handle_token": self.handle,
                    "wallet_password": self.password,
                    "address": self.address,
                    "data": BASE64.encode(data),
                }),
            )
            .await?;
        let sig = BASE64
            .decode(&resp.sig)
            .map_err(|e| ViewerError::Decode(format!("invalid signature encoding: {e}")))?;
        sig.try_into()
            .map_err(|v: Vec<u8>| ViewerError::Decode(format!("signature has {} bytes, expected 64", v.len())))
    }
}
