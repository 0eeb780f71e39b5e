//! algod REST client for application global state.

use std::collections::HashMap;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::Deserialize;

use crate::{config::AlgodConfig, error::ViewerError};

const TOKEN_HEADER: &str = "X-Algo-API-Token";

/// TEAL value type tags as reported by algod.
const TEAL_BYTES: u8 = 1;
const TEAL_UINT: u8 = 2;

/// A single global-state value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateValue {
    Bytes(Vec<u8>),
    Uint(u64),
}

impl StateValue {
    pub fn as_string(&self) -> Result<String, ViewerError> {
        match self {
            StateValue::Bytes(b) => String::from_utf8(b.clone())
                .map_err(|_| ViewerError::Decode("state value is not valid UTF-8".into())),
            StateValue::Uint(_) => Err(ViewerError::Decode(
                "expected a byte-string state value, found uint".into(),
            )),
        }
    }

    pub fn as_u64(&self) -> Result<u64, ViewerError> {
        match self {
            StateValue::Uint(v) => Ok(*v),
            StateValue::Bytes(_) => Err(ViewerError::Decode(
                "expected a uint state value, found bytes".into(),
            )),
        }
    }
}

/// Global state keyed by the raw on-chain key bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawGlobalState {
    entries: HashMap<Vec<u8>, StateValue>,
}

impl RawGlobalState {
    pub fn get(&self, key: &[u8]) -> Option<&StateValue> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: impl Into<Vec<u8>>, value: StateValue) {
        self.entries.insert(key.into(), value);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Anything that can fetch an application's global key-value state.
#[async_trait]
pub trait GlobalStateReader: Send + Sync {
    async fn application_global_state(&self, app_id: u64) -> Result<RawGlobalState, ViewerError>;
}

/// Client for an algod node.
pub struct AlgodClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl AlgodClient {
    pub fn new(config: &AlgodConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url(),
            token: config.token.clone(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl GlobalStateReader for AlgodClient {
    async fn application_global_state(&self, app_id: u64) -> Result<RawGlobalState, ViewerError> {
        let url = format!("{}/v2/applications/{}", self.base_url, app_id);

        let mut req = self.http.get(&url);
        if !self.token.is_empty() {
            req = req.header(TOKEN_HEADER, &self.token);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| ViewerError::RemoteRead(format!("algod request failed: {e}")))?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| ViewerError::RemoteRead(format!("failed to read algod response: {e}")))?;

        if !status.is_success() {
            let message = serde_json::from_str::<NodeError>(&body)
                .map(|e| e.message)
                .unwrap_or_else(|_| status.to_string());
            return Err(ViewerError::RemoteRead(format!(
                "algod returned {}: {}",
                status.as_u16(),
                message
            )));
        }

        parse_application(&body)
    }
}

#[derive(Deserialize)]
struct NodeError {
    message: String,
}

#[derive(Deserialize)]
struct ApplicationResponse {
    params: ApplicationParams,
}

#[derive(Deserialize)]
struct ApplicationParams {
    #[serde(rename = "global-state", default)]
    global_state: Vec<TealKeyValue>,
}

#[derive(Deserialize)]
struct TealKeyValue {
    key: String,
    value: TealValue,
}

#[derive(Deserialize)]
struct TealValue {
    #[serde(rename = "type")]
    kind: u8,
    #[serde(default)]
    bytes: String,
    #[serde(default)]
    uint: u64,
}

/// Decode the body of `GET /v2/applications/{id}`.
pub fn parse_application(body: &str) -> Result<RawGlobalState, ViewerError> {
    let app: ApplicationResponse = serde_json::from_str(body)
        .map_err(|e| ViewerError::Decode(format!("malformed application response: {e}")))?;

    let mut state = RawGlobalState::default();
    for kv in app.params.global_state {
        let key = BASE64
            .decode(&kv.key)
            .map_err(|e| ViewerError::Decode(format!("invalid base64 state key {:?}: {e}", kv.key)))?;
        let value = match kv.value.kind {
            TEAL_BYTES => StateValue::Bytes(BASE64.decode(&kv.value.bytes).map_err(|e| {
                ViewerError::Decode(format!("invalid base64 state value: {e}"))
            })?),
            TEAL_UINT => StateValue::Uint(kv.value.uint),
            other => {
                return Err(ViewerError::Decode(format!("unknown TEAL value type {other}")));
            }
        };
        state.insert(key, value);
    }
    Ok(state)
}
