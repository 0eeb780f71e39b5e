//! Node and wallet endpoint configuration.
//!
//! Values arrive through the CLI (with environment fallbacks); this module
//! only normalizes them.

use crate::error::ViewerError;

/// Token used by a default AlgoKit LocalNet for both algod and KMD.
pub const LOCALNET_TOKEN: &str =
    "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

pub const DEFAULT_ALGOD_SERVER: &str = "http://localhost";
pub const DEFAULT_ALGOD_PORT: &str = "4001";
pub const DEFAULT_KMD_PORT: &str = "4002";
pub const DEFAULT_KMD_WALLET: &str = "unencrypted-default-wallet";

/// Connection details for an algod node.
#[derive(Debug, Clone)]
pub struct AlgodConfig {
    pub server: String,
    pub port: Option<u16>,
    pub token: String,
}

impl AlgodConfig {
    pub fn new(server: impl Into<String>, port: Option<u16>, token: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            port,
            token: token.into(),
        }
    }

    pub fn base_url(&self) -> String {
        endpoint(&self.server, self.port)
    }
}

/// Connection details for a KMD daemon plus the wallet to open.
#[derive(Debug, Clone)]
pub struct KmdConfig {
    pub server: String,
    pub port: Option<u16>,
    pub token: String,
    pub wallet_name: String,
    pub wallet_password: String,
}

impl KmdConfig {
    pub fn base_url(&self) -> String {
        endpoint(&self.server, self.port)
    }
}

fn endpoint(server: &str, port: Option<u16>) -> String {
    let server = server.trim_end_matches('/');
    match port {
        Some(port) => format!("{server}:{port}"),
        None => server.to_string(),
    }
}

/// Resolve the port to append to `server`.
///
/// A port already present in the server URL wins over `raw`; a blank or
/// `none` value means "use the URL as given".
pub fn resolve_port(server: &str, raw: &str) -> Result<Option<u16>, ViewerError> {
    let raw = raw.trim();
    if has_explicit_port(server) || raw.is_empty() || raw.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    raw.parse::<u16>()
        .map(Some)
        .map_err(|_| ViewerError::Configuration(format!("invalid port {raw:?} for {server}")))
}

fn has_explicit_port(server: &str) -> bool {
    let rest = server.split_once("://").map_or(server, |(_, rest)| rest);
    let authority = rest.split('/').next().unwrap_or(rest);
    // Skip past a bracketed IPv6 host.
    let host_end = authority.rfind(']').map_or(0, |i| i + 1);
    authority[host_end..].contains(':')
}

/// Parse the configured contract identifier.
///
/// Absent, blank, non-numeric and zero values all mean "not configured".
pub fn parse_app_id(raw: Option<&str>) -> Option<u64> {
    raw.map(str::trim)
        .and_then(|s| s.parse::<u64>().ok())
        .filter(|&id| id != 0)
}
