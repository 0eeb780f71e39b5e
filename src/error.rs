//! Error taxonomy for the viewer and the wallet session.
//!
//! Every variant is recoverable: callers convert it into a bounded
//! [`ErrorMessage`] and store it on the view.

use serde::Serialize;
use thiserror::Error;

/// Maximum number of characters kept from an underlying failure description.
pub const MAX_ERROR_CHARS: usize = 100;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ViewerError {
    /// Missing or zero contract identifier, unusable local configuration.
    #[error("{0}")]
    Configuration(String),

    /// Network or node failure while reading remote state.
    #[error("{0}")]
    RemoteRead(String),

    /// The node answered, but the response did not have the expected shape.
    #[error("{0}")]
    Decode(String),

    /// A wallet provider failed to establish a session.
    #[error("{0}")]
    WalletConnection(String),
}

impl ViewerError {
    pub fn kind(&self) -> &'static str {
        match self {
            ViewerError::Configuration(_) => "configuration",
            ViewerError::RemoteRead(_) => "remote_read",
            ViewerError::Decode(_) => "decode",
            ViewerError::WalletConnection(_) => "wallet_connection",
        }
    }
}

/// A failure description cut down to [`MAX_ERROR_CHARS`] characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorMessage {
    pub text: String,
    pub truncated: bool,
}

impl ErrorMessage {
    pub fn bounded(text: &str) -> Self {
        match text.char_indices().nth(MAX_ERROR_CHARS) {
            Some((cut, _)) => Self {
                text: text[..cut].to_string(),
                truncated: true,
            },
            None => Self {
                text: text.to_string(),
                truncated: false,
            },
        }
    }
}

impl From<&ViewerError> for ErrorMessage {
    fn from(e: &ViewerError) -> Self {
        ErrorMessage::bounded(&e.to_string())
    }
}

impl std::fmt::Display for ErrorMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.truncated {
            write!(f, "{}...", self.text)
        } else {
            f.write_str(&self.text)
        }
    }
}
