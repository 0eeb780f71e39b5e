//! Read-only typed client for the event-ticketing application.
//!
//! The application stores its fields under short on-chain keys; this client
//! maps them back to field names so callers never deal with raw keys.

use std::sync::Arc;

use super::{
    account::ReadSender,
    algod::{GlobalStateReader, RawGlobalState, StateValue},
};
use crate::error::ViewerError;

/// Field name, on-chain key.
pub const SCHEMA: [(&str, &[u8]); 5] = [
    ("event_name", b"name"),
    ("ticket_price", b"price"),
    ("total_tickets", b"total"),
    ("tickets_sold", b"sold"),
    ("ticket_asa_id", b"asa_id"),
];

/// How the client locates the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveBy {
    Id(u64),
}

/// Global state with every known field looked up by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketingGlobalState {
    pub event_name: Option<StateValue>,
    pub ticket_price: Option<StateValue>,
    pub total_tickets: Option<StateValue>,
    pub tickets_sold: Option<StateValue>,
    pub ticket_asa_id: Option<StateValue>,
}

impl TicketingGlobalState {
    pub fn from_raw(raw: &RawGlobalState) -> Self {
        let field = |name: &str| {
            SCHEMA
                .iter()
                .find(|(n, _)| *n == name)
                .and_then(|(_, key)| raw.get(key))
                .cloned()
        };
        Self {
            event_name: field("event_name"),
            ticket_price: field("ticket_price"),
            total_tickets: field("total_tickets"),
            tickets_sold: field("tickets_sold"),
            ticket_asa_id: field("ticket_asa_id"),
        }
    }
}

pub struct EventTicketingClient {
    sender: ReadSender,
    app_id: u64,
    reader: Arc<dyn GlobalStateReader>,
}

impl EventTicketingClient {
    pub fn new(
        sender: ReadSender,
        resolve_by: ResolveBy,
        reader: Arc<dyn GlobalStateReader>,
    ) -> Result<Self, ViewerError> {
        let ResolveBy::Id(app_id) = resolve_by;
        if app_id == 0 {
            return Err(ViewerError::Configuration("missing contract identifier".into()));
        }
        Ok(Self {
            sender,
            app_id,
            reader,
        })
    }

    pub fn app_id(&self) -> u64 {
        self.app_id
    }

    pub fn sender_address(&self) -> &str {
        self.sender.address()
    }

    pub async fn get_global_state(&self) -> Result<TicketingGlobalState, ViewerError> {
        let raw = self.reader.application_global_state(self.app_id).await?;
        Ok(TicketingGlobalState::from_raw(&raw))
    }
}
