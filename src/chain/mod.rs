pub mod account;
pub mod algod;
pub mod ticketing;

pub use account::{Account, LocalSigner, ReadSender, TransactionSigner};
pub use algod::{AlgodClient, GlobalStateReader, RawGlobalState, StateValue};
pub use ticketing::{EventTicketingClient, ResolveBy, TicketingGlobalState};
