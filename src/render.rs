//! Plain-text rendering of the session and the event view.

use std::fmt::Write;

use crate::{
    chain::account::truncate_address,
    viewer::{Snapshot, ViewState, ViewStatus},
    wallet::Session,
};

const NOT_AVAILABLE: &str = "not available";
const NOT_COMPUTABLE: &str = "not computable";
const NOT_MINTED: &str = "not minted yet";

pub fn render(session: &Session, view: &ViewState) -> String {
    let mut out = String::new();
    out.push_str("Algorand Event Ticketing\n");
    render_session(&mut out, session);
    if let Some(err) = &view.wallet_error {
        let _ = writeln!(out, "Wallet error: {err}");
    }
    out.push_str(&"-".repeat(40));
    out.push('\n');
    out.push_str("Event\n");

    match &view.status {
        ViewStatus::Loading => out.push_str("Loading...\n"),
        ViewStatus::Error(msg) => {
            let _ = writeln!(out, "Error: {msg}");
        }
        ViewStatus::Ready => {
            if let (Some(app_id), Some(snapshot)) = (view.app_id, &view.snapshot) {
                render_snapshot(&mut out, app_id, snapshot);
            }
        }
    }
    out
}

fn render_session(out: &mut String, session: &Session) {
    match (&session.active_address, &session.active_provider) {
        (Some(address), provider) => {
            let _ = write!(out, "Wallet: {}", truncate_address(address));
            if let Some(provider) = provider {
                let _ = write!(out, " ({provider})");
            }
            out.push('\n');
        }
        (None, _) if session.providers.is_empty() => {
            out.push_str("Wallet: not connected (no providers configured)\n");
        }
        (None, _) => out.push_str("Wallet: not connected\n"),
    }
}

fn render_snapshot(out: &mut String, app_id: u64, s: &Snapshot) {
    let event_name = s
        .event_name
        .as_deref()
        .filter(|name| !name.is_empty())
        .unwrap_or(NOT_AVAILABLE);
    let price = s
        .price_algo()
        .map(|p| format!("{p} ALGO"))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());
    let remaining = s
        .remaining_tickets()
        .map(|r| r.to_string())
        .unwrap_or_else(|| NOT_COMPUTABLE.to_string());
    let token = if s.is_minted() {
        s.ticket_asa_id.to_string()
    } else {
        NOT_MINTED.to_string()
    };

    let _ = writeln!(out, "App ID: {app_id}");
    let _ = writeln!(out, "Event name: {event_name}");
    let _ = writeln!(out, "Ticket price: {price}");
    let _ = writeln!(out, "Total tickets: {}", opt(s.total_tickets));
    let _ = writeln!(out, "Tickets sold: {}", opt(s.tickets_sold));
    let _ = writeln!(out, "Remaining tickets: {remaining}");
    let _ = writeln!(out, "Ticket ASA ID: {token}");
}

fn opt(v: Option<u64>) -> String {
    v.map(|v| v.to_string()).unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorMessage;

    fn disconnected() -> Session {
        Session {
            active_address: None,
            providers: vec!["kmd".into()],
            active_provider: None,
            has_signer: false,
        }
    }

    fn ready(snapshot: Snapshot) -> ViewState {
        ViewState {
            app_id: Some(42),
            status: ViewStatus::Ready,
            snapshot: Some(snapshot),
            ..ViewState::default()
        }
    }

    #[test]
    fn renders_concert_snapshot() {
        let view = ready(Snapshot {
            event_name: Some("Concert".into()),
            ticket_price: Some(5_000_000),
            total_tickets: Some(100),
            tickets_sold: Some(30),
            ticket_asa_id: 777,
        });
        let out = render(&disconnected(), &view);

        assert!(out.contains("Wallet: not connected\n"));
        assert!(out.contains("App ID: 42\n"));
        assert!(out.contains("Event name: Concert\n"));
        assert!(out.contains("Ticket price: 5 ALGO\n"));
        assert!(out.contains("Remaining tickets: 70\n"));
        assert!(out.contains("Ticket ASA ID: 777\n"));
    }

    #[test]
    fn renders_placeholders_for_missing_fields() {
        let view = ready(Snapshot {
            total_tickets: Some(10),
            ..Snapshot::default()
        });
        let out = render(&disconnected(), &view);

        assert!(out.contains("Event name: not available\n"));
        assert!(out.contains("Ticket price: not available\n"));
        assert!(out.contains("Tickets sold: not available\n"));
        assert!(out.contains("Remaining tickets: not computable\n"));
        assert!(out.contains("Ticket ASA ID: not minted yet\n"));
    }

    #[test]
    fn renders_loading_and_error_without_fields() {
        let loading = ViewState::default();
        let out = render(&disconnected(), &loading);
        assert!(out.contains("Loading...\n"));
        assert!(!out.contains("App ID"));

        let failed = ViewState {
            status: ViewStatus::Error(ErrorMessage::bounded("application does not exist")),
            ..ViewState::default()
        };
        let out = render(&disconnected(), &failed);
        assert!(out.contains("Error: application does not exist\n"));
        assert!(!out.contains("App ID"));
    }

    #[test]
    fn renders_wallet_error_alongside_ready_fields() {
        let mut view = ready(Snapshot {
            event_name: Some("Concert".into()),
            ..Snapshot::default()
        });
        view.wallet_error = Some(ErrorMessage::bounded("KMD wallet \"x\" not found"));
        let out = render(&disconnected(), &view);

        assert!(out.contains("Wallet error: KMD wallet \"x\" not found\n"));
        assert!(out.contains("Event name: Concert\n"));
    }

    #[test]
    fn renders_connected_wallet_truncated() {
        let session = Session {
            active_address: Some(
                "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAY5HFKQ".into(),
            ),
            providers: vec!["kmd".into()],
            active_provider: Some("kmd".into()),
            has_signer: true,
        };
        let out = render(&session, &ViewState::default());
        assert!(out.contains("Wallet: AAAAAA...HFKQ (kmd)\n"));
    }
}
