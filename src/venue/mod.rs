//! Per-venue parser polymorphism: each Venue Stream Client differs only in
//! its subscription frame builder and frame dispatcher; the reconnect loop
//! in `engine` is written once and shared by all five.

pub mod bithumb;
pub mod engine;
pub mod gateio;
pub mod hyperliquid;
pub mod okx;
pub mod upbit;

use crate::types::{Instrument, QuoteDelta};
use tokio_tungstenite::tungstenite::Message;

pub use engine::run_reconnect_loop;

/// What a venue client does to keep its socket alive beyond the library's
/// own ping/pong frames (several venues expect an application-level ping).
#[derive(Debug, Clone, Copy)]
pub enum KeepalivePolicy {
    /// No application-level keepalive needed.
    None,
    /// Send the given frame on this interval.
    Interval { period: std::time::Duration },
}

/// One implementation per venue. The reconnect loop in `engine` drives this
/// trait; nothing in here dials a socket or retries.
pub trait VenueClient: Send + Sync + 'static {
    fn venue(&self) -> crate::types::VenueId;

    /// The venue's WebSocket URL.
    fn ws_url(&self) -> &str;

    /// How many instruments may be named in one subscription frame.
    fn chunk_size(&self) -> usize;

    /// Build the subscription frame(s) for one chunk of instruments.
    fn build_subscriptions(&self, chunk: &[Instrument]) -> Vec<Message>;

    /// Classify and parse one inbound frame. Returns `None` for frames the
    /// client does not recognize or fails to parse — both are silently
    /// dropped, never terminating the connection.
    fn handle_frame(&self, raw: &Message) -> Option<(String, QuoteDelta)>;

    /// Application-level keepalive, if this venue needs one beyond the
    /// protocol's built-in ping/pong.
    fn keepalive(&self) -> KeepalivePolicy {
        KeepalivePolicy::None
    }

    /// The frame to send on each `keepalive()` interval tick. Only
    /// consulted when `keepalive()` is `Interval`.
    fn keepalive_frame(&self) -> Option<Message> {
        None
    }

    /// Reply to an inbound ping-like frame (e.g. OKX's literal `"ping"` text,
    /// Gate's `futures.ping`). Returns `None` when no reply is needed.
    fn ping_reply(&self, raw: &Message) -> Option<Message> {
        let _ = raw;
        None
    }
}
