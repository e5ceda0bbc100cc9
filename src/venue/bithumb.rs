//! Bithumb KRW spot order-book client.
//!
//! Speaks the identical Korean-exchange subscription/orderbook frame shape
//! as Upbit, over Bithumb's Upbit-compatible endpoint; see `venue::upbit`
//! for the shared parser. Grounded on `original_source/bithumb_ws_spot.py`.

use crate::types::{Instrument, QuoteDelta, VenueId};
use crate::venue::upbit::parse_orderbook_frame;
use crate::venue::{KeepalivePolicy, VenueClient};
use tokio_tungstenite::tungstenite::Message;

const CHUNK_SIZE: usize = 50;

pub struct BithumbClient;

impl BithumbClient {
    pub fn new() -> Self {
        Self
    }
}

impl VenueClient for BithumbClient {
    fn venue(&self) -> VenueId {
        VenueId::Bithumb
    }

    fn ws_url(&self) -> &str {
        "wss://ws-api.bithumb.com/websocket/v1"
    }

    fn chunk_size(&self) -> usize {
        CHUNK_SIZE
    }

    fn build_subscriptions(&self, chunk: &[Instrument]) -> Vec<Message> {
        let codes: Vec<&str> = chunk.iter().map(|i| i.instrument_key.as_str()).collect();
        let frame = serde_json::json!([
            { "ticket": uuid::Uuid::new_v4().to_string() },
            { "type": "orderbook", "codes": codes, "is_only_realtime": true },
            { "format": "DEFAULT" },
        ]);
        vec![Message::Text(frame.to_string())]
    }

    fn handle_frame(&self, raw: &Message) -> Option<(String, QuoteDelta)> {
        parse_orderbook_frame(raw)
    }

    fn keepalive(&self) -> KeepalivePolicy {
        KeepalivePolicy::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ws_url_is_the_upbit_compatible_endpoint() {
        let client = BithumbClient::new();
        assert_eq!(client.ws_url(), "wss://ws-api.bithumb.com/websocket/v1");
    }

    #[test]
    fn handle_frame_parses_the_bithumb_ws_spot_orderbook_shape() {
        let client = BithumbClient::new();
        let raw = Message::Text(
            r#"{"type":"orderbook","code":"KRW-ETH",
                "orderbook_units":[{"ask_price":4500000.0,"bid_price":4499000.0}]}"#
                .to_string(),
        );
        let (code, delta) = client.handle_frame(&raw).expect("frame should parse");
        assert_eq!(code, "KRW-ETH");
        assert_eq!(delta.ask, Some(4_500_000.0));
        assert_eq!(delta.bid, Some(4_499_000.0));
    }
}
