//! Upbit KRW spot order-book client.
//!
//! Subscription frame: one JSON array per chunk,
//! `[{ticket}, {type:"orderbook", codes, is_only_realtime:true}, {format:"DEFAULT"}]`.
//! Only `orderbook` is used; only the first ask/bid pair in
//! `orderbook_units` is consumed. Grounded on `original_source/price_fetcher.py`
//! and `original_source/ws_contango_engine.py`.

use crate::types::{Instrument, QuoteDelta, VenueId};
use crate::venue::{KeepalivePolicy, VenueClient};
use serde_json::Value;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio_tungstenite::tungstenite::Message;

const CHUNK_SIZE: usize = 50;

pub struct UpbitClient;

impl UpbitClient {
    pub fn new() -> Self {
        Self
    }
}

impl VenueClient for UpbitClient {
    fn venue(&self) -> VenueId {
        VenueId::Upbit
    }

    fn ws_url(&self) -> &str {
        "wss://api.upbit.com/websocket/v1"
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

/// Shared by Upbit and Bithumb: both speak the identical Korean-exchange
/// orderbook frame shape.
pub(super) fn parse_orderbook_frame(raw: &Message) -> Option<(String, QuoteDelta)> {
    let bytes = match raw {
        Message::Text(s) => s.as_bytes(),
        Message::Binary(b) => b.as_slice(),
        _ => return None,
    };
    let v: Value = serde_json::from_slice(bytes).ok()?;
    if v.get("type")?.as_str()? != "orderbook" {
        return None;
    }
    let code = v.get("code")?.as_str()?.to_string();
    let unit = v.get("orderbook_units")?.as_array()?.first()?;
    let ask = unit.get("ask_price").and_then(Value::as_f64);
    let bid = unit.get("bid_price").and_then(Value::as_f64);
    if ask.is_none() && bid.is_none() {
        return None;
    }
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    Some((
        code,
        QuoteDelta {
            bid,
            ask,
            mark: None,
            funding_rate: None,
            timestamp,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_orderbook_frame_shaped_like_bithumb_ws_spot() {
        let raw = Message::Text(
            r#"{"type":"orderbook","code":"KRW-BTC","timestamp":1700000000000,
                "orderbook_units":[{"ask_price":140500000.0,"bid_price":140480000.0}]}"#
                .to_string(),
        );
        let (code, delta) = parse_orderbook_frame(&raw).expect("frame should parse");
        assert_eq!(code, "KRW-BTC");
        assert_eq!(delta.ask, Some(140_500_000.0));
        assert_eq!(delta.bid, Some(140_480_000.0));
    }

    #[test]
    fn ignores_non_orderbook_type() {
        let raw = Message::Text(r#"{"type":"ticker","code":"KRW-BTC"}"#.to_string());
        assert!(parse_orderbook_frame(&raw).is_none());
    }

    #[test]
    fn subscription_frame_carries_a_ticket_and_the_requested_codes() {
        let client = UpbitClient::new();
        let chunk = vec![Instrument {
            venue: VenueId::Upbit,
            instrument_key: "KRW-BTC".to_string(),
            base: "BTC".to_string(),
            display_symbol: "KRW-BTC".to_string(),
        }];
        let frames = client.build_subscriptions(&chunk);
        assert_eq!(frames.len(), 1);
        let Message::Text(text) = &frames[0] else { panic!("expected text frame") };
        let v: Value = serde_json::from_str(text).unwrap();
        assert!(v[0].get("ticket").is_some());
        assert_eq!(v[1]["type"], "orderbook");
        assert_eq!(v[1]["codes"][0], "KRW-BTC");
    }
}
