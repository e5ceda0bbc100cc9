//! Gate.io USDT-perpetual client.
//!
//! One subscribe frame per channel per chunk for `futures.tickers`
//! (`best_bid`/`best_ask`/`mark_price`), `futures.order_book` (payload
//! `[[contract,"20","0"], …]`, `bids`/`asks` as `[price, size]` pairs), and
//! `futures.funding_rate` (`funding_rate`). Must reply to an inbound frame
//! carrying `event: "ping"` by echoing back `{"time": …, "channel":
//! "futures.ping"}` — the same channel name, not `futures.pong`. Grounded
//! on `original_source/gate_ws_monitor.py`.

use crate::types::{Instrument, QuoteDelta, VenueId};
use crate::venue::{KeepalivePolicy, VenueClient};
use serde_json::Value;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio_tungstenite::tungstenite::Message;

const CHUNK_SIZE: usize = 30;

/// Gate sends numeric fields as either a JSON string or a bare number
/// depending on the field; accept both, mirroring `safe_float`'s
/// `float(value)` tolerance in the original script.
fn flex_f64(v: Option<&Value>) -> Option<f64> {
    v.and_then(flex_f64_ref)
}

fn flex_f64_ref(v: &Value) -> Option<f64> {
    v.as_f64().or_else(|| v.as_str().and_then(|s| s.parse().ok()))
}

pub struct GateIoClient;

impl GateIoClient {
    pub fn new() -> Self {
        Self
    }

    fn now() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }

    fn channel_frame(channel: &str, payload: Value) -> Message {
        Message::Text(
            serde_json::json!({
                "time": Self::now(),
                "channel": channel,
                "event": "subscribe",
                "payload": payload,
            })
            .to_string(),
        )
    }
}

impl VenueClient for GateIoClient {
    fn venue(&self) -> VenueId {
        VenueId::GateIo
    }

    fn ws_url(&self) -> &str {
        "wss://fx-ws.gateio.ws/v4/ws/usdt"
    }

    fn chunk_size(&self) -> usize {
        CHUNK_SIZE
    }

    fn build_subscriptions(&self, chunk: &[Instrument]) -> Vec<Message> {
        let contracts: Vec<Value> = chunk
            .iter()
            .map(|i| Value::String(i.instrument_key.clone()))
            .collect();

        let order_book_payload: Vec<Value> = chunk
            .iter()
            .map(|i| {
                serde_json::json!([i.instrument_key, "20", "0"])
            })
            .collect();

        vec![
            Self::channel_frame("futures.tickers", Value::Array(contracts.clone())),
            Self::channel_frame("futures.order_book", Value::Array(order_book_payload)),
            Self::channel_frame("futures.funding_rate", Value::Array(contracts)),
        ]
    }

    fn handle_frame(&self, raw: &Message) -> Option<(String, QuoteDelta)> {
        let bytes = match raw {
            Message::Text(s) => s.as_bytes(),
            Message::Binary(b) => b.as_slice(),
            _ => return None,
        };
        let v: Value = serde_json::from_slice(bytes).ok()?;
        let channel = v.get("channel")?.as_str()?;
        let result = v.get("result")?;
        let timestamp = Self::now();

        match channel {
            "futures.tickers" => {
                let row = result.as_array().and_then(|a| a.first()).unwrap_or(result);
                let contract = row.get("contract")?.as_str()?.to_string();
                let bid = flex_f64(row.get("best_bid"));
                let ask = flex_f64(row.get("best_ask"));
                let mark = flex_f64(row.get("mark_price"));
                Some((
                    contract,
                    QuoteDelta { bid, ask, mark, funding_rate: None, timestamp },
                ))
            }
            "futures.order_book" => {
                let contract = result.get("contract")?.as_str()?.to_string();
                let bids = result.get("bids")?.as_array()?;
                let asks = result.get("asks")?.as_array()?;
                let bid = bids.first().and_then(|b| b.as_array()).and_then(|b| b.first()).and_then(flex_f64_ref);
                let ask = asks.first().and_then(|a| a.as_array()).and_then(|a| a.first()).and_then(flex_f64_ref);
                Some((contract, QuoteDelta { bid, ask, mark: None, funding_rate: None, timestamp }))
            }
            "futures.funding_rate" => {
                let row = result.as_array().and_then(|a| a.first()).unwrap_or(result);
                let contract = row.get("contract")?.as_str()?.to_string();
                let funding_rate = flex_f64(row.get("funding_rate"));
                Some((
                    contract,
                    QuoteDelta { bid: None, ask: None, mark: None, funding_rate, timestamp },
                ))
            }
            _ => None,
        }
    }

    fn keepalive(&self) -> KeepalivePolicy {
        KeepalivePolicy::None
    }

    fn ping_reply(&self, raw: &Message) -> Option<Message> {
        let bytes = match raw {
            Message::Text(s) => s.as_bytes(),
            Message::Binary(b) => b.as_slice(),
            Message::Ping(_) => return Some(Message::Pong(Vec::new())),
            _ => return None,
        };
        let v: Value = serde_json::from_slice(bytes).ok()?;
        if v.get("event")?.as_str()? == "ping" {
            return Some(Message::Text(
                serde_json::json!({ "time": Self::now(), "channel": "futures.ping" }).to_string(),
            ));
        }
        None
    }
}
