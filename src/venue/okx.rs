//! OKX USDT-perpetual client.
//!
//! Subscribes to `tickers`, `books5`, and `funding-rate` channels via
//! `{op:"subscribe", args:[{channel, instId}, …]}`. Must reply to the
//! literal text `ping` with `pong`, and to `{op:"ping"}` with `{op:"pong"}`.
//! Grounded on `original_source/contango_monitor.py` (OKX section).

use crate::types::{Instrument, QuoteDelta, VenueId};
use crate::venue::{KeepalivePolicy, VenueClient};
use serde_json::Value;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio_tungstenite::tungstenite::Message;

const CHUNK_SIZE: usize = 20;

pub struct OkxClient;

impl OkxClient {
    pub fn new() -> Self {
        Self
    }

    fn now() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

impl VenueClient for OkxClient {
    fn venue(&self) -> VenueId {
        VenueId::Okx
    }

    fn ws_url(&self) -> &str {
        "wss://ws.okx.com:8443/ws/v5/public"
    }

    fn chunk_size(&self) -> usize {
        CHUNK_SIZE
    }

    fn build_subscriptions(&self, chunk: &[Instrument]) -> Vec<Message> {
        let mut args = Vec::new();
        for inst in chunk {
            for channel in ["tickers", "books5", "funding-rate"] {
                args.push(serde_json::json!({
                    "channel": channel,
                    "instId": inst.instrument_key,
                }));
            }
        }
        vec![Message::Text(
            serde_json::json!({ "op": "subscribe", "args": args }).to_string(),
        )]
    }

    fn handle_frame(&self, raw: &Message) -> Option<(String, QuoteDelta)> {
        let bytes = match raw {
            Message::Text(s) => s.as_bytes(),
            Message::Binary(b) => b.as_slice(),
            _ => return None,
        };
        let v: Value = serde_json::from_slice(bytes).ok()?;
        let channel = v.get("arg")?.get("channel")?.as_str()?;
        let row = v.get("data")?.as_array()?.first()?;
        let inst_id = row.get("instId")?.as_str()?.to_string();
        let timestamp = Self::now();

        let parse_f64 = |key: &str| row.get(key).and_then(Value::as_str).and_then(|s| s.parse::<f64>().ok());

        match channel {
            "tickers" => Some((
                inst_id,
                QuoteDelta {
                    bid: parse_f64("bidPx"),
                    ask: parse_f64("askPx"),
                    mark: parse_f64("markPx"),
                    funding_rate: None,
                    timestamp,
                },
            )),
            "books5" => {
                let bid = row
                    .get("bids")?
                    .as_array()?
                    .first()
                    .and_then(|b| b.as_array())
                    .and_then(|b| b.first())
                    .and_then(Value::as_str)
                    .and_then(|s| s.parse().ok());
                let ask = row
                    .get("asks")?
                    .as_array()?
                    .first()
                    .and_then(|a| a.as_array())
                    .and_then(|a| a.first())
                    .and_then(Value::as_str)
                    .and_then(|s| s.parse().ok());
                Some((inst_id, QuoteDelta { bid, ask, mark: None, funding_rate: None, timestamp }))
            }
            "funding-rate" => Some((
                inst_id,
                QuoteDelta {
                    bid: None,
                    ask: None,
                    mark: None,
                    funding_rate: parse_f64("fundingRate"),
                    timestamp,
                },
            )),
            _ => None,
        }
    }

    fn keepalive(&self) -> KeepalivePolicy {
        KeepalivePolicy::None
    }

    fn ping_reply(&self, raw: &Message) -> Option<Message> {
        match raw {
            Message::Text(s) if s == "ping" => Some(Message::Text("pong".to_string())),
            Message::Text(s) => {
                let v: Value = serde_json::from_str(s).ok()?;
                if v.get("op")?.as_str()? == "ping" {
                    Some(Message::Text(serde_json::json!({ "op": "pong" }).to_string()))
                } else {
                    None
                }
            }
            Message::Ping(_) => Some(Message::Pong(Vec::new())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_frame_reads_mark_price_from_mark_px() {
        let client = OkxClient::new();
        let raw = Message::Text(
            r#"{"arg":{"channel":"tickers","instId":"BTC-USDT-SWAP"},
                "data":[{"instId":"BTC-USDT-SWAP","bidPx":"64999.1","askPx":"65000.5","markPx":"65000.2"}]}"#
                .to_string(),
        );
        let (inst_id, delta) = client.handle_frame(&raw).expect("frame should parse");
        assert_eq!(inst_id, "BTC-USDT-SWAP");
        assert_eq!(delta.bid, Some(64_999.1));
        assert_eq!(delta.ask, Some(65_000.5));
        assert_eq!(delta.mark, Some(65_000.2));
    }

    #[test]
    fn handle_frame_parses_funding_rate() {
        let client = OkxClient::new();
        let raw = Message::Text(
            r#"{"arg":{"channel":"funding-rate","instId":"BTC-USDT-SWAP"},
                "data":[{"instId":"BTC-USDT-SWAP","fundingRate":"0.0001"}]}"#
                .to_string(),
        );
        let (inst_id, delta) = client.handle_frame(&raw).expect("frame should parse");
        assert_eq!(inst_id, "BTC-USDT-SWAP");
        assert_eq!(delta.funding_rate, Some(0.0001));
    }

    #[test]
    fn ping_reply_answers_literal_text_ping_with_pong() {
        let client = OkxClient::new();
        let raw = Message::Text("ping".to_string());
        let reply = client.ping_reply(&raw).expect("ping must be answered");
        assert_eq!(reply, Message::Text("pong".to_string()));
    }

    #[test]
    fn ping_reply_answers_op_ping_with_op_pong() {
        let client = OkxClient::new();
        let raw = Message::Text(r#"{"op":"ping"}"#.to_string());
        let reply = client.ping_reply(&raw).expect("ping must be answered");
        let Message::Text(text) = reply else { panic!("expected text frame") };
        let v: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(v["op"], "pong");
    }
}
