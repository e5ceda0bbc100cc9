//! Hyperliquid USDT-perpetual client.
//!
//! Per-coin subscription to `bbo` and `activeAssetCtx`; must send
//! `{method:"ping"}` every 30 s (no inbound frame triggers it, unlike the
//! other venues' reply-to-ping pattern). Grounded on
//! `original_source/hyperliquid_ws_monitor.py`, with the WebSocket
//! transport idiom from `aibysid-HyperLiquidMM`'s `ingestor.rs`.

use crate::types::{Instrument, QuoteDelta, VenueId};
use crate::venue::{KeepalivePolicy, VenueClient};
use serde_json::Value;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio_tungstenite::tungstenite::Message;

const CHUNK_SIZE: usize = 40;
const PING_PERIOD: Duration = Duration::from_secs(30);

pub struct HyperliquidClient;

impl HyperliquidClient {
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

impl VenueClient for HyperliquidClient {
    fn venue(&self) -> VenueId {
        VenueId::Hyperliquid
    }

    fn ws_url(&self) -> &str {
        "wss://api.hyperliquid.xyz/ws"
    }

    fn chunk_size(&self) -> usize {
        CHUNK_SIZE
    }

    fn build_subscriptions(&self, chunk: &[Instrument]) -> Vec<Message> {
        let mut frames = Vec::with_capacity(chunk.len() * 2);
        for inst in chunk {
            let coin = &inst.instrument_key;
            frames.push(Message::Text(
                serde_json::json!({
                    "method": "subscribe",
                    "subscription": { "type": "bbo", "coin": coin },
                })
                .to_string(),
            ));
            frames.push(Message::Text(
                serde_json::json!({
                    "method": "subscribe",
                    "subscription": { "type": "activeAssetCtx", "coin": coin },
                })
                .to_string(),
            ));
        }
        frames
    }

    fn handle_frame(&self, raw: &Message) -> Option<(String, QuoteDelta)> {
        let bytes = match raw {
            Message::Text(s) => s.as_bytes(),
            Message::Binary(b) => b.as_slice(),
            _ => return None,
        };
        let v: Value = serde_json::from_slice(bytes).ok()?;
        let channel = v.get("channel")?.as_str()?;
        let data = v.get("data")?;
        let timestamp = Self::now();

        match channel {
            "bbo" => {
                let coin = data.get("coin")?.as_str()?.to_string();
                let bbo = data.get("bbo")?.as_array()?;
                let bid = bbo.first().and_then(|l| l.get("px")).and_then(Value::as_str).and_then(|s| s.parse().ok());
                let ask = bbo.get(1).and_then(|l| l.get("px")).and_then(Value::as_str).and_then(|s| s.parse().ok());
                Some((coin, QuoteDelta { bid, ask, mark: None, funding_rate: None, timestamp }))
            }
            "activeAssetCtx" => {
                let coin = data.get("coin")?.as_str()?.to_string();
                let ctx = data.get("ctx")?;
                let mark = ctx.get("markPx").and_then(Value::as_str).and_then(|s| s.parse().ok());
                let funding_rate = ctx.get("funding").and_then(Value::as_str).and_then(|s| s.parse().ok());
                Some((coin, QuoteDelta { bid: None, ask: None, mark, funding_rate, timestamp }))
            }
            _ => None,
        }
    }

    fn keepalive(&self) -> KeepalivePolicy {
        KeepalivePolicy::Interval { period: PING_PERIOD }
    }

    fn keepalive_frame(&self) -> Option<Message> {
        Some(Message::Text(
            serde_json::json!({ "method": "ping" }).to_string(),
        ))
    }
}
