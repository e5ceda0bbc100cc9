//! One-shot REST instrument catalog loader, run once per venue at startup.
//!
//! Returns either a list of canonical bases (Korean spot, Hyperliquid) or a
//! mapping from venue-specific id to `{base, symbol}` (Gate, OKX). Only
//! instruments that are `swap`/`spot` as appropriate and settled in USDT
//! (perps) or quoted in KRW (spot) are retained. A failed call is a fatal
//! precondition for that venue only — the caller excludes it for the run.
//!
//! Grounded on `original_source/price_fetcher.py`'s REST catalog calls and
//! the teacher's `reqwest`-based REST client setup in `bin/data_collector.rs`.

use crate::error::ScannerError;
use crate::types::{canonicalize_base, Instrument, VenueId};
use serde::Deserialize;
use serde_json::Value;

fn catalog_err(venue: VenueId, source: impl Into<anyhow::Error>) -> ScannerError {
    ScannerError::CatalogLoad { venue, source: source.into() }
}

/// Shared by Upbit and Bithumb: both expose an upbit-compatible
/// `/v1/market/all` endpoint returning `[{market: "KRW-BTC", ...}, ...]`.
pub async fn load_korean_spot_catalog(
    client: &reqwest::Client,
    venue: VenueId,
    base_url: &str,
) -> Result<Vec<Instrument>, ScannerError> {
    #[derive(Deserialize)]
    struct Market {
        market: String,
    }

    let url = format!("{base_url}/v1/market/all?isDetails=false");
    let markets: Vec<Market> = client
        .get(&url)
        .send()
        .await
        .map_err(|e| catalog_err(venue, e))?
        .json()
        .await
        .map_err(|e| catalog_err(venue, e))?;

    Ok(markets
        .into_iter()
        .filter(|m| m.market.starts_with("KRW-"))
        .map(|m| {
            let base_raw = m.market.trim_start_matches("KRW-").to_string();
            Instrument {
                venue,
                instrument_key: m.market.clone(),
                base: canonicalize_base(&base_raw),
                display_symbol: m.market,
            }
        })
        .collect())
}

/// Gate.io perpetual contracts: `GET /api/v4/futures/usdt/contracts`.
pub async fn load_gate_catalog(client: &reqwest::Client) -> Result<Vec<Instrument>, ScannerError> {
    #[derive(Deserialize)]
    struct Contract {
        name: String,
        in_delisting: bool,
    }

    let contracts: Vec<Contract> = client
        .get("https://api.gateio.ws/api/v4/futures/usdt/contracts")
        .send()
        .await
        .map_err(|e| catalog_err(VenueId::GateIo, e))?
        .json()
        .await
        .map_err(|e| catalog_err(VenueId::GateIo, e))?;

    Ok(contracts
        .into_iter()
        .filter(|c| !c.in_delisting && c.name.ends_with("_USDT"))
        .map(|c| {
            let base_raw = c.name.trim_end_matches("_USDT").to_string();
            Instrument {
                venue: VenueId::GateIo,
                instrument_key: c.name.clone(),
                base: canonicalize_base(&base_raw),
                display_symbol: c.name,
            }
        })
        .collect())
}

/// OKX USDT-margined swaps: `GET /api/v5/public/instruments?instType=SWAP`.
pub async fn load_okx_catalog(client: &reqwest::Client) -> Result<Vec<Instrument>, ScannerError> {
    #[derive(Deserialize)]
    struct Resp {
        data: Vec<Inst>,
    }
    #[derive(Deserialize)]
    struct Inst {
        #[serde(rename = "instId")]
        inst_id: String,
        #[serde(rename = "settleCcy")]
        settle_ccy: String,
        state: String,
    }

    let resp: Resp = client
        .get("https://www.okx.com/api/v5/public/instruments?instType=SWAP")
        .send()
        .await
        .map_err(|e| catalog_err(VenueId::Okx, e))?
        .json()
        .await
        .map_err(|e| catalog_err(VenueId::Okx, e))?;

    Ok(resp
        .data
        .into_iter()
        .filter(|i| i.settle_ccy == "USDT" && i.state == "live")
        .map(|i| {
            let base_raw = i
                .inst_id
                .trim_end_matches("-USDT-SWAP")
                .to_string();
            Instrument {
                venue: VenueId::Okx,
                instrument_key: i.inst_id.clone(),
                base: canonicalize_base(&base_raw),
                display_symbol: i.inst_id,
            }
        })
        .collect())
}

/// Hyperliquid perpetual universe: `POST /info {"type":"meta"}`.
pub async fn load_hyperliquid_catalog(
    client: &reqwest::Client,
) -> Result<Vec<Instrument>, ScannerError> {
    let body: Value = client
        .post("https://api.hyperliquid.xyz/info")
        .json(&serde_json::json!({ "type": "meta" }))
        .send()
        .await
        .map_err(|e| catalog_err(VenueId::Hyperliquid, e))?
        .json()
        .await
        .map_err(|e| catalog_err(VenueId::Hyperliquid, e))?;

    let universe = body
        .get("universe")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    Ok(universe
        .into_iter()
        .filter_map(|entry| {
            let name = entry.get("name")?.as_str()?.to_string();
            Some(Instrument {
                venue: VenueId::Hyperliquid,
                base: canonicalize_base(&name),
                display_symbol: name.clone(),
                instrument_key: name,
            })
        })
        .collect())
}
