//! Core domain types: venues, instruments, quotes, and opportunity rows.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A market this scanner talks to. The venue set is closed — unlike the
/// teacher's `DexType`, no "unknown DEX" variant is modeled because the
/// original source never discovers a venue at runtime either.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VenueId {
    Upbit,
    Bithumb,
    Okx,
    GateIo,
    Hyperliquid,
}

impl VenueId {
    pub fn as_str(&self) -> &'static str {
        match self {
            VenueId::Upbit => "upbit",
            VenueId::Bithumb => "bithumb",
            VenueId::Okx => "okx",
            VenueId::GateIo => "gateio",
            VenueId::Hyperliquid => "hyperliquid",
        }
    }

    pub fn market_kind(&self) -> MarketKind {
        match self {
            VenueId::Upbit | VenueId::Bithumb => MarketKind::Spot,
            VenueId::Okx | VenueId::GateIo | VenueId::Hyperliquid => MarketKind::Swap,
        }
    }

    /// Taker-fee fraction for a single leg. Configured, not discovered.
    pub fn taker_fee(&self) -> f64 {
        match self {
            VenueId::Upbit => 0.0005,
            VenueId::Bithumb => 0.0004,
            VenueId::GateIo => 0.0005,
            VenueId::Hyperliquid => 0.00035,
            VenueId::Okx => 0.0005,
        }
    }

    pub fn env_prefix(&self) -> &'static str {
        match self {
            VenueId::Upbit => "UPBIT",
            VenueId::Bithumb => "BITHUMB",
            VenueId::Okx => "OKX",
            VenueId::GateIo => "GATEIO",
            VenueId::Hyperliquid => "HYPERLIQUID",
        }
    }
}

impl fmt::Display for VenueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Spot venues trade KRW against a base asset; swap venues trade USDT perps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketKind {
    Spot,
    Swap,
}

/// Uppercase, hyphen-stripped cross-venue join key (e.g. `BTC`, `1000PEPE`).
pub type CanonicalBase = String;

pub fn canonicalize_base(raw: &str) -> CanonicalBase {
    raw.to_uppercase().replace('-', "").replace('_', "")
}

/// A venue-local tradable instrument, resolved once at startup by the
/// catalog loader and immutable thereafter (refreshed only on reconnect).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    pub venue: VenueId,
    /// Venue-local id: Upbit `KRW-BTC`, Gate `BTC_USDT`, OKX `BTC-USDT-SWAP`,
    /// Hyperliquid coin `BTC`.
    pub instrument_key: String,
    pub base: CanonicalBase,
    pub display_symbol: String,
}

/// Latest top-of-book + funding for one instrument. Every field is optional
/// because different feeds update different subsets; a quote with neither
/// `bid` nor `ask` is invisible to the evaluator.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Quote {
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    pub mark: Option<f64>,
    pub funding_rate: Option<f64>,
    /// Wall-clock seconds of the last update.
    pub timestamp: u64,
}

impl Quote {
    /// Field-merge a delta into this quote. Absent (`None`) delta fields
    /// leave the existing value untouched — never interpreted as "clear it".
    pub fn merge(&mut self, delta: QuoteDelta) {
        if delta.bid.is_some() {
            self.bid = delta.bid;
        }
        if delta.ask.is_some() {
            self.ask = delta.ask;
        }
        if delta.mark.is_some() {
            self.mark = delta.mark;
        }
        if delta.funding_rate.is_some() {
            self.funding_rate = delta.funding_rate;
        }
        self.timestamp = delta.timestamp;
    }
}

/// Partial update produced by a venue's frame dispatcher for one instrument.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuoteDelta {
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    pub mark: Option<f64>,
    pub funding_rate: Option<f64>,
    pub timestamp: u64,
}

/// Ephemeral row produced by the contango evaluator on each evaluation tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpportunityRow {
    pub base: CanonicalBase,
    pub spot_venue: VenueId,
    pub futures_venue: VenueId,
    pub spot_price_usd: f64,
    pub futures_price_usd: f64,
    pub spread: f64,
    pub pct: f64,
    pub fees_pct: f64,
    pub net_pct: f64,
    pub net_pct_minus_0_2: f64,
    pub net_pct_minus_0_4: f64,
    pub funding_rate: f64,
    pub futures_symbol: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn venue_display_matches_as_str() {
        assert_eq!(VenueId::GateIo.to_string(), "gateio");
        assert_eq!(VenueId::Upbit.as_str(), "upbit");
    }

    #[test]
    fn canonicalize_strips_separators_and_upcases() {
        assert_eq!(canonicalize_base("1000pepe"), "1000PEPE");
        assert_eq!(canonicalize_base("btc-usdt"), "BTCUSDT");
    }

    #[test]
    fn quote_merge_only_touches_present_fields() {
        let mut q = Quote {
            bid: Some(1.0),
            ask: Some(2.0),
            mark: None,
            funding_rate: Some(0.001),
            timestamp: 10,
        };
        q.merge(QuoteDelta {
            bid: Some(1.5),
            ask: None,
            mark: None,
            funding_rate: None,
            timestamp: 20,
        });
        assert_eq!(q.bid, Some(1.5));
        assert_eq!(q.ask, Some(2.0), "ask absent from delta must survive");
        assert_eq!(q.funding_rate, Some(0.001));
        assert_eq!(q.timestamp, 20);
    }
}
