//! Converts a KRW spot venue's quotes into a `{canonical_base → usd_price}`
//! map using the current USD rate. Pure function, no I/O.
//!
//! Grounded on `build_spot_usd_maps` in every `original_source/*.py` script.

use crate::cache::InstrumentKey;
use crate::rate::USDT_KRW_KEY;
use crate::types::{CanonicalBase, Instrument, Quote};
use std::collections::HashMap;

/// For each instrument whose quote carries a usable KRW price, pick `ask`
/// if present else `mark` (the only "last trade" signal this cache
/// carries), divide by `rate`, and key by canonical base. Entries with no
/// usable price, or the `USDT/KRW` bridge itself, are omitted.
pub fn spot_usd_map(
    quotes: &HashMap<InstrumentKey, Quote>,
    instruments: &[Instrument],
    rate: f64,
) -> HashMap<CanonicalBase, f64> {
    let mut out = HashMap::new();
    if rate <= 0.0 {
        return out;
    }

    for inst in instruments {
        if inst.instrument_key == USDT_KRW_KEY {
            continue;
        }
        let Some(quote) = quotes.get(&inst.instrument_key) else {
            continue;
        };
        let Some(krw_price) = quote.ask.or(quote.mark) else {
            continue;
        };
        if krw_price <= 0.0 {
            continue;
        }
        out.insert(inst.base.clone(), krw_price / rate);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VenueId;

    fn instrument(key: &str, base: &str) -> Instrument {
        Instrument {
            venue: VenueId::Upbit,
            instrument_key: key.to_string(),
            base: base.to_string(),
            display_symbol: key.to_string(),
        }
    }

    #[test]
    fn converts_krw_ask_to_usd() {
        let mut quotes = HashMap::new();
        quotes.insert(
            "KRW-BTC".to_string(),
            Quote { bid: None, ask: Some(140_000_000.0), mark: None, funding_rate: None, timestamp: 0 },
        );
        let instruments = vec![instrument("KRW-BTC", "BTC")];
        let map = spot_usd_map(&quotes, &instruments, 1_400.0);
        assert!((map["BTC"] - 100_000.0).abs() < 0.001);
    }

    #[test]
    fn bridge_instrument_is_excluded() {
        let mut quotes = HashMap::new();
        quotes.insert(
            USDT_KRW_KEY.to_string(),
            Quote { bid: None, ask: Some(1_400.0), mark: None, funding_rate: None, timestamp: 0 },
        );
        let instruments = vec![instrument(USDT_KRW_KEY, "USDT")];
        let map = spot_usd_map(&quotes, &instruments, 1_400.0);
        assert!(map.is_empty());
    }

    #[test]
    fn missing_quote_is_omitted_not_zero() {
        let quotes = HashMap::new();
        let instruments = vec![instrument("KRW-ETH", "ETH")];
        let map = spot_usd_map(&quotes, &instruments, 1_400.0);
        assert!(!map.contains_key("ETH"));
    }
}
