//! KRW→USD reference rate, derived from each spot venue's `USDT/KRW` quote.
//!
//! Grounded on the `USDKRWCache` class duplicated across every venue script
//! in `original_source/` (`contango_monitor.py`, `gate_ws_monitor.py`, …) —
//! the Rust port centralizes the one copy all five carried independently.

use crate::cache::InstrumentKey;
use crate::error::ScannerError;
use crate::types::{Quote, VenueId};
use std::collections::HashMap;
use std::time::{Duration, Instant};

const TTL: Duration = Duration::from_secs(30);

/// Upbit/Bithumb's instrument key for the `USDT/KRW` bridge ticker.
pub const USDT_KRW_KEY: &str = "KRW-USDT";

struct CachedRate {
    raw_value: f64,
    memoised_rate: f64,
    timestamp: Instant,
}

#[derive(Default)]
pub struct UsdRateCache {
    records: HashMap<VenueId, CachedRate>,
}

impl UsdRateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 1. Read `USDT/KRW` from `quotes`; fail if absent or null.
    /// 2. If a record exists, `raw_value` is unchanged, and the record is
    ///    within TTL, return the memoised rate.
    /// 3. Otherwise store the new reading and return it.
    pub fn get_rate(
        &mut self,
        venue: VenueId,
        quotes: &HashMap<InstrumentKey, Quote>,
    ) -> Result<f64, ScannerError> {
        let raw_value = quotes
            .get(USDT_KRW_KEY)
            .and_then(|q| q.ask.or(q.mark))
            .filter(|v| *v > 0.0)
            .ok_or(ScannerError::MissingUsdKrw { venue })?;

        let now = Instant::now();
        if let Some(record) = self.records.get(&venue) {
            if record.raw_value == raw_value && now.duration_since(record.timestamp) < TTL {
                return Ok(record.memoised_rate);
            }
        }

        self.records.insert(
            venue,
            CachedRate {
                raw_value,
                memoised_rate: raw_value,
                timestamp: now,
            },
        );
        Ok(raw_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quotes_with_usdt_krw(ask: f64) -> HashMap<InstrumentKey, Quote> {
        let mut m = HashMap::new();
        m.insert(
            USDT_KRW_KEY.to_string(),
            Quote {
                bid: None,
                ask: Some(ask),
                mark: None,
                funding_rate: None,
                timestamp: 0,
            },
        );
        m
    }

    #[test]
    fn missing_usdt_krw_is_an_error() {
        let mut cache = UsdRateCache::new();
        let quotes = HashMap::new();
        let err = cache.get_rate(VenueId::Upbit, &quotes).unwrap_err();
        assert!(matches!(err, ScannerError::MissingUsdKrw { .. }));
    }

    #[test]
    fn repeated_equal_raw_value_within_ttl_is_memoised() {
        let mut cache = UsdRateCache::new();
        let quotes = quotes_with_usdt_krw(1400.0);
        let first = cache.get_rate(VenueId::Upbit, &quotes).unwrap();
        let second = cache.get_rate(VenueId::Upbit, &quotes).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, 1400.0);
    }

    #[test]
    fn changed_raw_value_updates_the_rate() {
        let mut cache = UsdRateCache::new();
        let q1 = quotes_with_usdt_krw(1400.0);
        let q2 = quotes_with_usdt_krw(1410.0);
        let first = cache.get_rate(VenueId::Upbit, &q1).unwrap();
        let second = cache.get_rate(VenueId::Upbit, &q2).unwrap();
        assert_eq!(first, 1400.0);
        assert_eq!(second, 1410.0);
    }
}
