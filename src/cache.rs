//! Concurrency-safe mapping from (venue, instrument-key) to latest quote.
//!
//! One lock per venue, not a global lock and not `dashmap`'s per-key
//! sharding: each venue region has exactly one writer (its stream client),
//! so the minimum discipline is a lock around the whole per-venue map that
//! both writes and `snapshot()` take, giving readers an independent
//! point-in-time copy with no further synchronization.

use crate::types::{Quote, QuoteDelta, VenueId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub type InstrumentKey = String;

#[derive(Default)]
struct VenueRegion {
    quotes: Mutex<HashMap<InstrumentKey, Quote>>,
}

/// Shared across a venue's stream task (writer) and any number of evaluator
/// reads (readers). Clone is cheap — it shares the same underlying regions.
#[derive(Clone)]
pub struct QuoteCache {
    regions: Arc<HashMap<VenueId, Arc<VenueRegion>>>,
}

impl QuoteCache {
    pub fn new(venues: &[VenueId]) -> Self {
        let mut regions = HashMap::new();
        for &venue in venues {
            regions.insert(venue, Arc::new(VenueRegion::default()));
        }
        Self {
            regions: Arc::new(regions),
        }
    }

    /// Field-merge `delta` into the cache entry for `(venue, instrument_key)`.
    /// Creates the entry on first observation; never deletes.
    pub fn update(&self, venue: VenueId, instrument_key: &str, delta: QuoteDelta) {
        let Some(region) = self.regions.get(&venue) else {
            return;
        };
        let mut quotes = region.quotes.lock().expect("quote cache lock poisoned");
        quotes
            .entry(instrument_key.to_string())
            .or_default()
            .merge(delta);
    }

    /// Deep-copy snapshot of one venue's map. Downstream iteration over the
    /// result never holds the venue lock.
    pub fn snapshot(&self, venue: VenueId) -> HashMap<InstrumentKey, Quote> {
        match self.regions.get(&venue) {
            Some(region) => region.quotes.lock().expect("quote cache lock poisoned").clone(),
            None => HashMap::new(),
        }
    }
}
