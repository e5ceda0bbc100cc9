//! FIFO tranche ledger per (spot venue, futures venue, base) position;
//! enforces the per-leg cap and computes realized PnL on partial unwind.
//!
//! Grounded 1:1 on `original_source/contango_auto_trader.py::HedgePosition`:
//! `record_entry`, `record_exit`, the FIFO walk with `1e-9` epsilon tranche
//! retirement, and the `remaining_capacity` accessor.

use crate::types::{CanonicalBase, OpportunityRow, VenueId};
use std::collections::HashMap;

pub const MAX_PER_LEG_USD: f64 = 2000.0;
pub const TRANCHE_USD: f64 = 50.0;
const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy)]
pub struct Tranche {
    pub usd: f64,
    pub entry_futures_price: f64,
    pub entry_spot_price: f64,
    pub timestamp: u64,
}

/// Detail of one tranche (or tranche-fraction) consumed by an exit.
#[derive(Debug, Clone, Copy)]
pub struct ExitPortion {
    pub usd: f64,
    pub qty: f64,
    pub pnl: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PositionKey {
    pub spot_venue: VenueId,
    pub futures_venue: VenueId,
    pub base: CanonicalBase,
}

#[derive(Debug, Clone, Default)]
pub struct HedgePosition {
    pub notional_usd: f64,
    pub tranches: Vec<Tranche>,
}

impl HedgePosition {
    pub fn remaining_capacity(&self) -> f64 {
        MAX_PER_LEG_USD - self.notional_usd
    }

    /// Clamp `usd_request` to `remaining_capacity`. A non-positive clamp is
    /// a no-op returning 0. Otherwise append a tranche and grow notional.
    pub fn record_entry(&mut self, usd_request: f64, row: &OpportunityRow, now: u64) -> f64 {
        let capacity = self.remaining_capacity();
        if capacity <= 0.0 {
            return 0.0;
        }
        let usd_added = usd_request.min(capacity);
        if usd_added <= 0.0 {
            return 0.0;
        }

        self.tranches.push(Tranche {
            usd: usd_added,
            entry_futures_price: row.futures_price_usd,
            entry_spot_price: row.spot_price_usd,
            timestamp: now,
        });
        self.notional_usd += usd_added;
        debug_assert!((self.notional_usd - self.tranches.iter().map(|t| t.usd).sum::<f64>()).abs() <= EPSILON);
        usd_added
    }

    /// Clamp `usd_request` to `notional_usd`, then walk tranches FIFO,
    /// consuming `min(remaining request, tranche.usd)` from each. PnL of
    /// the consumed portion is `qty * ((entry_fut - exit_fut) + (exit_spot
    /// - entry_spot))` with `qty = portion_usd / entry_futures_price` —
    /// the pair-trade PnL of a unit short-futures + long-spot hedge.
    pub fn record_exit(
        &mut self,
        usd_request: f64,
        exit_futures_price: f64,
        exit_spot_price: f64,
    ) -> (f64, f64, Vec<ExitPortion>) {
        let mut remaining = usd_request.min(self.notional_usd).max(0.0);
        let mut closed_usd = 0.0;
        let mut realized_pnl = 0.0;
        let mut portions = Vec::new();

        let mut i = 0;
        while i < self.tranches.len() && remaining > EPSILON {
            let tranche = self.tranches[i];
            let portion_usd = remaining.min(tranche.usd);
            let qty = portion_usd / tranche.entry_futures_price;
            let pnl = qty
                * ((tranche.entry_futures_price - exit_futures_price)
                    + (exit_spot_price - tranche.entry_spot_price));

            portions.push(ExitPortion { usd: portion_usd, qty, pnl });
            realized_pnl += pnl;
            closed_usd += portion_usd;
            remaining -= portion_usd;

            self.tranches[i].usd -= portion_usd;
            if self.tranches[i].usd <= EPSILON {
                self.tranches.remove(i);
            } else {
                i += 1;
            }
        }

        self.notional_usd -= closed_usd;
        if self.notional_usd < 0.0 {
            self.notional_usd = 0.0;
        }

        (closed_usd, realized_pnl, portions)
    }

    pub fn is_empty(&self) -> bool {
        self.notional_usd <= EPSILON
    }
}

/// Owns every open `HedgePosition`, keyed by `(spot, futures, base)`.
/// Single-writer (the auto-trader); requires no lock.
#[derive(Default)]
pub struct HedgeBook {
    positions: HashMap<PositionKey, HedgePosition>,
}

impl HedgeBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position_mut(&mut self, key: PositionKey) -> &mut HedgePosition {
        self.positions.entry(key).or_default()
    }

    pub fn get(&self, key: &PositionKey) -> Option<&HedgePosition> {
        self.positions.get(key)
    }

    /// Drop positions whose notional has returned to ~0.
    pub fn prune_empty(&mut self) {
        self.positions.retain(|_, p| !p.is_empty());
    }

    pub fn keys(&self) -> impl Iterator<Item = &PositionKey> {
        self.positions.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(futures_price: f64, spot_price: f64) -> OpportunityRow {
        OpportunityRow {
            base: "BTC".to_string(),
            spot_venue: VenueId::Upbit,
            futures_venue: VenueId::GateIo,
            spot_price_usd: spot_price,
            futures_price_usd: futures_price,
            spread: futures_price - spot_price,
            pct: 0.0,
            fees_pct: 0.0,
            net_pct: 0.0,
            net_pct_minus_0_2: 0.0,
            net_pct_minus_0_4: 0.0,
            funding_rate: 0.0,
            futures_symbol: "BTC_USDT".to_string(),
        }
    }

    #[test]
    fn fifo_pnl_matches_seed_scenario() {
        let mut pos = HedgePosition::default();
        pos.record_entry(50.0, &row(100.0, 99.0), 1);
        pos.record_entry(50.0, &row(110.0, 108.0), 2);

        let (closed_usd, pnl, portions) = pos.record_exit(80.0, 95.0, 96.0);

        assert!((closed_usd - 80.0).abs() < 1e-9);
        assert_eq!(portions.len(), 2);

        // tranche 1: usd=50, qty=0.5, pnl = 0.5*((100-95)+(96-99)) = 0.5*2 = 1.0
        assert!((portions[0].qty - 0.5).abs() < 1e-9);
        assert!((portions[0].pnl - 1.0).abs() < 1e-9);

        // tranche 2: usd=30, qty=30/110, pnl = qty*((110-95)+(96-108))
        let qty2 = 30.0 / 110.0;
        let expected_pnl2 = qty2 * ((110.0 - 95.0) + (96.0 - 108.0));
        assert!((portions[1].qty - qty2).abs() < 1e-9);
        assert!((portions[1].pnl - expected_pnl2).abs() < 1e-9);

        assert!((pnl - (1.0 + expected_pnl2)).abs() < 1e-9);
        assert!((pos.notional_usd - 20.0).abs() < 1e-9);
    }

    #[test]
    fn capacity_cap_rejects_the_41st_tranche() {
        let mut pos = HedgePosition::default();
        for _ in 0..40 {
            let added = pos.record_entry(TRANCHE_USD, &row(100.0, 99.0), 0);
            assert!((added - TRANCHE_USD).abs() < 1e-9);
        }
        assert!((pos.notional_usd - MAX_PER_LEG_USD).abs() < 1e-9);

        let added_41st = pos.record_entry(TRANCHE_USD, &row(100.0, 99.0), 0);
        assert_eq!(added_41st, 0.0);
    }

    #[test]
    fn round_trip_open_then_close_returns_to_zero() {
        let mut pos = HedgePosition::default();
        for _ in 0..5 {
            pos.record_entry(TRANCHE_USD, &row(100.0, 99.0), 0);
        }
        for _ in 0..5 {
            pos.record_exit(TRANCHE_USD, 100.0, 99.0);
        }
        assert!(pos.is_empty());
        assert!(pos.tranches.is_empty());
    }

    #[test]
    fn prune_empty_removes_zero_notional_positions() {
        let mut book = HedgeBook::new();
        let key = PositionKey { spot_venue: VenueId::Upbit, futures_venue: VenueId::GateIo, base: "BTC".to_string() };
        book.position_mut(key).record_entry(50.0, &row(100.0, 99.0), 0);
        book.position_mut(key).record_exit(50.0, 100.0, 99.0);
        book.prune_empty();
        assert!(book.get(&key).is_none());
    }
}
