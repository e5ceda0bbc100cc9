//! Periodic driver: selects the best eligible opportunity, opens/closes
//! hedge tranches, and emits an append-only trade-event log.
//!
//! Grounded on `original_source/contango_auto_trader.py::auto_trade_loop`
//! and `execute_tranche`. Decided open questions (see DESIGN.md): the book
//! records entry/exit *after* the executor call returns (outcome-first),
//! and both legs are sized by the futures price.

use crate::error::ScannerError;
use crate::evaluator::{ContangoEvaluator, FuturesQuote};
use crate::executor::{OrderExecutor, OrderSide};
use crate::hedge::{HedgeBook, PositionKey, TRANCHE_USD};
use crate::tradelog::{ExecutionRecord, TradeEvent, TradeEventKind, TradeLogger};
use crate::types::{CanonicalBase, OpportunityRow, VenueId};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

fn now_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

/// Upbit/Bithumb's instrument-key convention; the only spot symbol shape
/// the auto-trader needs to hand the executor.
fn spot_symbol(base: &CanonicalBase) -> String {
    format!("KRW-{base}")
}

pub struct AutoTrader {
    entry_threshold: f64,
    exit_threshold: f64,
    book: HedgeBook,
    executor: Arc<dyn OrderExecutor>,
    logger: TradeLogger,
}

impl AutoTrader {
    pub fn new(
        entry_threshold: f64,
        exit_threshold: f64,
        executor: Arc<dyn OrderExecutor>,
        logger: TradeLogger,
    ) -> Self {
        Self {
            entry_threshold,
            exit_threshold,
            book: HedgeBook::new(),
            executor,
            logger,
        }
    }

    /// Run one evaluation + entry/exit pass. `spot`/`futures` are as built
    /// for `ContangoEvaluator::evaluate` (all rows, `min_spread_pct = 0`).
    pub async fn tick(
        &mut self,
        spot: &HashMap<VenueId, HashMap<CanonicalBase, f64>>,
        futures: &HashMap<VenueId, HashMap<CanonicalBase, FuturesQuote>>,
    ) -> anyhow::Result<()> {
        if spot.is_empty() {
            return Err(ScannerError::NoUsdReference.into());
        }

        let evaluator = ContangoEvaluator::new(0.0, false);
        let rows = evaluator.evaluate(spot, futures);

        self.try_entry(&rows).await?;
        self.try_exits(&rows).await?;
        self.book.prune_empty();
        Ok(())
    }

    async fn try_entry(&mut self, rows: &[OpportunityRow]) -> anyhow::Result<()> {
        // `rows` is already sorted descending by raw pct; the first row
        // clearing both gates is the single best eligible opportunity.
        let Some(row) = rows
            .iter()
            .find(|r| r.pct >= self.entry_threshold && r.funding_rate >= 0.0)
        else {
            return Ok(());
        };

        let key = PositionKey {
            spot_venue: row.spot_venue,
            futures_venue: row.futures_venue,
            base: row.base.clone(),
        };
        let capacity = self.book.position_mut(key).remaining_capacity();
        let request = TRANCHE_USD.min(capacity);
        if request <= 0.0 {
            return Ok(());
        }

        let qty = request / row.futures_price_usd;
        let futures_conf = self
            .executor
            .place(row.futures_venue, &row.futures_symbol, OrderSide::Sell, qty)
            .await;
        let spot_symbol_str = spot_symbol(&row.base);
        let spot_conf = self
            .executor
            .place(row.spot_venue, &spot_symbol_str, OrderSide::Buy, qty)
            .await;

        let (futures_order_id, spot_order_id) = match (&futures_conf, &spot_conf) {
            (Ok(f), Ok(s)) => (f.order_id.clone(), s.order_id.clone()),
            _ => {
                warn!(base = %row.base, "entry leg failed; position book reflects intent only");
                ("ERROR".to_string(), "ERROR".to_string())
            }
        };

        // Outcome-first: record the entry after the executor call returns.
        let added = self.book.position_mut(key).record_entry(request, row, now_secs());
        info!(base = %row.base, usd = added, spot = %row.spot_venue, futures = %row.futures_venue, "opened tranche");

        self.logger.log(&TradeEvent {
            event: TradeEventKind::Entry,
            timestamp: now_secs(),
            base: row.base.clone(),
            spot_exchange: row.spot_venue.to_string(),
            futures_exchange: row.futures_venue.to_string(),
            usd: added,
            spread_pct: row.pct,
            net_pct: row.net_pct,
            funding_rate: row.funding_rate,
            pnl_usd: None,
            portions: None,
            execution: ExecutionRecord { futures_order_id, spot_order_id },
        })?;

        Ok(())
    }

    async fn try_exits(&mut self, rows: &[OpportunityRow]) -> anyhow::Result<()> {
        let keys: Vec<PositionKey> = self.book.keys().copied().collect();
        for key in keys {
            let notional = match self.book.get(&key) {
                Some(p) if p.notional_usd > 0.0 => p.notional_usd,
                _ => continue,
            };

            let Some(row) = rows.iter().find(|r| {
                r.spot_venue == key.spot_venue && r.futures_venue == key.futures_venue && r.base == key.base
            }) else {
                continue;
            };

            if row.pct > self.exit_threshold {
                continue;
            }

            let request = TRANCHE_USD.min(notional);
            let qty = request / row.futures_price_usd;

            let futures_conf = self
                .executor
                .place(row.futures_venue, &row.futures_symbol, OrderSide::Buy, qty)
                .await;
            let spot_symbol_str = spot_symbol(&row.base);
            let spot_conf = self
                .executor
                .place(row.spot_venue, &spot_symbol_str, OrderSide::Sell, qty)
                .await;

            let (futures_order_id, spot_order_id) = match (&futures_conf, &spot_conf) {
                (Ok(f), Ok(s)) => (f.order_id.clone(), s.order_id.clone()),
                _ => {
                    warn!(base = %row.base, "exit leg failed; position book reflects intent only");
                    ("ERROR".to_string(), "ERROR".to_string())
                }
            };

            let (closed_usd, pnl, portions) =
                self.book.position_mut(key).record_exit(request, row.futures_price_usd, row.spot_price_usd);

            info!(base = %row.base, usd = closed_usd, pnl, "closed tranche");

            self.logger.log(&TradeEvent {
                event: TradeEventKind::Exit,
                timestamp: now_secs(),
                base: row.base.clone(),
                spot_exchange: row.spot_venue.to_string(),
                futures_exchange: row.futures_venue.to_string(),
                usd: closed_usd,
                spread_pct: row.pct,
                net_pct: row.net_pct,
                funding_rate: row.funding_rate,
                pnl_usd: Some(pnl),
                portions: Some(portions.iter().map(|p| p.usd).collect()),
                execution: ExecutionRecord { futures_order_id, spot_order_id },
            })?;
        }
        Ok(())
    }

    /// Run forever at the given interval (seconds). Intended to be the body
    /// of `bin/autotrade`'s main loop.
    pub async fn run_forever(
        mut self,
        interval_secs: f64,
        mut poll: impl FnMut() -> (
            HashMap<VenueId, HashMap<CanonicalBase, f64>>,
            HashMap<VenueId, HashMap<CanonicalBase, FuturesQuote>>,
        ),
    ) -> anyhow::Result<()> {
        let mut ticker = tokio::time::interval(Duration::from_secs_f64(interval_secs));
        loop {
            ticker.tick().await;
            let (spot, futures) = poll();
            if let Err(e) = self.tick(&spot, &futures).await {
                // A missing USD reference is a fatal precondition (no spot
                // venue can be converted to USD at all), unlike an ordinary
                // tick failure — propagate it instead of looping forever.
                if matches!(e.downcast_ref::<ScannerError>(), Some(ScannerError::NoUsdReference)) {
                    return Err(e);
                }
                warn!(error = %e, "auto-trader tick failed, continuing");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::DryRunExecutor;
    use std::env;
    use std::fs;

    fn maps(
        spot_usd: f64,
        futures_bid: f64,
        funding: f64,
    ) -> (
        HashMap<VenueId, HashMap<CanonicalBase, f64>>,
        HashMap<VenueId, HashMap<CanonicalBase, FuturesQuote>>,
    ) {
        let mut spot_inner = HashMap::new();
        spot_inner.insert("BTC".to_string(), spot_usd);
        let mut spot = HashMap::new();
        spot.insert(VenueId::Upbit, spot_inner);

        let mut futures_inner = HashMap::new();
        futures_inner.insert(
            "BTC".to_string(),
            FuturesQuote { symbol: "BTC_USDT".to_string(), bid: futures_bid, funding_rate: funding },
        );
        let mut futures = HashMap::new();
        futures.insert(VenueId::GateIo, futures_inner);

        (spot, futures)
    }

    fn test_trader(name: &str) -> (AutoTrader, std::path::PathBuf) {
        let dir = env::temp_dir().join(format!("contango_autotrader_test_{name}"));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        let log_path = dir.join("trade_cycles.jsonl");
        let logger = TradeLogger::new(&log_path).unwrap();
        (
            AutoTrader::new(1.0, 0.3, Arc::new(DryRunExecutor), logger),
            log_path,
        )
    }

    #[tokio::test]
    async fn entry_gate_rejects_negative_funding() {
        let (mut trader, log_path) = test_trader("entry_gate_negative");
        let (spot, futures) = maps(100_000.0, 102_000.0, -0.0001);
        trader.tick(&spot, &futures).await.unwrap();
        assert_eq!(trader.book.keys().count(), 0);
        let _ = fs::remove_dir_all(log_path.parent().unwrap());
    }

    #[tokio::test]
    async fn entry_gate_opens_on_nonnegative_funding() {
        let (mut trader, log_path) = test_trader("entry_gate_flat");
        let (spot, futures) = maps(100_000.0, 102_000.0, 0.0);
        trader.tick(&spot, &futures).await.unwrap();
        assert_eq!(trader.book.keys().count(), 1);
        assert_eq!(trader.logger.record_count().unwrap(), 1);
        let _ = fs::remove_dir_all(log_path.parent().unwrap());
    }

    #[tokio::test]
    async fn exit_closes_when_spread_collapses() {
        let (mut trader, log_path) = test_trader("exit_closes");
        let (spot, futures_open) = maps(100_000.0, 102_000.0, 0.0);
        trader.tick(&spot, &futures_open).await.unwrap();
        assert_eq!(trader.book.keys().count(), 1);

        let (spot2, futures_flat) = maps(100_000.0, 100_100.0, 0.0); // pct=0.1 <= exit_threshold
        trader.tick(&spot2, &futures_flat).await.unwrap();
        assert_eq!(trader.book.keys().count(), 0, "position should close and prune");
        assert_eq!(trader.logger.record_count().unwrap(), 2);
        let _ = fs::remove_dir_all(log_path.parent().unwrap());
    }
}
