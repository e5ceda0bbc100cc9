//! Pluggable order execution. `DryRunExecutor` is the default, safe path;
//! `LiveExecutor` fails closed on missing credentials — it does not
//! implement a specific exchange trading API (out of scope), so the live
//! path is documented, intentional fail-closed behavior, not a stub left
//! unfinished.
//!
//! Grounded on `arbitrage::executor::TradeExecutor`'s dry-run/live branch
//! (and its "default to dry run for safety" idiom) plus
//! `original_source/contango_trade_executor.py::create_exchange_client` /
//! `execute_live_trade`'s identical env-credential fatal check.

use crate::config::VenueCredentials;
use crate::error::ScannerError;
use crate::types::VenueId;
use async_trait::async_trait;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "buy"),
            OrderSide::Sell => write!(f, "sell"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrderConfirmation {
    pub venue: VenueId,
    pub symbol: String,
    pub side: OrderSide,
    pub qty: f64,
    pub order_id: String,
}

#[async_trait]
pub trait OrderExecutor: Send + Sync {
    async fn place(
        &self,
        venue: VenueId,
        symbol: &str,
        side: OrderSide,
        qty: f64,
    ) -> Result<OrderConfirmation, ScannerError>;
}

/// Suppresses side effects; returns a synthetic `"DRY_RUN"` confirmation.
pub struct DryRunExecutor;

#[async_trait]
impl OrderExecutor for DryRunExecutor {
    async fn place(
        &self,
        venue: VenueId,
        symbol: &str,
        side: OrderSide,
        qty: f64,
    ) -> Result<OrderConfirmation, ScannerError> {
        info!(%venue, symbol, %side, qty, "DRY_RUN order (no side effects)");
        Ok(OrderConfirmation {
            venue,
            symbol: symbol.to_string(),
            side,
            qty,
            order_id: "DRY_RUN".to_string(),
        })
    }
}

/// Reads `<VENUE>_API_KEY`/`<VENUE>_API_SECRET`/`<VENUE>_API_PASSWORD` from
/// the environment at construction time. No real exchange trading API is
/// wired up (out of scope) — every `place` call fails closed.
pub struct LiveExecutor {
    credentials: std::collections::HashMap<VenueId, VenueCredentials>,
}

impl LiveExecutor {
    pub fn from_env(venues: &[VenueId]) -> Result<Self, ScannerError> {
        let mut credentials = std::collections::HashMap::new();
        for &venue in venues {
            let creds = VenueCredentials::from_env(venue.env_prefix()).map_err(|_| {
                ScannerError::MissingCredentials { venue, var: "API_KEY/API_SECRET" }
            })?;
            credentials.insert(venue, creds);
        }
        warn!("LiveExecutor in LIVE mode — real orders would be placed if a trading client were wired up");
        Ok(Self { credentials })
    }
}

#[async_trait]
impl OrderExecutor for LiveExecutor {
    async fn place(
        &self,
        venue: VenueId,
        symbol: &str,
        side: OrderSide,
        qty: f64,
    ) -> Result<OrderConfirmation, ScannerError> {
        if !self.credentials.contains_key(&venue) {
            return Err(ScannerError::MissingCredentials { venue, var: "API_KEY/API_SECRET" });
        }
        Err(ScannerError::ExecutionFailed {
            venue,
            message: format!(
                "no live trading client is wired up for {venue} ({side} {qty} {symbol})"
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dry_run_executor_returns_synthetic_confirmation() {
        let exec = DryRunExecutor;
        let conf = exec.place(VenueId::GateIo, "BTC_USDT", OrderSide::Sell, 0.01).await.unwrap();
        assert_eq!(conf.order_id, "DRY_RUN");
    }

    #[tokio::test]
    async fn live_executor_fails_closed_without_credentials() {
        // Ensure a clean environment for this one venue.
        std::env::remove_var("OKX_API_KEY");
        std::env::remove_var("OKX_API_SECRET");
        let result = LiveExecutor::from_env(&[VenueId::Okx]);
        assert!(matches!(result, Err(ScannerError::MissingCredentials { .. })));
    }
}
