//! Secondary binary: runs the auto-trader loop standalone against live
//! venue streams.
//!
//! Grounded on `paper_trading::run_paper_trading`'s JoinSet task-wiring
//! idiom and `original_source/contango_auto_trader.py::main`.

use anyhow::Result;
use contango_scanner::autotrader::AutoTrader;
use contango_scanner::cache::QuoteCache;
use contango_scanner::catalog;
use contango_scanner::config::{DriverConfig, FuturesVenueFlag};
use contango_scanner::evaluator::FuturesQuote;
use contango_scanner::executor::{DryRunExecutor, LiveExecutor, OrderExecutor};
use contango_scanner::project::spot_usd_map;
use contango_scanner::rate::UsdRateCache;
use contango_scanner::tradelog::{TradeLogger, DEFAULT_LOG_FILE};
use contango_scanner::types::{CanonicalBase, Instrument, MarketKind, VenueId};
use contango_scanner::venue::bithumb::BithumbClient;
use contango_scanner::venue::gateio::GateIoClient;
use contango_scanner::venue::hyperliquid::HyperliquidClient;
use contango_scanner::venue::okx::OkxClient;
use contango_scanner::venue::upbit::UpbitClient;
use contango_scanner::venue::{run_reconnect_loop, VenueClient};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    info!("===========================================");
    info!("   Contango Hedge Auto-Trader");
    info!("===========================================");

    let config = DriverConfig::load();
    config.validate()?;

    let spot_venues: Vec<VenueId> = [
        (!config.no_upbit).then_some(VenueId::Upbit),
        (!config.no_bithumb).then_some(VenueId::Bithumb),
    ]
    .into_iter()
    .flatten()
    .collect();

    let futures_venues: Vec<VenueId> = config
        .futures
        .iter()
        .map(|f| match f {
            FuturesVenueFlag::Okx => VenueId::Okx,
            FuturesVenueFlag::Gate => VenueId::GateIo,
            FuturesVenueFlag::Hyper => VenueId::Hyperliquid,
        })
        .collect();

    let http = reqwest::Client::new();
    let mut catalogs: HashMap<VenueId, Vec<Instrument>> = HashMap::new();

    for &venue in &spot_venues {
        let base_url = match venue {
            VenueId::Upbit => "https://api.upbit.com",
            VenueId::Bithumb => "https://api.bithumb.com",
            _ => unreachable!(),
        };
        if let Ok(instruments) = catalog::load_korean_spot_catalog(&http, venue, base_url).await {
            if !instruments.is_empty() {
                catalogs.insert(venue, instruments);
            }
        }
    }
    for &venue in &futures_venues {
        let result = match venue {
            VenueId::GateIo => catalog::load_gate_catalog(&http).await,
            VenueId::Okx => catalog::load_okx_catalog(&http).await,
            VenueId::Hyperliquid => catalog::load_hyperliquid_catalog(&http).await,
            _ => unreachable!(),
        };
        if let Ok(instruments) = result {
            if !instruments.is_empty() {
                catalogs.insert(venue, instruments);
            }
        }
    }

    let active_venues: Vec<VenueId> = catalogs.keys().copied().collect();
    if active_venues.is_empty() {
        anyhow::bail!("no venue catalog loaded successfully; nothing to trade");
    }

    let cache = QuoteCache::new(&active_venues);
    let mut tasks = JoinSet::new();
    for &venue in &active_venues {
        let instruments = catalogs[&venue].clone();
        let client: Arc<dyn VenueClient> = match venue {
            VenueId::Upbit => Arc::new(UpbitClient::new()),
            VenueId::Bithumb => Arc::new(BithumbClient::new()),
            VenueId::GateIo => Arc::new(GateIoClient::new()),
            VenueId::Okx => Arc::new(OkxClient::new()),
            VenueId::Hyperliquid => Arc::new(HyperliquidClient::new()),
        };
        let cache = cache.clone();
        tasks.spawn(async move { run_reconnect_loop(client, instruments, cache).await });
    }

    let executor: Arc<dyn OrderExecutor> = if config.live {
        Arc::new(LiveExecutor::from_env(&active_venues)?)
    } else {
        Arc::new(DryRunExecutor)
    };

    let logger = TradeLogger::new(DEFAULT_LOG_FILE)?;
    let trader = AutoTrader::new(config.entry_threshold, config.exit_threshold, executor, logger);

    let mut rate_cache = UsdRateCache::new();
    let catalogs_for_poll = catalogs.clone();
    let cache_for_poll = cache.clone();

    let poll = move || -> (
        HashMap<VenueId, HashMap<CanonicalBase, f64>>,
        HashMap<VenueId, HashMap<CanonicalBase, FuturesQuote>>,
    ) {
        let mut spot = HashMap::new();
        for (&venue, instruments) in &catalogs_for_poll {
            if venue.market_kind() != MarketKind::Spot {
                continue;
            }
            let quotes = cache_for_poll.snapshot(venue);
            match rate_cache.get_rate(venue, &quotes) {
                Ok(rate) => {
                    spot.insert(venue, spot_usd_map(&quotes, instruments, rate));
                }
                Err(e) => warn!(%venue, error = %e, "skipping venue this tick"),
            }
        }

        let mut futures = HashMap::new();
        for (&venue, instruments) in &catalogs_for_poll {
            if venue.market_kind() != MarketKind::Swap {
                continue;
            }
            let quotes = cache_for_poll.snapshot(venue);
            let mut inner = HashMap::new();
            for inst in instruments {
                let Some(quote) = quotes.get(&inst.instrument_key) else {
                    continue;
                };
                let (Some(bid), Some(funding_rate)) = (quote.bid, quote.funding_rate) else {
                    continue;
                };
                inner.insert(
                    inst.base.clone(),
                    FuturesQuote { symbol: inst.display_symbol.clone(), bid, funding_rate },
                );
            }
            futures.insert(venue, inner);
        }

        (spot, futures)
    };

    tokio::select! {
        result = trader.run_forever(config.interval, poll) => {
            if let Err(e) = &result {
                error!(error = %e, "auto-trader loop exited with error");
            }
            result
        }
        _ = async {
            while let Some(result) = tasks.join_next().await {
                if let Err(e) = result {
                    error!(error = %e, "venue task panicked");
                }
            }
        } => Ok(())
    }
}
