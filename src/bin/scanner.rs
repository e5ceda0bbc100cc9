//! Main binary: wires venue stream clients, the quote cache, and the
//! contango evaluator into a periodic scan loop and prints ranked rows.
//!
//! Grounded on `bin::data_collector`'s entrypoint style (tracing init,
//! banner `info!` lines, config load, delegate to a library run loop) and
//! `original_source/ws_contango_engine.py::main`'s flag surface.

use anyhow::Result;
use contango_scanner::cache::QuoteCache;
use contango_scanner::catalog;
use contango_scanner::config::{DriverConfig, FuturesVenueFlag};
use contango_scanner::evaluator::{ContangoEvaluator, FuturesQuote};
use contango_scanner::project::spot_usd_map;
use contango_scanner::rate::UsdRateCache;
use contango_scanner::types::{CanonicalBase, Instrument, VenueId};
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
    info!("   Cross-Venue Contango Scanner");
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
        match catalog::load_korean_spot_catalog(&http, venue, base_url).await {
            Ok(instruments) if !instruments.is_empty() => {
                info!(%venue, count = instruments.len(), "catalog loaded");
                catalogs.insert(venue, instruments);
            }
            Ok(_) => warn!(%venue, "catalog returned zero instruments, excluding venue"),
            Err(e) => error!(%venue, error = %e, "catalog load failed, excluding venue for this run"),
        }
    }

    for &venue in &futures_venues {
        let result = match venue {
            VenueId::GateIo => catalog::load_gate_catalog(&http).await,
            VenueId::Okx => catalog::load_okx_catalog(&http).await,
            VenueId::Hyperliquid => catalog::load_hyperliquid_catalog(&http).await,
            _ => unreachable!(),
        };
        match result {
            Ok(instruments) if !instruments.is_empty() => {
                info!(%venue, count = instruments.len(), "catalog loaded");
                catalogs.insert(venue, instruments);
            }
            Ok(_) => warn!(%venue, "catalog returned zero instruments, excluding venue"),
            Err(e) => error!(%venue, error = %e, "catalog load failed, excluding venue for this run"),
        }
    }

    let active_venues: Vec<VenueId> = catalogs.keys().copied().collect();
    if active_venues.is_empty() {
        anyhow::bail!("no venue catalog loaded successfully; nothing to scan");
    }

    let cache = QuoteCache::new(&active_venues);
    let mut tasks = JoinSet::new();

    for &venue in &active_venues {
        let Some(instruments) = catalogs.get(&venue).cloned() else {
            continue;
        };
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

    run_scan_loop(&config, &cache, &catalogs).await?;

    // The stream tasks run forever; in `--once` mode we exit after one scan
    // without awaiting them, matching the CLI's "single evaluation then
    // exit" contract.
    if !config.once {
        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                error!(error = %e, "venue task panicked");
            }
        }
    }

    Ok(())
}

async fn run_scan_loop(
    config: &DriverConfig,
    cache: &QuoteCache,
    catalogs: &HashMap<VenueId, Vec<Instrument>>,
) -> Result<()> {
    let mut rate_cache = UsdRateCache::new();
    let evaluator = ContangoEvaluator::new(config.min_spread_pct, false);
    let mut ticker = tokio::time::interval(std::time::Duration::from_secs_f64(config.interval));

    loop {
        ticker.tick().await;

        let mut spot: HashMap<VenueId, HashMap<CanonicalBase, f64>> = HashMap::new();
        for (&venue, instruments) in catalogs {
            if venue.market_kind() != contango_scanner::types::MarketKind::Spot {
                continue;
            }
            let quotes = cache.snapshot(venue);
            let rate = match rate_cache.get_rate(venue, &quotes) {
                Ok(rate) => rate,
                Err(e) => {
                    warn!(%venue, error = %e, "skipping venue this tick");
                    continue;
                }
            };
            spot.insert(venue, spot_usd_map(&quotes, instruments, rate));
        }

        if spot.is_empty() {
            error!("no spot venue resolved a USD/KRW rate this tick; cannot evaluate");
            return Err(contango_scanner::ScannerError::NoUsdReference.into());
        }

        let mut futures: HashMap<VenueId, HashMap<CanonicalBase, FuturesQuote>> = HashMap::new();
        for (&venue, instruments) in catalogs {
            if venue.market_kind() != contango_scanner::types::MarketKind::Swap {
                continue;
            }
            let quotes = cache.snapshot(venue);
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

        let rows = evaluator.evaluate(&spot, &futures);
        print_rows(&rows, config.top);

        if config.once {
            return Ok(());
        }
    }
}

fn print_rows(rows: &[contango_scanner::types::OpportunityRow], top: usize) {
    info!(count = rows.len(), "evaluation tick complete");
    for row in rows.iter().take(top) {
        println!(
            "{:<10} {:>9} -> {:<10} spot=${:<12.2} fut=${:<12.2} pct={:>6.3}% net={:>6.3}% funding={:>8.5}",
            row.base,
            row.spot_venue,
            row.futures_venue,
            row.spot_price_usd,
            row.futures_price_usd,
            row.pct,
            row.net_pct,
            row.funding_rate * 100.0,
        );
    }
}
