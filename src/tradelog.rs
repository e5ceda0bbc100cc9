//! Append-only JSONL trade-event log: one line per `entry`/`exit` event.
//!
//! Grounded 1:1 on `tax::json_logger::TaxJsonLogger` — open-append-writeln
//! pattern, `read_all` for verification, tests built on `env::temp_dir()` +
//! `remove_dir_all`. Default path matches
//! `original_source/contango_auto_trader.py::LOG_FILE`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

pub const DEFAULT_LOG_FILE: &str = "trade_cycles.jsonl";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeEventKind {
    Entry,
    Exit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub futures_order_id: String,
    pub spot_order_id: String,
}

/// One self-contained JSONL record; no schema versioning is required.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeEvent {
    pub event: TradeEventKind,
    pub timestamp: u64,
    pub base: String,
    pub spot_exchange: String,
    pub futures_exchange: String,
    pub usd: f64,
    pub spread_pct: f64,
    pub net_pct: f64,
    pub funding_rate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pnl_usd: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portions: Option<Vec<f64>>,
    pub execution: ExecutionRecord,
}

pub struct TradeLogger {
    path: PathBuf,
}

impl TradeLogger {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create trade log directory: {parent:?}"))?;
            }
        }
        Ok(Self { path })
    }

    pub fn log(&self, event: &TradeEvent) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open trade log: {:?}", self.path))?;

        let json = serde_json::to_string(event).context("failed to serialize trade event")?;
        writeln!(file, "{json}")?;
        Ok(())
    }

    pub fn record_count(&self) -> Result<usize> {
        if !self.path.exists() {
            return Ok(0);
        }
        let file = File::open(&self.path)?;
        Ok(BufReader::new(file).lines().count())
    }

    pub fn read_all(&self) -> Result<Vec<TradeEvent>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);

        let mut events = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if !line.trim().is_empty() {
                events.push(
                    serde_json::from_str(&line)
                        .with_context(|| format!("failed to parse trade log line: {line}"))?,
                );
            }
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;

    fn sample_event(usd: f64) -> TradeEvent {
        TradeEvent {
            event: TradeEventKind::Entry,
            timestamp: 1_700_000_000,
            base: "BTC".to_string(),
            spot_exchange: "upbit".to_string(),
            futures_exchange: "gateio".to_string(),
            usd,
            spread_pct: 1.2,
            net_pct: 1.03,
            funding_rate: 0.0001,
            pnl_usd: None,
            portions: None,
            execution: ExecutionRecord {
                futures_order_id: "DRY_RUN".to_string(),
                spot_order_id: "DRY_RUN".to_string(),
            },
        }
    }

    #[test]
    fn log_then_read_all_roundtrips() {
        let dir = env::temp_dir().join("contango_tradelog_test_rw");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        let logger = TradeLogger::new(dir.join(DEFAULT_LOG_FILE)).unwrap();

        logger.log(&sample_event(50.0)).unwrap();
        logger.log(&sample_event(50.0)).unwrap();

        assert_eq!(logger.record_count().unwrap(), 2);
        let events = logger.read_all().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].base, "BTC");

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = env::temp_dir().join("contango_tradelog_test_missing");
        let _ = fs::remove_dir_all(&dir);
        let logger = TradeLogger::new(dir.join(DEFAULT_LOG_FILE)).unwrap();
        assert_eq!(logger.record_count().unwrap(), 0);
        assert!(logger.read_all().unwrap().is_empty());
        let _ = fs::remove_dir_all(&dir);
    }
}
