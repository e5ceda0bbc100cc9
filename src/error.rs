//! Crate-wide error taxonomy.
//!
//! Individual venue faults must never crash the process — only the binary
//! entrypoints (`bin/scanner`, `bin/autotrade`) turn a `ScannerError` into a
//! fatal exit; every other call site matches and degrades.

use crate::types::VenueId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScannerError {
    #[error("{venue}: USDT/KRW reference ticker missing or null")]
    MissingUsdKrw { venue: VenueId },

    #[error("{venue}: instrument catalog load failed: {source}")]
    CatalogLoad {
        venue: VenueId,
        #[source]
        source: anyhow::Error,
    },

    #[error("{venue}: credentials missing for live trading ({var} not set)")]
    MissingCredentials { venue: VenueId, var: &'static str },

    #[error("{venue}: order execution failed: {message}")]
    ExecutionFailed { venue: VenueId, message: String },

    #[error("no spot venue resolved a USD/KRW rate; cannot evaluate")]
    NoUsdReference,
}
