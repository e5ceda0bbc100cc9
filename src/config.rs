//! Runtime configuration: CLI flags plus environment-derived credentials.
//!
//! Fee constants, chunk sizes, TTLs, tranche size and the per-leg cap are
//! not CLI-exposed — they live as `const`s colocated with the module that
//! owns them, matching the teacher's `const MIN_SPREAD_PERCENT: f64 = 0.3;`
//! style rather than a central settings struct.

use clap::Parser;

/// Comma-separated futures venues the driver may trade against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FuturesVenueFlag {
    Okx,
    Gate,
    Hyper,
}

impl std::str::FromStr for FuturesVenueFlag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "okx" => Ok(FuturesVenueFlag::Okx),
            "gate" => Ok(FuturesVenueFlag::Gate),
            "hyper" => Ok(FuturesVenueFlag::Hyper),
            other => Err(format!("unknown futures venue: {other}")),
        }
    }
}

/// Scanner/auto-trader driver flags.
///
/// Grounded on `ws_contango_engine.py`'s `argparse` surface; a one-to-one
/// flag mapping, reimplemented with `clap`'s derive API as the teacher's
/// other pack-adjacent repos do.
#[derive(Debug, Clone, Parser)]
#[command(name = "contango-scanner", about = "Cross-venue contango scanner")]
pub struct DriverConfig {
    /// Seconds between evaluation ticks.
    #[arg(long, default_value_t = 2.0)]
    pub interval: f64,

    /// Minimum raw spread percentage for a row to be emitted.
    #[arg(long = "min-pct", default_value_t = 0.3)]
    pub min_spread_pct: f64,

    /// Number of rows to display per tick.
    #[arg(long, default_value_t = 10)]
    pub top: usize,

    /// Run a single evaluation then exit.
    #[arg(long, default_value_t = false)]
    pub once: bool,

    /// Minimum net percentage required to open a tranche.
    #[arg(long = "entry-threshold", default_value_t = 1.0)]
    pub entry_threshold: f64,

    /// Net percentage at or below which an open tranche is unwound.
    #[arg(long = "exit-threshold", default_value_t = 0.3)]
    pub exit_threshold: f64,

    /// Place real orders instead of running in dry-run mode.
    #[arg(long, default_value_t = false)]
    pub live: bool,

    /// Comma-separated futures venues to include: okx, gate, hyper.
    #[arg(long, value_delimiter = ',', default_value = "okx,gate,hyper")]
    pub futures: Vec<FuturesVenueFlag>,

    #[arg(long = "no-upbit", default_value_t = false)]
    pub no_upbit: bool,

    #[arg(long = "no-bithumb", default_value_t = false)]
    pub no_bithumb: bool,
}

impl DriverConfig {
    /// Parse CLI args, loading a `.env` first so env-only settings
    /// (credentials) are available without being repeated on the command
    /// line, matching the teacher's `dotenv::dotenv().ok()` convention.
    pub fn load() -> Self {
        dotenv::dotenv().ok();
        DriverConfig::parse()
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.interval >= 0.1, "--interval must be >= 0.1");
        Ok(())
    }
}

/// Live-mode API credentials for one venue, read from
/// `<VENUE>_API_KEY` / `<VENUE>_API_SECRET` / `<VENUE>_API_PASSWORD`.
#[derive(Debug, Clone)]
pub struct VenueCredentials {
    pub api_key: String,
    pub api_secret: String,
    pub api_password: Option<String>,
}

impl VenueCredentials {
    /// Mirrors `contango_trade_executor.py::create_exchange_client`: key and
    /// secret are mandatory, password is optional, missing key/secret is a
    /// fatal precondition before any order is attempted.
    pub fn from_env(env_prefix: &str) -> anyhow::Result<Self> {
        let api_key = std::env::var(format!("{env_prefix}_API_KEY"))
            .map_err(|_| anyhow::anyhow!("{env_prefix}_API_KEY not set"))?;
        let api_secret = std::env::var(format!("{env_prefix}_API_SECRET"))
            .map_err(|_| anyhow::anyhow!("{env_prefix}_API_SECRET not set"))?;
        let api_password = std::env::var(format!("{env_prefix}_API_PASSWORD")).ok();

        Ok(Self {
            api_key,
            api_secret,
            api_password,
        })
    }
}
