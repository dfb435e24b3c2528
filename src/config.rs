//! Credentials, client and pipeline configuration

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};

use crate::error::ConfigError;

pub const API_KEY_VAR: &str = "BINANCE_API_KEY";
pub const API_SECRET_VAR: &str = "BINANCE_API_SECRET";

/// Default spot REST base URL
pub const DEFAULT_SPOT_BASE_URL: &str = "https://api.binance.com";

/// Default USDⓈ-M futures REST base URL
pub const DEFAULT_FUTURES_BASE_URL: &str = "https://fapi.binance.com";

/// API key/secret pair. Both values are required and non-empty.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    api_key: String,
    api_secret: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Result<Self, ConfigError> {
        let api_key = api_key.into().trim().to_string();
        let api_secret = api_secret.into().trim().to_string();

        if api_key.is_empty() {
            return Err(ConfigError::MissingCredential(API_KEY_VAR));
        }
        if api_secret.is_empty() {
            return Err(ConfigError::MissingCredential(API_SECRET_VAR));
        }

        Ok(Self { api_key, api_secret })
    }

    /// Read `BINANCE_API_KEY` / `BINANCE_API_SECRET` from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var(API_KEY_VAR).map_err(|_| ConfigError::MissingCredential(API_KEY_VAR))?;
        let api_secret =
            std::env::var(API_SECRET_VAR).map_err(|_| ConfigError::MissingCredential(API_SECRET_VAR))?;
        Self::new(api_key, api_secret)
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn api_secret(&self) -> &str {
        &self.api_secret
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

/// Connection settings for [`crate::binance::BinanceClient`]
#[derive(Debug, Clone)]
pub struct BinanceConfig {
    pub credentials: Credentials,

    /// Spot REST base URL
    pub spot_base_url: String,

    /// Futures REST base URL
    pub futures_base_url: String,

    /// Per-request HTTP timeout
    pub timeout: StdDuration,

    /// `recvWindow` sent with signed requests, in milliseconds
    pub recv_window: u64,
}

impl BinanceConfig {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            spot_base_url: DEFAULT_SPOT_BASE_URL.to_string(),
            futures_base_url: DEFAULT_FUTURES_BASE_URL.to_string(),
            timeout: StdDuration::from_secs(30),
            recv_window: 5000,
        }
    }

    /// Credentials from the environment, with optional base URL overrides
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::new(Credentials::from_env()?).with_env_overrides())
    }

    /// Apply `BINANCE_SPOT_BASE_URL` / `BINANCE_FUTURES_BASE_URL` if set
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("BINANCE_SPOT_BASE_URL") {
            self.spot_base_url = url;
        }
        if let Ok(url) = std::env::var("BINANCE_FUTURES_BASE_URL") {
            self.futures_base_url = url;
        }
        self
    }
}

/// Parameters for one run of the fetch-and-chart pipeline
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Symbol for all steps; `None` means every stable-quoted symbol for
    /// open interest and the default major pairs for liquidations
    pub symbol: Option<String>,

    /// Symbol used for the CVD steps when `symbol` is `None`
    pub cvd_symbol: String,

    pub oi_limit: u32,

    /// Open interest history period (e.g. "1d")
    pub oi_period: String,

    pub liquidation_lookback_days: i64,

    pub liquidation_limit: u32,

    /// Candle interval for CVD windows (e.g. "1h")
    pub interval: String,

    /// Number of candles (windows) per CVD series
    pub candle_limit: u32,

    /// Max trades fetched per window; reaching it marks the window truncated
    pub trade_limit: u32,

    pub output_dir: PathBuf,

    /// Also write CSV tables next to the charts
    pub export_csv: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            symbol: Some("BTCUSDT".to_string()),
            cvd_symbol: "BTCUSDT".to_string(),
            oi_limit: 30,
            oi_period: "1d".to_string(),
            liquidation_lookback_days: 7,
            liquidation_limit: 100,
            interval: "1h".to_string(),
            candle_limit: 24,
            trade_limit: 1000,
            output_dir: PathBuf::from("."),
            export_csv: false,
        }
    }
}

impl RunConfig {
    /// Symbol used for spot/futures CVD
    pub fn cvd_symbol(&self) -> &str {
        self.symbol.as_deref().unwrap_or(&self.cvd_symbol)
    }

    /// Start of the liquidation lookback ending at `now`
    pub fn liquidation_start(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, ConfigError> {
        Duration::try_days(self.liquidation_lookback_days)
            .filter(|lookback| *lookback >= Duration::zero())
            .and_then(|lookback| now.checked_sub_signed(lookback))
            .ok_or(ConfigError::InvalidLookback(self.liquidation_lookback_days))
    }
}

/// Contents of a `.env` file holding the credentials
pub fn render_env_file(credentials: &Credentials) -> String {
    format!(
        "{}={}\n{}={}\n",
        API_KEY_VAR,
        credentials.api_key(),
        API_SECRET_VAR,
        credentials.api_secret()
    )
}

/// Write (or overwrite) a `.env` file that `dotenvy` will pick up
pub fn write_env_file(path: &Path, credentials: &Credentials) -> Result<(), ConfigError> {
    let mut file = File::create(path)?;
    file.write_all(render_env_file(credentials).as_bytes())?;
    file.flush()?;
    Ok(())
}
