//! Binance API Integration
//!
//! Market data access for spot and USDⓈ-M futures.
//!
//! # Components
//!
//! - [`source`] - the [`MarketDataSource`] trait the pipeline is written against
//! - [`client`] - reqwest-backed implementation with request signing
//! - [`models`] - response types and conversions
//!
//! # Usage
//!
//! ```rust,ignore
//! use orderflow_metrics::binance::{BinanceClient, MarketDataSource};
//! use orderflow_metrics::config::BinanceConfig;
//! use orderflow_metrics::types::Market;
//!
//! let client = BinanceClient::new(BinanceConfig::from_env()?)?;
//! let candles = client.candles("BTCUSDT", "1h", 24, Market::Spot).await?;
//! ```

pub mod client;
pub mod models;
pub mod source;

pub use client::{sign_query, BinanceClient};
pub use models::STABLE_QUOTE_ASSETS;
pub use source::MarketDataSource;

use crate::types::Market;

/// REST endpoint paths
pub mod endpoints {
    pub const FUTURES_EXCHANGE_INFO: &str = "/fapi/v1/exchangeInfo";
    pub const OPEN_INTEREST_HIST: &str = "/futures/data/openInterestHist";
    pub const FORCE_ORDERS: &str = "/fapi/v1/forceOrders";
    /// Largest `limit` the force orders endpoint accepts
    pub const MAX_FORCE_ORDERS_LIMIT: u32 = 100;

    pub const SPOT_KLINES: &str = "/api/v3/klines";
    pub const FUTURES_KLINES: &str = "/fapi/v1/klines";

    pub const SPOT_AGG_TRADES: &str = "/api/v3/aggTrades";
    pub const FUTURES_AGG_TRADES: &str = "/fapi/v1/aggTrades";

    use super::Market;

    pub fn klines(market: Market) -> &'static str {
        match market {
            Market::Spot => SPOT_KLINES,
            Market::Futures => FUTURES_KLINES,
        }
    }

    pub fn agg_trades(market: Market) -> &'static str {
        match market {
            Market::Spot => SPOT_AGG_TRADES,
            Market::Futures => FUTURES_AGG_TRADES,
        }
    }
}
