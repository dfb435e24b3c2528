use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::FetchError;
use crate::types::{Candle, LiquidationEvent, Market, OpenInterestSample, TimeWindow, TradeRecord};

/// Remote market data the pipeline depends on.
///
/// Each method is a single call for a single symbol; failure isolation and
/// aggregation live in [`crate::fetcher::DataFetcher`].
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Futures symbols currently trading against a stablecoin quote asset
    async fn stable_quoted_symbols(&self) -> Result<Vec<String>, FetchError>;

    async fn open_interest_history(
        &self,
        symbol: &str,
        period: &str,
        limit: u32,
    ) -> Result<Vec<OpenInterestSample>, FetchError>;

    async fn liquidation_orders(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<LiquidationEvent>, FetchError>;

    async fn candles(
        &self,
        symbol: &str,
        interval: &str,
        limit: u32,
        market: Market,
    ) -> Result<Vec<Candle>, FetchError>;

    /// Trades inside `window`, capped at `limit`. Not paginated.
    async fn trades_in_window(
        &self,
        symbol: &str,
        window: &TimeWindow,
        market: Market,
        limit: u32,
    ) -> Result<Vec<TradeRecord>, FetchError>;
}
