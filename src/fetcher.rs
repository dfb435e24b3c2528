//! Multi-symbol fetches with per-symbol failure isolation, and CVD series
//! built from candle windows.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::binance::MarketDataSource;
use crate::error::FetchError;
use crate::processing::{CvdAccumulator, WindowTrades};
use crate::types::{
    Candle, CumulativeSeries, LiquidationEvent, Market, OpenInterestSample, SymbolBatch, SymbolOutcome,
    TimeWindow, TradeRecord,
};

/// Pairs queried for liquidations when no symbol is given
pub const DEFAULT_LIQUIDATION_SYMBOLS: [&str; 7] = [
    "BTCUSDT", "ETHUSDT", "BNBUSDT", "XRPUSDT", "ADAUSDT", "SOLUSDT", "DOGEUSDT",
];

/// Default liquidation lookback when no start time is given
pub const DEFAULT_LIQUIDATION_LOOKBACK_DAYS: i64 = 7;

/// Open interest history bucket
pub const DEFAULT_OI_PERIOD: &str = "1d";

/// Per-window cap on aggregated trades
pub const DEFAULT_TRADE_LIMIT: u32 = 1000;

pub struct DataFetcher<S> {
    source: S,
    oi_period: String,
    trade_limit: u32,
}

impl<S: MarketDataSource> DataFetcher<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            oi_period: DEFAULT_OI_PERIOD.to_string(),
            trade_limit: DEFAULT_TRADE_LIMIT,
        }
    }

    pub fn with_oi_period(mut self, period: impl Into<String>) -> Self {
        self.oi_period = period.into();
        self
    }

    pub fn with_trade_limit(mut self, limit: u32) -> Self {
        self.trade_limit = limit;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Open interest history for one symbol, or for every stable-quoted
    /// futures symbol when `symbol` is `None`
    pub async fn fetch_open_interest(&self, symbol: Option<&str>, limit: u32) -> SymbolBatch<OpenInterestSample> {
        let symbols = match symbol {
            Some(s) => vec![s.to_string()],
            None => match self.source.stable_quoted_symbols().await {
                Ok(symbols) => symbols,
                Err(e) => {
                    warn!("Failed to list futures symbols: {}", e);
                    return SymbolBatch::new();
                }
            },
        };

        info!("Fetching open interest for {} symbol(s)", symbols.len());

        let mut batch = SymbolBatch::new();
        for sym in symbols {
            let result = self
                .source
                .open_interest_history(&sym, &self.oi_period, limit)
                .await;
            batch.push(into_outcome("open interest", sym, result));
        }
        batch
    }

    /// Liquidations between `start` and `end` (defaults: last 7 days), for one
    /// symbol or for [`DEFAULT_LIQUIDATION_SYMBOLS`]
    pub async fn fetch_liquidations(
        &self,
        symbol: Option<&str>,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        limit: u32,
    ) -> SymbolBatch<LiquidationEvent> {
        let now = Utc::now();
        let end = end.unwrap_or(now);
        let start = start.unwrap_or(now - Duration::days(DEFAULT_LIQUIDATION_LOOKBACK_DAYS));

        let symbols: Vec<String> = match symbol {
            Some(s) => vec![s.to_string()],
            None => DEFAULT_LIQUIDATION_SYMBOLS.iter().map(|s| s.to_string()).collect(),
        };

        info!(
            "Fetching liquidations for {} symbol(s) from {} to {}",
            symbols.len(),
            start,
            end
        );

        let mut batch = SymbolBatch::new();
        for sym in symbols {
            let result = self.source.liquidation_orders(&sym, start, end, limit).await;
            batch.push(into_outcome("liquidations", sym, result));
        }
        batch
    }

    pub async fn fetch_candles(
        &self,
        symbol: &str,
        interval: &str,
        limit: u32,
        market: Market,
    ) -> Result<Vec<Candle>, FetchError> {
        self.source.candles(symbol, interval, limit, market).await
    }

    pub async fn fetch_trades_in_window(
        &self,
        symbol: &str,
        window: &TimeWindow,
        market: Market,
        limit: u32,
    ) -> Result<Vec<TradeRecord>, FetchError> {
        self.source.trades_in_window(symbol, window, market, limit).await
    }

    pub async fn spot_cvd(&self, symbol: &str, interval: &str, candle_limit: u32) -> CumulativeSeries {
        self.cvd_series(symbol, interval, candle_limit, Market::Spot).await
    }

    pub async fn futures_cvd(&self, symbol: &str, interval: &str, candle_limit: u32) -> CumulativeSeries {
        self.cvd_series(symbol, interval, candle_limit, Market::Futures).await
    }

    /// One trade fetch per candle window, folded left to right.
    ///
    /// A failed candle fetch gives an empty series; a failed trade fetch
    /// gives a zero-delta window and the fold continues.
    pub async fn cvd_series(
        &self,
        symbol: &str,
        interval: &str,
        candle_limit: u32,
        market: Market,
    ) -> CumulativeSeries {
        let candles = match self.fetch_candles(symbol, interval, candle_limit, market).await {
            Ok(candles) => candles,
            Err(e) => {
                warn!("Failed to compute {} CVD for {}: {}", market, symbol, e);
                return CumulativeSeries::empty(symbol, interval, market);
            }
        };

        info!(
            "Computing {} CVD for {} over {} {} candles",
            market,
            symbol,
            candles.len(),
            interval
        );

        let mut acc = CvdAccumulator::new();
        for candle in &candles {
            let window = match candle.window() {
                Ok(window) => window,
                Err(e) => {
                    warn!("Skipping candle: {}", e);
                    continue;
                }
            };

            let result = self
                .fetch_trades_in_window(symbol, &window, market, self.trade_limit)
                .await;
            if let Err(e) = &result {
                warn!(
                    "Failed to fetch {} trades for {} window {}: {}",
                    market,
                    symbol,
                    window.start(),
                    e
                );
            }

            let trades = WindowTrades::from_fetch(result, self.trade_limit);
            if let Err(e) = acc.push_window(window, &trades) {
                warn!("Skipping window: {}", e);
            }
        }

        let series = acc.finish(symbol, interval, market);
        debug!(
            "{} CVD for {}: {} windows, final {}",
            market,
            symbol,
            series.len(),
            series.final_delta()
        );
        series
    }
}

fn into_outcome<T>(what: &str, symbol: String, result: Result<Vec<T>, FetchError>) -> SymbolOutcome<T> {
    match result {
        Ok(records) => {
            debug!("Fetched {} {} records for {}", records.len(), what, symbol);
            SymbolOutcome::Fetched { symbol, records }
        }
        Err(e) => {
            warn!("Failed to fetch {} for {}: {}", what, symbol, e);
            SymbolOutcome::Failed {
                symbol,
                reason: e.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LiquidationSide, WindowStatus};
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;
    use std::sync::Mutex;

    const HOUR_MS: i64 = 3_600_000;

    /// In-memory source keyed by symbol / window start
    #[derive(Default)]
    struct MockSource {
        symbols: Vec<String>,
        failing_symbols: Vec<String>,
        candles: Vec<Candle>,
        trades: HashMap<i64, Result<Vec<TradeRecord>, String>>,
        calls: Mutex<Vec<String>>,
    }

    impl MockSource {
        fn check(&self, symbol: &str) -> Result<(), FetchError> {
            self.calls.lock().unwrap().push(symbol.to_string());
            if self.failing_symbols.iter().any(|s| s == symbol) {
                return Err(FetchError::Api {
                    code: -1121,
                    message: "Invalid symbol.".to_string(),
                });
            }
            Ok(())
        }
    }

    fn candle(hour: i64) -> Candle {
        Candle {
            open_time: DateTime::from_timestamp_millis(hour * HOUR_MS).unwrap(),
            close_time: DateTime::from_timestamp_millis((hour + 1) * HOUR_MS - 1).unwrap(),
            open: Decimal::ONE,
            high: Decimal::ONE,
            low: Decimal::ONE,
            close: Decimal::ONE,
            volume: Decimal::ZERO,
            trade_count: 0,
        }
    }

    #[async_trait]
    impl MarketDataSource for MockSource {
        async fn stable_quoted_symbols(&self) -> Result<Vec<String>, FetchError> {
            Ok(self.symbols.clone())
        }

        async fn open_interest_history(
            &self,
            symbol: &str,
            _period: &str,
            _limit: u32,
        ) -> Result<Vec<OpenInterestSample>, FetchError> {
            self.check(symbol)?;
            Ok(vec![OpenInterestSample {
                symbol: symbol.to_string(),
                timestamp: Utc::now(),
                sum_open_interest: dec!(100),
                sum_open_interest_value: dec!(5000000),
            }])
        }

        async fn liquidation_orders(
            &self,
            symbol: &str,
            start: DateTime<Utc>,
            _end: DateTime<Utc>,
            _limit: u32,
        ) -> Result<Vec<LiquidationEvent>, FetchError> {
            self.check(symbol)?;
            Ok(vec![LiquidationEvent {
                symbol: symbol.to_string(),
                timestamp: start,
                side: LiquidationSide::Sell,
                price: dec!(100),
                orig_qty: dec!(2),
                executed_qty: dec!(2),
                average_price: dec!(100),
                value: dec!(200),
            }])
        }

        async fn candles(
            &self,
            symbol: &str,
            _interval: &str,
            _limit: u32,
            _market: Market,
        ) -> Result<Vec<Candle>, FetchError> {
            self.check(symbol)?;
            Ok(self.candles.clone())
        }

        async fn trades_in_window(
            &self,
            _symbol: &str,
            window: &TimeWindow,
            _market: Market,
            _limit: u32,
        ) -> Result<Vec<TradeRecord>, FetchError> {
            match self.trades.get(&window.start_ms()) {
                Some(Ok(trades)) => Ok(trades.clone()),
                Some(Err(msg)) => Err(FetchError::Malformed(msg.clone())),
                None => Ok(Vec::new()),
            }
        }
    }

    #[tokio::test]
    async fn test_open_interest_isolates_failing_symbol() {
        let source = MockSource {
            symbols: vec!["AAAUSDT".into(), "BBBUSDT".into(), "CCCUSDT".into()],
            failing_symbols: vec!["BBBUSDT".into()],
            ..Default::default()
        };
        let fetcher = DataFetcher::new(source);

        let batch = fetcher.fetch_open_interest(None, 30).await;

        let symbols: Vec<&str> = batch.records().map(|s| s.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["AAAUSDT", "CCCUSDT"]);
        assert_eq!(batch.outcomes().len(), 3);
        assert!(batch.outcomes()[1].is_failed());
        assert_eq!(batch.failures().count(), 1);
        assert_eq!(
            *fetcher.source().calls.lock().unwrap(),
            vec!["AAAUSDT", "BBBUSDT", "CCCUSDT"]
        );
    }

    #[tokio::test]
    async fn test_liquidations_default_symbols_and_window() {
        let fetcher = DataFetcher::new(MockSource::default());
        let before = Utc::now();

        let batch = fetcher.fetch_liquidations(None, None, None, 1000).await;

        assert_eq!(batch.outcomes().len(), DEFAULT_LIQUIDATION_SYMBOLS.len());
        let records = batch.into_records();
        assert_eq!(records[0].symbol, "BTCUSDT");
        assert_eq!(records[6].symbol, "DOGEUSDT");

        // Mock stamps each event with the requested start time
        let lookback = before - records[0].timestamp;
        assert!(lookback >= Duration::days(7) - Duration::seconds(5));
        assert!(lookback <= Duration::days(7) + Duration::seconds(5));
    }

    #[tokio::test]
    async fn test_single_symbol_failure_yields_empty_batch() {
        let source = MockSource {
            failing_symbols: vec!["BADUSDT".into()],
            ..Default::default()
        };
        let fetcher = DataFetcher::new(source);

        let batch = fetcher.fetch_liquidations(Some("BADUSDT"), None, None, 10).await;
        assert!(batch.is_empty());
        assert_eq!(batch.failures().next().map(|(s, _)| s), Some("BADUSDT"));
    }

    #[tokio::test]
    async fn test_cvd_series_over_candles() {
        let mut trades = HashMap::new();
        trades.insert(
            0,
            Ok(vec![
                TradeRecord::new(dec!(2), false),
                TradeRecord::new(dec!(2), false),
                TradeRecord::new(dec!(2), false),
                TradeRecord::new(dec!(1), true),
            ]),
        );
        trades.insert(HOUR_MS, Err("connection reset".to_string()));
        trades.insert(2 * HOUR_MS, Ok(vec![TradeRecord::new(dec!(3), true)]));

        let source = MockSource {
            candles: vec![candle(0), candle(1), candle(2), candle(3)],
            trades,
            ..Default::default()
        };
        let fetcher = DataFetcher::new(source);

        let series = fetcher.spot_cvd("BTCUSDT", "1h", 4).await;
        let summary: Vec<(Decimal, Decimal, WindowStatus)> = series
            .points()
            .iter()
            .map(|p| (p.interval_delta, p.cumulative_delta, p.status))
            .collect();

        assert_eq!(
            summary,
            vec![
                (dec!(5), dec!(5), WindowStatus::Complete),
                (dec!(0), dec!(5), WindowStatus::Unavailable),
                (dec!(-3), dec!(2), WindowStatus::Complete),
                (dec!(0), dec!(2), WindowStatus::Complete),
            ]
        );
        assert_eq!(series.market(), Market::Spot);
    }

    #[tokio::test]
    async fn test_cvd_truncation_flag() {
        let mut trades = HashMap::new();
        trades.insert(0, Ok(vec![TradeRecord::new(dec!(1), false); 2]));

        let source = MockSource {
            candles: vec![candle(0)],
            trades,
            ..Default::default()
        };
        let fetcher = DataFetcher::new(source).with_trade_limit(2);

        let series = fetcher.futures_cvd("BTCUSDT", "1h", 1).await;
        assert_eq!(series.points()[0].status, WindowStatus::Truncated);
        assert_eq!(series.truncated_windows(), 1);
    }

    #[tokio::test]
    async fn test_cvd_candle_failure_gives_empty_series() {
        let source = MockSource {
            failing_symbols: vec!["BTCUSDT".into()],
            candles: vec![candle(0)],
            ..Default::default()
        };
        let fetcher = DataFetcher::new(source);

        let series = fetcher.spot_cvd("BTCUSDT", "1h", 24).await;
        assert!(series.is_empty());
        assert_eq!(series.symbol(), "BTCUSDT");
    }
}
