use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::FetchError;

/// A trade without an explicit maker flag is counted as buyer-initiated.
pub const DEFAULT_IS_MAKER_SIDE: bool = false;

fn default_is_maker_side() -> bool {
    DEFAULT_IS_MAKER_SIDE
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Market {
    Spot,
    Futures,
}

impl Market {
    /// Lowercase label used in artifact file names
    pub fn label(&self) -> &'static str {
        match self {
            Self::Spot => "spot",
            Self::Futures => "futures",
        }
    }
}

impl std::fmt::Display for Market {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Spot => write!(f, "Spot"),
            Self::Futures => write!(f, "Futures"),
        }
    }
}

/// Half-open aggregation interval, always `start < end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, FetchError> {
        if start >= end {
            return Err(FetchError::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn from_millis(start_ms: i64, end_ms: i64) -> Result<Self, FetchError> {
        Self::new(millis_to_utc(start_ms)?, millis_to_utc(end_ms)?)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn start_ms(&self) -> i64 {
        self.start.timestamp_millis()
    }

    pub fn end_ms(&self) -> i64 {
        self.end.timestamp_millis()
    }
}

/// OHLCV candle; only the open/close times matter for CVD windows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candle {
    pub open_time: DateTime<Utc>,
    pub close_time: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    pub trade_count: u64,
}

impl Candle {
    pub fn window(&self) -> Result<TimeWindow, FetchError> {
        TimeWindow::new(self.open_time, self.close_time)
    }
}

/// Aggregated trade as returned by the aggTrades endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    #[serde(rename = "q", alias = "qty", default, deserialize_with = "null_as_default")]
    pub quantity: Decimal,
    /// `true` when the buyer was the maker, i.e. the seller was the aggressor
    #[serde(
        rename = "m",
        alias = "isBuyerMaker",
        default = "default_is_maker_side",
        deserialize_with = "maker_side_or_default"
    )]
    pub is_maker_side: bool,
    #[serde(rename = "T", alias = "time", default, deserialize_with = "null_as_default")]
    pub timestamp_ms: i64,
}

/// `null` reads as the type's default
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// `null` reads as [`DEFAULT_IS_MAKER_SIDE`]
fn maker_side_or_default<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(DEFAULT_IS_MAKER_SIDE))
}

impl TradeRecord {
    pub fn new(quantity: Decimal, is_maker_side: bool) -> Self {
        Self {
            quantity,
            is_maker_side,
            timestamp_ms: 0,
        }
    }

    pub fn is_buyer_initiated(&self) -> bool {
        !self.is_maker_side
    }
}

/// How the trades behind a CVD point were obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WindowStatus {
    Complete,
    /// The fetch returned exactly the per-call limit, so volume may be missing
    Truncated,
    /// The fetch failed; the window contributes zero
    Unavailable,
}

impl std::fmt::Display for WindowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Complete => write!(f, "complete"),
            Self::Truncated => write!(f, "truncated"),
            Self::Unavailable => write!(f, "unavailable"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CvdPoint {
    pub window: TimeWindow,
    pub interval_delta: Decimal,
    pub cumulative_delta: Decimal,
    pub trade_count: usize,
    pub status: WindowStatus,
}

/// Interval and running volume delta for one symbol/market, built once by
/// [`crate::processing::CvdAccumulator`].
#[derive(Debug, Clone, PartialEq)]
pub struct CumulativeSeries {
    symbol: String,
    interval: String,
    market: Market,
    points: Vec<CvdPoint>,
}

impl CumulativeSeries {
    pub(crate) fn new(symbol: String, interval: String, market: Market, points: Vec<CvdPoint>) -> Self {
        Self {
            symbol,
            interval,
            market,
            points,
        }
    }

    pub fn empty(symbol: &str, interval: &str, market: Market) -> Self {
        Self::new(symbol.to_string(), interval.to_string(), market, Vec::new())
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn interval(&self) -> &str {
        &self.interval
    }

    pub fn market(&self) -> Market {
        self.market
    }

    pub fn points(&self) -> &[CvdPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn final_delta(&self) -> Decimal {
        self.points
            .last()
            .map(|p| p.cumulative_delta)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn truncated_windows(&self) -> usize {
        self.points
            .iter()
            .filter(|p| p.status == WindowStatus::Truncated)
            .count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonPoint {
    pub timestamp: DateTime<Utc>,
    pub spot_value: Decimal,
    pub futures_value: Decimal,
    /// futures minus spot
    pub difference: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpenInterestSample {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub sum_open_interest: Decimal,
    pub sum_open_interest_value: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LiquidationSide {
    Buy,
    Sell,
}

impl std::fmt::Display for LiquidationSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiquidationEvent {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub side: LiquidationSide,
    pub price: Decimal,
    pub orig_qty: Decimal,
    pub executed_qty: Decimal,
    pub average_price: Decimal,
    /// price * orig_qty
    pub value: Decimal,
}

/// Liquidation value summed per calendar day and side
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyLiquidationTotal {
    pub date: NaiveDate,
    pub side: LiquidationSide,
    pub value: Decimal,
}

/// Result of fetching one symbol inside a multi-symbol batch
#[derive(Debug, Clone)]
pub enum SymbolOutcome<T> {
    Fetched { symbol: String, records: Vec<T> },
    Failed { symbol: String, reason: String },
}

impl<T> SymbolOutcome<T> {
    pub fn symbol(&self) -> &str {
        match self {
            Self::Fetched { symbol, .. } | Self::Failed { symbol, .. } => symbol,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Per-symbol outcomes in the order the symbols were iterated
#[derive(Debug, Clone)]
pub struct SymbolBatch<T> {
    outcomes: Vec<SymbolOutcome<T>>,
}

impl<T> Default for SymbolBatch<T> {
    fn default() -> Self {
        Self {
            outcomes: Vec::new(),
        }
    }
}

impl<T> SymbolBatch<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, outcome: SymbolOutcome<T>) {
        self.outcomes.push(outcome);
    }

    pub fn outcomes(&self) -> &[SymbolOutcome<T>] {
        &self.outcomes
    }

    /// All fetched records, concatenated in symbol order
    pub fn records(&self) -> impl Iterator<Item = &T> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                SymbolOutcome::Fetched { records, .. } => Some(records.iter()),
                SymbolOutcome::Failed { .. } => None,
            })
            .flatten()
    }

    pub fn into_records(self) -> Vec<T> {
        self.outcomes
            .into_iter()
            .filter_map(|o| match o {
                SymbolOutcome::Fetched { records, .. } => Some(records),
                SymbolOutcome::Failed { .. } => None,
            })
            .flatten()
            .collect()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.outcomes.iter().filter_map(|o| match o {
            SymbolOutcome::Failed { symbol, reason } => Some((symbol.as_str(), reason.as_str())),
            SymbolOutcome::Fetched { .. } => None,
        })
    }

    pub fn record_count(&self) -> usize {
        self.records().count()
    }

    pub fn is_empty(&self) -> bool {
        self.record_count() == 0
    }
}

pub(crate) fn millis_to_utc(ms: i64) -> Result<DateTime<Utc>, FetchError> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| FetchError::Malformed(format!("timestamp out of range: {}", ms)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_window_rejects_inverted_bounds() {
        assert!(TimeWindow::from_millis(1_000, 1_000).is_err());
        assert!(TimeWindow::from_millis(2_000, 1_000).is_err());

        let window = TimeWindow::from_millis(1_000, 2_000).unwrap();
        assert_eq!(window.start_ms(), 1_000);
        assert_eq!(window.end_ms(), 2_000);
    }

    #[test]
    fn test_trade_record_wire_keys() {
        let trade: TradeRecord =
            serde_json::from_str(r#"{"a":1,"p":"100.0","q":"0.5","T":1700000000000,"m":true}"#).unwrap();
        assert_eq!(trade.quantity, dec!(0.5));
        assert!(trade.is_maker_side);
        assert_eq!(trade.timestamp_ms, 1_700_000_000_000);

        let alt: TradeRecord = serde_json::from_str(r#"{"qty":"2","isBuyerMaker":true}"#).unwrap();
        assert_eq!(alt.quantity, dec!(2));
        assert!(alt.is_maker_side);
    }

    #[test]
    fn test_trade_record_missing_flag_defaults_to_buyer() {
        let trade: TradeRecord = serde_json::from_str(r#"{"q":"10"}"#).unwrap();
        assert_eq!(trade.is_maker_side, DEFAULT_IS_MAKER_SIDE);
        assert!(trade.is_buyer_initiated());

        let empty: TradeRecord = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.quantity, Decimal::ZERO);
    }

    #[test]
    fn test_null_fields_do_not_reject_batch() {
        let trades: Vec<TradeRecord> =
            serde_json::from_str(r#"[{"q":"10","m":null},{"q":"4","m":true},{"q":null,"m":false,"T":null}]"#)
                .unwrap();
        assert_eq!(trades.len(), 3);

        assert!(!trades[0].is_maker_side);
        assert_eq!(trades[0].quantity, dec!(10));
        assert!(trades[1].is_maker_side);
        assert_eq!(trades[2].quantity, Decimal::ZERO);
        assert_eq!(trades[2].timestamp_ms, 0);

        assert_eq!(crate::processing::interval_delta(&trades), dec!(6));
    }

    #[test]
    fn test_symbol_batch_skips_failures() {
        let mut batch = SymbolBatch::new();
        batch.push(SymbolOutcome::Fetched {
            symbol: "A".to_string(),
            records: vec![1, 2],
        });
        batch.push(SymbolOutcome::Failed {
            symbol: "B".to_string(),
            reason: "boom".to_string(),
        });
        batch.push(SymbolOutcome::Fetched {
            symbol: "C".to_string(),
            records: vec![3],
        });

        assert_eq!(batch.records().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(batch.failures().collect::<Vec<_>>(), vec![("B", "boom")]);
        assert_eq!(batch.into_records(), vec![1, 2, 3]);
    }

    #[test]
    fn test_liquidation_side_wire_format() {
        let side: LiquidationSide = serde_json::from_str(r#""SELL""#).unwrap();
        assert_eq!(side, LiquidationSide::Sell);
        assert_eq!(LiquidationSide::Buy.to_string(), "BUY");
    }
}
