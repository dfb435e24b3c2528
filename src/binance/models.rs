//! Binance REST Data Models
//!
//! Response types for the spot and USDⓈ-M futures endpoints, plus the
//! conversions into the crate's record types.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use crate::error::FetchError;
use crate::types::{millis_to_utc, Candle, LiquidationEvent, LiquidationSide, OpenInterestSample};

/// Quote assets treated as stablecoins when discovering symbols
pub const STABLE_QUOTE_ASSETS: [&str; 4] = ["USDT", "USDC", "BUSD", "DAI"];

// ============================================================================
// Errors
// ============================================================================

/// Error body returned with non-2xx responses
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub code: i64,
    pub msg: String,
}

// ============================================================================
// Exchange info
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ExchangeInfo {
    pub symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SymbolInfo {
    pub symbol: String,
    #[serde(default)]
    pub quote_asset: String,
    #[serde(default)]
    pub status: String,
}

impl ExchangeInfo {
    /// Trading symbols quoted in one of [`STABLE_QUOTE_ASSETS`], in listing order
    pub fn stable_quoted_symbols(&self) -> Vec<String> {
        self.symbols
            .iter()
            .filter(|s| s.status == "TRADING")
            .filter(|s| STABLE_QUOTE_ASSETS.contains(&s.quote_asset.as_str()))
            .map(|s| s.symbol.clone())
            .collect()
    }
}

// ============================================================================
// Open interest
// ============================================================================

/// Row from `/futures/data/openInterestHist`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenInterestHistRow {
    #[serde(default)]
    pub symbol: String,
    pub sum_open_interest: Decimal,
    pub sum_open_interest_value: Decimal,
    pub timestamp: i64,
}

impl OpenInterestHistRow {
    /// The requested symbol wins over whatever the row carries
    pub fn into_sample(self, symbol: &str) -> Result<OpenInterestSample, FetchError> {
        Ok(OpenInterestSample {
            symbol: symbol.to_string(),
            timestamp: millis_to_utc(self.timestamp)?,
            sum_open_interest: self.sum_open_interest,
            sum_open_interest_value: self.sum_open_interest_value,
        })
    }
}

// ============================================================================
// Liquidations
// ============================================================================

/// Row from `/fapi/v1/forceOrders`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForceOrderRow {
    #[serde(default)]
    pub symbol: String,
    pub side: LiquidationSide,
    pub price: Decimal,
    pub orig_qty: Decimal,
    #[serde(default)]
    pub executed_qty: Decimal,
    #[serde(default, alias = "avgPrice")]
    pub average_price: Decimal,
    pub time: i64,
}

impl ForceOrderRow {
    pub fn into_event(self, symbol: &str) -> Result<LiquidationEvent, FetchError> {
        Ok(LiquidationEvent {
            symbol: symbol.to_string(),
            timestamp: millis_to_utc(self.time)?,
            side: self.side,
            price: self.price,
            orig_qty: self.orig_qty,
            executed_qty: self.executed_qty,
            average_price: self.average_price,
            value: self.price * self.orig_qty,
        })
    }
}

// ============================================================================
// Klines
// ============================================================================

// Kline rows are positional arrays:
// [openTime, open, high, low, close, volume, closeTime, quoteVolume, trades, ...]
const KLINE_MIN_LEN: usize = 9;

impl TryFrom<&[Value]> for Candle {
    type Error = FetchError;

    fn try_from(row: &[Value]) -> Result<Self, Self::Error> {
        if row.len() < KLINE_MIN_LEN {
            return Err(FetchError::Malformed(format!(
                "kline row has {} fields, expected at least {}",
                row.len(),
                KLINE_MIN_LEN
            )));
        }

        Ok(Candle {
            open_time: millis_to_utc(field_i64(row, 0)?)?,
            open: field_decimal(row, 1)?,
            high: field_decimal(row, 2)?,
            low: field_decimal(row, 3)?,
            close: field_decimal(row, 4)?,
            volume: field_decimal(row, 5)?,
            close_time: millis_to_utc(field_i64(row, 6)?)?,
            trade_count: field_i64(row, 8)?.max(0) as u64,
        })
    }
}

fn field_i64(row: &[Value], idx: usize) -> Result<i64, FetchError> {
    row[idx]
        .as_i64()
        .ok_or_else(|| FetchError::Malformed(format!("kline field {} is not an integer: {}", idx, row[idx])))
}

fn field_decimal(row: &[Value], idx: usize) -> Result<Decimal, FetchError> {
    let parsed = match &row[idx] {
        Value::String(s) => Decimal::from_str(s).ok(),
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        _ => None,
    };
    parsed.ok_or_else(|| FetchError::Malformed(format!("kline field {} is not a decimal: {}", idx, row[idx])))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_kline_row_to_candle() {
        let row: Vec<Value> = serde_json::from_str(
            r#"[1499040000000,"0.01634790","0.80000000","0.01575800","0.01577100","148976.11427815",
                1499644799999,"2434.19055334",308,"1756.87402397","28.46694368","0"]"#,
        )
        .unwrap();

        let candle = Candle::try_from(row.as_slice()).unwrap();
        assert_eq!(candle.open_time.timestamp_millis(), 1_499_040_000_000);
        assert_eq!(candle.close_time.timestamp_millis(), 1_499_644_799_999);
        assert_eq!(candle.high, dec!(0.8));
        assert_eq!(candle.trade_count, 308);
        assert!(candle.window().is_ok());
    }

    #[test]
    fn test_short_kline_row_is_malformed() {
        let row: Vec<Value> = serde_json::from_str(r#"[1499040000000,"1.0"]"#).unwrap();
        assert!(matches!(Candle::try_from(row.as_slice()), Err(FetchError::Malformed(_))));
    }

    #[test]
    fn test_open_interest_row() {
        let row: OpenInterestHistRow = serde_json::from_str(
            r#"{"symbol":"BTCUSDT","sumOpenInterest":"20403.63700000","sumOpenInterestValue":"150570784.07809979","timestamp":1583127900000}"#,
        )
        .unwrap();
        let sample = row.into_sample("BTCUSDT").unwrap();
        assert_eq!(sample.sum_open_interest, dec!(20403.637));
        assert_eq!(sample.timestamp.timestamp_millis(), 1_583_127_900_000);
    }

    #[test]
    fn test_force_order_value_and_price_alias() {
        let row: ForceOrderRow = serde_json::from_str(
            r#"{"symbol":"BTCUSDT","price":"7918.33","origQty":"0.014","executedQty":"0.014",
                "avgPrice":"7918.33","side":"SELL","time":1568014460893}"#,
        )
        .unwrap();
        let event = row.into_event("BTCUSDT").unwrap();
        assert_eq!(event.side, LiquidationSide::Sell);
        assert_eq!(event.average_price, dec!(7918.33));
        assert_eq!(event.value, dec!(7918.33) * dec!(0.014));
    }

    #[test]
    fn test_stable_symbol_filter() {
        let info: ExchangeInfo = serde_json::from_str(
            r#"{"symbols":[
                {"symbol":"BTCUSDT","quoteAsset":"USDT","status":"TRADING"},
                {"symbol":"ETHBTC","quoteAsset":"BTC","status":"TRADING"},
                {"symbol":"ETHUSDC","quoteAsset":"USDC","status":"TRADING"},
                {"symbol":"OLDBUSD","quoteAsset":"BUSD","status":"SETTLING"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(info.stable_quoted_symbols(), vec!["BTCUSDT", "ETHUSDC"]);
    }
}
