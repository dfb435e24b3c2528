//! CSV tables written next to the charts when `--csv` is given

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

use crate::error::ExportError;
use crate::types::{
    ComparisonPoint, CumulativeSeries, LiquidationEvent, LiquidationSide, Market, OpenInterestSample,
};

pub const OPEN_INTEREST_CSV: &str = "open_interest.csv";
pub const LIQUIDATIONS_CSV: &str = "liquidations.csv";
pub const CVD_COMPARISON_CSV: &str = "cvd_comparison.csv";

pub fn cvd_csv(market: Market) -> String {
    format!("{}_cvd.csv", market.label())
}

#[derive(Debug, Serialize)]
struct OpenInterestRow<'a> {
    symbol: &'a str,
    timestamp: DateTime<Utc>,
    sum_open_interest: Decimal,
    sum_open_interest_value: Decimal,
}

#[derive(Debug, Serialize)]
struct LiquidationRow<'a> {
    symbol: &'a str,
    timestamp: DateTime<Utc>,
    side: LiquidationSide,
    price: Decimal,
    orig_qty: Decimal,
    executed_qty: Decimal,
    average_price: Decimal,
    value: Decimal,
}

#[derive(Debug, Serialize)]
struct CvdRow {
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    interval_delta: Decimal,
    cumulative_delta: Decimal,
    trade_count: usize,
    status: String,
}

#[derive(Debug, Serialize)]
struct ComparisonRow {
    timestamp: DateTime<Utc>,
    spot: Decimal,
    futures: Decimal,
    difference: Decimal,
}

pub struct CsvExporter {
    output_dir: PathBuf,
}

impl CsvExporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write `rows` under `file_name`. Returns `None` without touching the
    /// filesystem when there are no rows.
    fn write_rows<R, I>(&self, file_name: &str, rows: I) -> Result<Option<PathBuf>, ExportError>
    where
        R: Serialize,
        I: IntoIterator<Item = R>,
    {
        let mut rows = rows.into_iter().peekable();
        if rows.peek().is_none() {
            info!("No rows for {}, skipping", file_name);
            return Ok(None);
        }

        std::fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(file_name);
        let mut writer = csv::Writer::from_path(&path)?;
        let mut count = 0usize;
        for row in rows {
            writer.serialize(row)?;
            count += 1;
        }
        writer.flush()?;

        info!("Wrote {} rows to {}", count, path.display());
        Ok(Some(path))
    }

    pub fn write_open_interest(&self, samples: &[OpenInterestSample]) -> Result<Option<PathBuf>, ExportError> {
        self.write_rows(
            OPEN_INTEREST_CSV,
            samples.iter().map(|s| OpenInterestRow {
                symbol: &s.symbol,
                timestamp: s.timestamp,
                sum_open_interest: s.sum_open_interest,
                sum_open_interest_value: s.sum_open_interest_value,
            }),
        )
    }

    pub fn write_liquidations(&self, events: &[LiquidationEvent]) -> Result<Option<PathBuf>, ExportError> {
        self.write_rows(
            LIQUIDATIONS_CSV,
            events.iter().map(|e| LiquidationRow {
                symbol: &e.symbol,
                timestamp: e.timestamp,
                side: e.side,
                price: e.price,
                orig_qty: e.orig_qty,
                executed_qty: e.executed_qty,
                average_price: e.average_price,
                value: e.value,
            }),
        )
    }

    pub fn write_cvd(&self, series: &CumulativeSeries) -> Result<Option<PathBuf>, ExportError> {
        self.write_rows(
            &cvd_csv(series.market()),
            series.points().iter().map(|p| CvdRow {
                window_start: p.window.start(),
                window_end: p.window.end(),
                interval_delta: p.interval_delta,
                cumulative_delta: p.cumulative_delta,
                trade_count: p.trade_count,
                status: p.status.to_string(),
            }),
        )
    }

    pub fn write_comparison(&self, points: &[ComparisonPoint]) -> Result<Option<PathBuf>, ExportError> {
        self.write_rows(
            CVD_COMPARISON_CSV,
            points.iter().map(|p| ComparisonRow {
                timestamp: p.timestamp,
                spot: p.spot_value,
                futures: p.futures_value,
                difference: p.difference,
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::{build_cumulative_series, WindowTrades};
    use crate::types::{TimeWindow, TradeRecord};
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn test_cvd_csv_columns() {
        let dir = tempfile::tempdir().unwrap();
        let windows = vec![
            (
                TimeWindow::from_millis(0, 3_599_999).unwrap(),
                WindowTrades::complete(vec![TradeRecord::new(dec!(5), false)]),
            ),
            (TimeWindow::from_millis(3_600_000, 7_199_999).unwrap(), WindowTrades::Unavailable),
        ];
        let series = build_cumulative_series("BTCUSDT", "1h", Market::Spot, windows).unwrap();

        let path = CsvExporter::new(dir.path()).write_cvd(&series).unwrap().unwrap();
        assert_eq!(path.file_name().unwrap(), "spot_cvd.csv");

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(
            headers.iter().collect::<Vec<_>>(),
            vec!["window_start", "window_end", "interval_delta", "cumulative_delta", "trade_count", "status"]
        );

        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(&records[0][3], "5");
        assert_eq!(&records[1][2], "0");
        assert_eq!(&records[1][3], "5");
        assert_eq!(&records[1][5], "unavailable");
    }

    #[test]
    fn test_liquidations_csv() {
        let dir = tempfile::tempdir().unwrap();
        let events = vec![LiquidationEvent {
            symbol: "ETHUSDT".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
            side: LiquidationSide::Sell,
            price: dec!(3500),
            orig_qty: dec!(2),
            executed_qty: dec!(2),
            average_price: dec!(3499.5),
            value: dec!(7000),
        }];

        let path = CsvExporter::new(dir.path()).write_liquidations(&events).unwrap().unwrap();
        let content = std::fs::read_to_string(path).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next(),
            Some("symbol,timestamp,side,price,orig_qty,executed_qty,average_price,value")
        );
        let row = lines.next().unwrap();
        assert!(row.starts_with("ETHUSDT,2024-06-01T12:00:00Z,SELL,3500,"));
        assert!(row.ends_with(",7000"));
    }

    #[test]
    fn test_empty_tables_write_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = CsvExporter::new(dir.path());

        assert!(exporter.write_open_interest(&[]).unwrap().is_none());
        assert!(exporter.write_comparison(&[]).unwrap().is_none());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
