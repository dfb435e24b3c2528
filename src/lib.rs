// Library crate - exports the Binance source, CVD processing and chart output

pub mod binance;
pub mod charts;
pub mod comparison;
pub mod config;
pub mod error;
pub mod export;
pub mod fetcher;
pub mod processing;
pub mod types;

// Re-export commonly used types
pub use types::*;
pub use binance::{BinanceClient, MarketDataSource};
pub use charts::ChartRenderer;
pub use comparison::compare_series;
pub use config::{BinanceConfig, Credentials, RunConfig};
pub use error::{AggregationError, ChartError, ConfigError, ExportError, FetchError};
pub use export::CsvExporter;
pub use fetcher::DataFetcher;
pub use processing::{build_cumulative_series, CvdAccumulator, WindowTrades};
