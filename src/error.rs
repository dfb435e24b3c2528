//! Error types for the data source, aggregation and output layers

use chrono::{DateTime, Utc};

/// Failure of a single remote call (one symbol or one window)
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("API returned error: {code} - {message}")]
    Api { code: i64, message: String },

    #[error("Request to {endpoint} failed ({status}): {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("Malformed record: {0}")]
    Malformed(String),

    #[error("Invalid time window: start {start} is not before end {end}")]
    InvalidWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// Startup configuration problems
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not set or empty")]
    MissingCredential(&'static str),

    #[error("Liquidation lookback of {0} days is out of range")]
    InvalidLookback(i64),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum AggregationError {
    #[error("Window starting {next} is out of order (previous window started {previous})")]
    OutOfOrder {
        previous: DateTime<Utc>,
        next: DateTime<Utc>,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ChartError {
    #[error("Image encoding failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
