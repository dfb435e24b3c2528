use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::error::{AggregationError, FetchError};
use crate::types::{CumulativeSeries, CvdPoint, Market, TimeWindow, TradeRecord, WindowStatus};

/// Buyer-initiated volume minus seller-initiated volume.
///
/// `is_maker_side == true` means the buyer rested on the book, so the seller
/// crossed the spread.
pub fn interval_delta(trades: &[TradeRecord]) -> Decimal {
    let (buy_volume, sell_volume) =
        trades
            .iter()
            .fold((Decimal::ZERO, Decimal::ZERO), |(buy, sell), trade| {
                if trade.is_buyer_initiated() {
                    (buy + trade.quantity, sell)
                } else {
                    (buy, sell + trade.quantity)
                }
            });
    buy_volume - sell_volume
}

/// Trades obtained for one window
#[derive(Debug, Clone)]
pub enum WindowTrades {
    /// Fetch succeeded. `limit` is the per-call cap that was requested.
    Fetched { trades: Vec<TradeRecord>, limit: Option<u32> },
    /// Fetch failed; indistinguishable from an empty window for the delta
    Unavailable,
}

impl WindowTrades {
    pub fn complete(trades: Vec<TradeRecord>) -> Self {
        Self::Fetched { trades, limit: None }
    }

    pub fn from_fetch(result: Result<Vec<TradeRecord>, FetchError>, limit: u32) -> Self {
        match result {
            Ok(trades) => Self::Fetched {
                trades,
                limit: Some(limit),
            },
            Err(_) => Self::Unavailable,
        }
    }

    fn status(&self) -> WindowStatus {
        match self {
            Self::Fetched {
                trades,
                limit: Some(limit),
            } if *limit > 0 && trades.len() >= *limit as usize => WindowStatus::Truncated,
            Self::Fetched { .. } => WindowStatus::Complete,
            Self::Unavailable => WindowStatus::Unavailable,
        }
    }
}

/// Left fold of per-window deltas into a running CVD
#[derive(Debug, Default)]
pub struct CvdAccumulator {
    cumulative: Decimal,
    points: Vec<CvdPoint>,
}

impl CvdAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Running CVD after the windows pushed so far
    pub fn cumulative(&self) -> Decimal {
        self.cumulative
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Append the next window. It must start after the previous window
    /// started and not before the previous window ended.
    pub fn push_window(&mut self, window: TimeWindow, trades: &WindowTrades) -> Result<&CvdPoint, AggregationError> {
        if let Some(last) = self.points.last() {
            if window.start() <= last.window.start() || window.start() < last.window.end() {
                return Err(AggregationError::OutOfOrder {
                    previous: last.window.start(),
                    next: window.start(),
                });
            }
        }

        let status = trades.status();
        let (delta, trade_count) = match trades {
            WindowTrades::Fetched { trades, .. } => (interval_delta(trades), trades.len()),
            WindowTrades::Unavailable => (Decimal::ZERO, 0),
        };

        match status {
            WindowStatus::Truncated => warn!(
                "Window starting {} hit the trade limit ({} trades); volume may be under-counted",
                window.start(),
                trade_count
            ),
            WindowStatus::Unavailable => warn!("No trade data for window starting {}", window.start()),
            WindowStatus::Complete => {}
        }

        self.cumulative += delta;
        self.points.push(CvdPoint {
            window,
            interval_delta: delta,
            cumulative_delta: self.cumulative,
            trade_count,
            status,
        });

        debug!(
            "Window {} delta={} cvd={} ({})",
            window.start(),
            delta,
            self.cumulative,
            status
        );

        Ok(&self.points[self.points.len() - 1])
    }

    pub fn finish(self, symbol: &str, interval: &str, market: Market) -> CumulativeSeries {
        CumulativeSeries::new(symbol.to_string(), interval.to_string(), market, self.points)
    }
}

/// Fold ordered windows into a series in one call
pub fn build_cumulative_series<I>(
    symbol: &str,
    interval: &str,
    market: Market,
    windows: I,
) -> Result<CumulativeSeries, AggregationError>
where
    I: IntoIterator<Item = (TimeWindow, WindowTrades)>,
{
    let mut acc = CvdAccumulator::new();
    for (window, trades) in windows {
        acc.push_window(window, &trades)?;
    }
    Ok(acc.finish(symbol, interval, market))
}
