//! Spot vs futures CVD alignment

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::types::{ComparisonPoint, CumulativeSeries};

/// Pointwise `futures - spot` over window starts present in both series.
///
/// Timestamps found in only one series are dropped. Either series being empty
/// yields an empty result.
pub fn compare_series(spot: &CumulativeSeries, futures: &CumulativeSeries) -> Vec<ComparisonPoint> {
    if spot.is_empty() || futures.is_empty() {
        info!("Not enough data to compare spot and futures CVD");
        return Vec::new();
    }

    let futures_by_start: BTreeMap<_, _> = futures
        .points()
        .iter()
        .map(|p| (p.window.start(), p.cumulative_delta))
        .collect();

    let mut points: Vec<ComparisonPoint> = spot
        .points()
        .iter()
        .filter_map(|p| {
            let timestamp = p.window.start();
            futures_by_start.get(&timestamp).map(|&futures_value| ComparisonPoint {
                timestamp,
                spot_value: p.cumulative_delta,
                futures_value,
                difference: futures_value - p.cumulative_delta,
            })
        })
        .collect();
    points.sort_by_key(|p| p.timestamp);

    debug!(
        "Aligned {} of {} spot / {} futures windows",
        points.len(),
        spot.len(),
        futures.len()
    );

    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::{build_cumulative_series, WindowTrades};
    use crate::types::{Market, TimeWindow, TradeRecord};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    const HOUR_MS: i64 = 3_600_000;

    fn series(market: Market, hours: &[i64], deltas: &[Decimal]) -> CumulativeSeries {
        let windows = hours.iter().zip(deltas).map(|(&h, &d)| {
            let window = TimeWindow::from_millis(h * HOUR_MS, (h + 1) * HOUR_MS - 1).unwrap();
            let trade = TradeRecord::new(d.abs(), d < Decimal::ZERO);
            (window, WindowTrades::complete(vec![trade]))
        });
        build_cumulative_series("BTCUSDT", "1h", market, windows).unwrap()
    }

    #[test]
    fn test_intersection_only() {
        // spot {t1,t2,t3}, futures {t1,t2,t4}
        let spot = series(Market::Spot, &[1, 2, 3], &[dec!(1), dec!(2), dec!(3)]);
        let futures = series(Market::Futures, &[1, 2, 4], &[dec!(5), dec!(-1), dec!(7)]);

        let result = compare_series(&spot, &futures);
        assert_eq!(result.len(), 2);

        assert_eq!(result[0].timestamp.timestamp_millis(), HOUR_MS);
        assert_eq!(result[0].spot_value, dec!(1));
        assert_eq!(result[0].futures_value, dec!(5));
        assert_eq!(result[0].difference, dec!(4));

        assert_eq!(result[1].timestamp.timestamp_millis(), 2 * HOUR_MS);
        assert_eq!(result[1].spot_value, dec!(3));
        assert_eq!(result[1].futures_value, dec!(4));
        assert_eq!(result[1].difference, dec!(1));
    }

    #[test]
    fn test_empty_input_is_noop() {
        let spot = series(Market::Spot, &[1, 2], &[dec!(1), dec!(2)]);
        let empty = CumulativeSeries::empty("BTCUSDT", "1h", Market::Futures);

        assert!(compare_series(&spot, &empty).is_empty());
        assert!(compare_series(&empty, &spot).is_empty());
    }

    #[test]
    fn test_disjoint_series() {
        let spot = series(Market::Spot, &[1, 2], &[dec!(1), dec!(2)]);
        let futures = series(Market::Futures, &[5, 6], &[dec!(1), dec!(2)]);
        assert!(compare_series(&spot, &futures).is_empty());
    }
}
