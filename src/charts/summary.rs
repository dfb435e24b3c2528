use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::types::{DailyLiquidationTotal, LiquidationEvent, LiquidationSide};

/// Liquidation value per (UTC calendar date, side), ordered by date then side
pub fn daily_liquidation_totals(events: &[LiquidationEvent]) -> Vec<DailyLiquidationTotal> {
    let mut totals: BTreeMap<_, Decimal> = BTreeMap::new();
    for event in events {
        *totals
            .entry((event.timestamp.date_naive(), event.side))
            .or_default() += event.value;
    }

    totals
        .into_iter()
        .map(|((date, side), value)| DailyLiquidationTotal { date, side, value })
        .collect()
}

/// Total liquidation value per side, BUY before SELL; sides with no events
/// are omitted
pub fn side_totals(events: &[LiquidationEvent]) -> Vec<(LiquidationSide, Decimal)> {
    let mut totals: BTreeMap<LiquidationSide, Decimal> = BTreeMap::new();
    for event in events {
        *totals.entry(event.side).or_default() += event.value;
    }
    totals.into_iter().collect()
}
