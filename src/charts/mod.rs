//! Chart rendering
//!
//! Draws the fetched and computed tables to PNG files. Nothing here
//! aggregates data beyond the per-day liquidation totals needed for display.

mod canvas;
mod pie;
pub mod summary;

pub use canvas::{Canvas, Scale};
pub use pie::render_pie;

use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::info;

use crate::error::ChartError;
use crate::types::{ComparisonPoint, CumulativeSeries, LiquidationEvent, LiquidationSide, Market, OpenInterestSample};

pub const OPEN_INTEREST_FILE: &str = "open_interest.png";
pub const LIQUIDATIONS_BAR_FILE: &str = "liquidations_bar.png";
pub const LIQUIDATIONS_PIE_FILE: &str = "liquidations_pie.png";
pub const CVD_COMPARISON_FILE: &str = "cvd_comparison.png";
pub const CVD_DIFFERENCE_FILE: &str = "cvd_difference.png";

/// `spot_cvd.png` / `futures_cvd.png`
pub fn cvd_file(market: Market) -> String {
    format!("{}_cvd.png", market.label())
}

/// `spot_interval_cvd.png` / `futures_interval_cvd.png`
pub fn interval_cvd_file(market: Market) -> String {
    format!("{}_interval_cvd.png", market.label())
}

/// Common color definitions
pub mod colors {
    use image::Rgb;

    pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
    pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
    pub const GRID: Rgb<u8> = Rgb([225, 225, 225]);
    pub const AXIS: Rgb<u8> = Rgb([90, 90, 90]);
    pub const GREEN: Rgb<u8> = Rgb([0, 128, 0]);
    pub const RED: Rgb<u8> = Rgb([220, 20, 20]);
    pub const BLUE: Rgb<u8> = Rgb([31, 119, 180]);
    pub const ORANGE: Rgb<u8> = Rgb([255, 165, 0]);
}

/// Image configuration
#[derive(Debug, Clone)]
pub struct ChartConfig {
    pub width: u32,
    pub height: u32,
    pub margin: u32,
    pub background: Rgb<u8>,
    pub grid_lines: usize,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            width: 1400,
            height: 700,
            margin: 50,
            background: colors::WHITE,
            grid_lines: 8,
        }
    }
}

impl ChartConfig {
    /// Wider/taller canvas used for the liquidation bars
    pub fn tall() -> Self {
        Self {
            height: 800,
            ..Default::default()
        }
    }

    /// Square canvas used for the pie chart
    pub fn square() -> Self {
        Self {
            width: 1000,
            height: 800,
            ..Default::default()
        }
    }
}

fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

fn series_color(market: Market) -> Rgb<u8> {
    match market {
        Market::Spot => colors::BLUE,
        Market::Futures => colors::ORANGE,
    }
}

fn sign_color(value: f64) -> Rgb<u8> {
    if value > 0.0 {
        colors::GREEN
    } else {
        colors::RED
    }
}

/// Writes chart images into one output directory
pub struct ChartRenderer {
    output_dir: PathBuf,
    config: ChartConfig,
}

impl ChartRenderer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            config: ChartConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ChartConfig) -> Self {
        self.config = config;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn save(&self, img: &RgbImage, file_name: &str) -> Result<PathBuf, ChartError> {
        std::fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(file_name);
        img.save(&path)?;
        info!("Saved chart: {}", path.display());
        Ok(path)
    }

    /// Line chart of open interest value (billions) for the first symbol in
    /// the collection
    pub fn render_open_interest(&self, samples: &[OpenInterestSample]) -> Result<Vec<PathBuf>, ChartError> {
        let Some(first) = samples.first() else {
            info!("No open interest data to chart");
            return Ok(Vec::new());
        };

        let symbol_count = {
            let mut symbols: Vec<&str> = samples.iter().map(|s| s.symbol.as_str()).collect();
            symbols.sort_unstable();
            symbols.dedup();
            symbols.len()
        };
        info!("Open interest data for {} symbol(s); charting {}", symbol_count, first.symbol);

        let mut rows: Vec<&OpenInterestSample> = samples.iter().filter(|s| s.symbol == first.symbol).collect();
        rows.sort_by_key(|s| s.timestamp);
        let values: Vec<f64> = rows
            .iter()
            .map(|s| to_f64(s.sum_open_interest_value) / 1e9)
            .collect();

        let mut canvas = Canvas::new(&self.config, values.len(), Scale::from_values(values.iter().copied(), false));
        canvas.draw_frame(self.config.grid_lines);
        canvas.draw_series(&values, colors::BLUE, 2);

        Ok(vec![self.save(&canvas.into_image(), OPEN_INTEREST_FILE)?])
    }

    /// Daily BUY/SELL liquidation bars (millions) and a side-share pie
    pub fn render_liquidations(&self, events: &[LiquidationEvent]) -> Result<Vec<PathBuf>, ChartError> {
        if events.is_empty() {
            info!("No liquidation data to chart");
            return Ok(Vec::new());
        }

        let daily = summary::daily_liquidation_totals(events);
        let mut dates: Vec<_> = daily.iter().map(|d| d.date).collect();
        dates.dedup();

        let bar_values: Vec<f64> = daily.iter().map(|d| to_f64(d.value) / 1e6).collect();
        let config = ChartConfig {
            grid_lines: self.config.grid_lines,
            ..ChartConfig::tall()
        };
        let mut canvas = Canvas::new(&config, dates.len(), Scale::from_values(bar_values, true));
        canvas.draw_frame(config.grid_lines);
        for total in &daily {
            let Some(slot) = dates.iter().position(|d| *d == total.date) else {
                continue;
            };
            let (part, color) = match total.side {
                LiquidationSide::Buy => (0, colors::GREEN),
                LiquidationSide::Sell => (1, colors::RED),
            };
            canvas.draw_bar(slot, part, 2, to_f64(total.value) / 1e6, color);
        }
        let bar_path = self.save(&canvas.into_image(), LIQUIDATIONS_BAR_FILE)?;

        let pie_colors = [colors::RED, colors::GREEN];
        let shares: Vec<(f64, Rgb<u8>)> = summary::side_totals(events)
            .into_iter()
            .zip(pie_colors)
            .map(|((_, value), color)| (to_f64(value), color))
            .collect();
        let pie = render_pie(&ChartConfig::square(), &shares);
        let pie_path = self.save(&pie, LIQUIDATIONS_PIE_FILE)?;

        Ok(vec![bar_path, pie_path])
    }

    /// Cumulative line with markers, plus interval delta bars
    pub fn render_cvd(&self, series: &CumulativeSeries) -> Result<Vec<PathBuf>, ChartError> {
        if series.is_empty() {
            info!("No {} CVD data to chart", series.market());
            return Ok(Vec::new());
        }

        let market = series.market();
        let cumulative: Vec<f64> = series.points().iter().map(|p| to_f64(p.cumulative_delta)).collect();
        let interval: Vec<f64> = series.points().iter().map(|p| to_f64(p.interval_delta)).collect();

        let mut line = Canvas::new(&self.config, cumulative.len(), Scale::from_values(cumulative.iter().copied(), false));
        line.draw_frame(self.config.grid_lines);
        line.draw_series(&cumulative, series_color(market), 2);
        line.draw_markers(&cumulative, series_color(market), 5, false);
        let line_path = self.save(&line.into_image(), &cvd_file(market))?;

        let mut bars = Canvas::new(&self.config, interval.len(), Scale::from_values(interval.iter().copied(), true));
        bars.draw_frame(self.config.grid_lines);
        for (i, &v) in interval.iter().enumerate() {
            bars.draw_bar(i, 0, 1, v, sign_color(v));
        }
        bars.draw_zero_line();
        let bars_path = self.save(&bars.into_image(), &interval_cvd_file(market))?;

        Ok(vec![line_path, bars_path])
    }

    /// Spot and futures CVD on shared timestamps, plus the futures - spot bars
    pub fn render_comparison(&self, points: &[ComparisonPoint]) -> Result<Vec<PathBuf>, ChartError> {
        if points.is_empty() {
            info!("No overlapping spot/futures windows to chart");
            return Ok(Vec::new());
        }

        let spot: Vec<f64> = points.iter().map(|p| to_f64(p.spot_value)).collect();
        let futures: Vec<f64> = points.iter().map(|p| to_f64(p.futures_value)).collect();
        let diff: Vec<f64> = points.iter().map(|p| to_f64(p.difference)).collect();

        let config = ChartConfig {
            grid_lines: self.config.grid_lines,
            ..ChartConfig::tall()
        };
        let scale = Scale::from_values(spot.iter().chain(futures.iter()).copied(), false);
        let mut lines = Canvas::new(&config, points.len(), scale);
        lines.draw_frame(config.grid_lines);
        lines.draw_series(&spot, colors::BLUE, 2);
        lines.draw_markers(&spot, colors::BLUE, 5, false);
        lines.draw_series(&futures, colors::ORANGE, 2);
        lines.draw_markers(&futures, colors::ORANGE, 5, true);
        let lines_path = self.save(&lines.into_image(), CVD_COMPARISON_FILE)?;

        let mut bars = Canvas::new(&self.config, diff.len(), Scale::from_values(diff.iter().copied(), true));
        bars.draw_frame(self.config.grid_lines);
        for (i, &v) in diff.iter().enumerate() {
            bars.draw_bar(i, 0, 1, v, sign_color(v));
        }
        bars.draw_zero_line();
        let bars_path = self.save(&bars.into_image(), CVD_DIFFERENCE_FILE)?;

        Ok(vec![lines_path, bars_path])
    }
}
