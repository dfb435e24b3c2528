use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use tracing::{error, info, warn};

use orderflow_metrics::{
    compare_series, BinanceClient, BinanceConfig, ChartRenderer, CsvExporter, Credentials, CumulativeSeries,
    DataFetcher, MarketDataSource, RunConfig, SymbolBatch,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Binance API key
    #[arg(long, env = "BINANCE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Binance API secret
    #[arg(long, env = "BINANCE_API_SECRET", hide_env_values = true)]
    api_secret: Option<String>,

    /// Symbol for every step
    #[arg(short, long, default_value = "BTCUSDT")]
    symbol: String,

    /// Fetch open interest for all stable-quoted futures symbols and
    /// liquidations for the default major pairs
    #[arg(long)]
    all_symbols: bool,

    /// Open interest history rows per symbol
    #[arg(long, default_value = "30")]
    oi_limit: u32,

    /// Open interest history period
    #[arg(long, default_value = "1d")]
    oi_period: String,

    /// Liquidation lookback in days
    #[arg(long, default_value = "7")]
    liquidation_days: i64,

    /// Max liquidation orders per symbol (endpoint maximum is 100)
    #[arg(long, default_value = "100")]
    liquidation_limit: u32,

    /// Candle interval for CVD windows
    #[arg(short, long, default_value = "1h")]
    interval: String,

    /// Number of CVD windows
    #[arg(long, default_value = "24")]
    candles: u32,

    /// Max aggregated trades per window
    #[arg(long, default_value = "1000")]
    trade_limit: u32,

    /// Directory for charts and CSV files
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Also write CSV tables
    #[arg(long)]
    csv: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn run_config(&self) -> RunConfig {
        RunConfig {
            symbol: (!self.all_symbols).then(|| self.symbol.clone()),
            cvd_symbol: self.symbol.clone(),
            oi_limit: self.oi_limit,
            oi_period: self.oi_period.clone(),
            liquidation_lookback_days: self.liquidation_days,
            liquidation_limit: self.liquidation_limit,
            interval: self.interval.clone(),
            candle_limit: self.candles,
            trade_limit: self.trade_limit,
            output_dir: self.output_dir.clone(),
            export_csv: self.csv,
        }
    }
}

fn report_failures<T>(what: &str, batch: &SymbolBatch<T>) {
    for (symbol, reason) in batch.failures() {
        warn!("{} unavailable for {}: {}", what, symbol, reason);
    }
}

fn summarize_series(series: &CumulativeSeries) {
    if series.is_empty() {
        return;
    }
    info!(
        "{} CVD for {}: {} windows, final delta {}",
        series.market(),
        series.symbol(),
        series.len(),
        series.final_delta()
    );
    if series.truncated_windows() > 0 {
        warn!(
            "{} of {} {} windows hit the trade limit",
            series.truncated_windows(),
            series.len(),
            series.market()
        );
    }
    for point in series.points().iter().take(5) {
        info!(
            "  {} delta={} cumulative={} trades={} ({})",
            point.window.start(),
            point.interval_delta,
            point.cumulative_delta,
            point.trade_count,
            point.status
        );
    }
}

async fn run<S: MarketDataSource>(fetcher: &DataFetcher<S>, config: &RunConfig, liquidation_start: DateTime<Utc>) {
    let charts = ChartRenderer::new(&config.output_dir);
    let exporter = config.export_csv.then(|| CsvExporter::new(&config.output_dir));

    // 1. Open interest
    info!("Step 1/5: open interest");
    let batch = fetcher
        .fetch_open_interest(config.symbol.as_deref(), config.oi_limit)
        .await;
    report_failures("Open interest", &batch);
    let samples = batch.into_records();
    info!("Fetched {} open interest rows", samples.len());
    for sample in samples.iter().take(5) {
        info!(
            "  {} {} oi={} value={}",
            sample.symbol, sample.timestamp, sample.sum_open_interest, sample.sum_open_interest_value
        );
    }
    if let Err(e) = charts.render_open_interest(&samples) {
        error!("Open interest chart failed: {}", e);
    }
    if let Some(exporter) = &exporter {
        if let Err(e) = exporter.write_open_interest(&samples) {
            error!("Open interest CSV failed: {}", e);
        }
    }

    // 2. Liquidations
    info!("Step 2/5: liquidations");
    let batch = fetcher
        .fetch_liquidations(
            config.symbol.as_deref(),
            Some(liquidation_start),
            None,
            config.liquidation_limit,
        )
        .await;
    report_failures("Liquidations", &batch);
    let events = batch.into_records();
    info!("Fetched {} liquidation orders", events.len());
    for event in events.iter().take(5) {
        info!(
            "  {} {} {} {} @ {} value={}",
            event.symbol, event.timestamp, event.side, event.orig_qty, event.price, event.value
        );
    }
    if let Err(e) = charts.render_liquidations(&events) {
        error!("Liquidation charts failed: {}", e);
    }
    if let Some(exporter) = &exporter {
        if let Err(e) = exporter.write_liquidations(&events) {
            error!("Liquidation CSV failed: {}", e);
        }
    }

    // 3/4. Spot and futures CVD
    let symbol = config.cvd_symbol();
    info!("Step 3/5: spot CVD for {}", symbol);
    let spot = fetcher.spot_cvd(symbol, &config.interval, config.candle_limit).await;
    info!("Step 4/5: futures CVD for {}", symbol);
    let futures = fetcher.futures_cvd(symbol, &config.interval, config.candle_limit).await;

    for series in [&spot, &futures] {
        summarize_series(series);
        if let Err(e) = charts.render_cvd(series) {
            error!("{} CVD charts failed: {}", series.market(), e);
        }
        if let Some(exporter) = &exporter {
            if let Err(e) = exporter.write_cvd(series) {
                error!("{} CVD CSV failed: {}", series.market(), e);
            }
        }
    }

    // 5. Comparison
    info!("Step 5/5: spot vs futures CVD");
    let comparison = compare_series(&spot, &futures);
    info!("{} overlapping windows", comparison.len());
    if let Some(last) = comparison.last() {
        info!(
            "  latest {} spot={} futures={} difference={}",
            last.timestamp, last.spot_value, last.futures_value, last.difference
        );
    }
    if let Err(e) = charts.render_comparison(&comparison) {
        error!("Comparison charts failed: {}", e);
    }
    if let Some(exporter) = &exporter {
        if let Err(e) = exporter.write_comparison(&comparison) {
            error!("Comparison CSV failed: {}", e);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before clap reads the env fallbacks
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("orderflow_metrics={}", level).parse()?),
        )
        .init();

    let credentials = Credentials::new(
        args.api_key.clone().unwrap_or_default(),
        args.api_secret.clone().unwrap_or_default(),
    )
    .context("Binance credentials required: run create-env or set BINANCE_API_KEY and BINANCE_API_SECRET")?;

    let config = args.run_config();
    let liquidation_start = config
        .liquidation_start(Utc::now())
        .context("Invalid --liquidation-days")?;
    info!("Starting orderflow metrics run");
    info!("  Symbol: {}", config.symbol.as_deref().unwrap_or("all"));
    info!("  CVD: {} x {} candles", config.interval, config.candle_limit);
    info!("  Output: {}", config.output_dir.display());

    let client = BinanceClient::new(BinanceConfig::new(credentials).with_env_overrides())
        .context("Failed to build Binance client")?;
    let fetcher = DataFetcher::new(client)
        .with_oi_period(config.oi_period.clone())
        .with_trade_limit(config.trade_limit);

    run(&fetcher, &config, liquidation_start).await;

    info!("Done");
    Ok(())
}
