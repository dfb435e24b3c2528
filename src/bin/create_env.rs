//! Prompt for Binance credentials and write them to a `.env` file

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};

use orderflow_metrics::config::{write_env_file, API_KEY_VAR, API_SECRET_VAR};
use orderflow_metrics::Credentials;

#[derive(Parser, Debug)]
#[command(author, version, about = "Write BINANCE_API_KEY / BINANCE_API_SECRET to a .env file")]
struct Args {
    /// Output path
    #[arg(short, long, default_value = ".env")]
    path: PathBuf,
}

fn prompt(input: &mut impl BufRead, label: &str) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        bail!("No input for {}", label);
    }
    Ok(line.trim().to_string())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("create_env=info".parse()?),
        )
        .init();

    let args = Args::parse();

    if args.path.exists() {
        warn!("{} exists and will be overwritten", args.path.display());
    }

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let api_key = prompt(&mut input, API_KEY_VAR)?;
    let api_secret = prompt(&mut input, API_SECRET_VAR)?;

    let credentials = Credentials::new(api_key, api_secret).context("Both values are required")?;
    write_env_file(&args.path, &credentials)
        .with_context(|| format!("Failed to write {}", args.path.display()))?;

    info!("Credentials written to {}", args.path.display());
    Ok(())
}
