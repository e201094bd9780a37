//! CME ingestion - entry point.

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use cme_core::{TableKind, TradeDate};
use cme_ingest::{FuturesDataService, TradeDateService};
use cme_persistence::TradeDateQuery;
use tracing::info;

/// Scrape CME settlement and volume/open-interest tables into the store.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via CME_INGEST_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scrape settlement tables
    Settlement,
    /// Scrape volume and open interest tables
    VolumeOi,
    /// Scrape both tables, settlements first
    All,
    /// Register every configured asset and exit
    InitAssets,
    /// Remove an asset and all of its stored rows
    RemoveAsset { name: String },
    /// Print the stored futures curve of one trade date as JSON
    Curve {
        name: String,
        /// Trade date, YYYY-MM-DD
        date: String,
        /// Add month-over-month settle spreads
        #[arg(long)]
        spread: bool,
    },
    /// Print the trade dates with stored data as JSON
    TradeDates {
        name: String,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        #[arg(long, default_value_t = 0)]
        skip: usize,
        #[arg(long, default_value_t = 100)]
        limit: usize,
    },
}

fn parse_date(value: Option<&str>) -> Result<Option<TradeDate>> {
    Ok(value.map(TradeDate::parse_iso).transpose()?)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Determine config path: CLI arg > CME_INGEST_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("CME_INGEST_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    let config = cme_ingest::AppConfig::from_file(&config_path)?;
    cme_telemetry::init_logging(config.telemetry.log_level.as_deref())?;

    info!("Starting cme-ingest v{}", env!("CARGO_PKG_VERSION"));
    info!(config_path = %config_path, store = ?config.store.kind, "Configuration loaded");

    let app = cme_ingest::Application::new(config)?;

    let kinds = match args.command {
        Command::InitAssets => {
            let assets = app.init_assets()?;
            info!(count = assets.len(), "Assets initialised");
            return Ok(());
        }
        Command::RemoveAsset { name } => {
            app.remove_asset(&name)?;
            return Ok(());
        }
        Command::Curve { name, date, spread } => {
            let date = TradeDate::parse_iso(&date)?;
            let service = FuturesDataService::new(app.store());
            let json = if spread {
                serde_json::to_string_pretty(&service.futures_curve(&name, date)?)?
            } else {
                serde_json::to_string_pretty(&service.futures_data(&name, date)?)?
            };
            println!("{json}");
            return Ok(());
        }
        Command::TradeDates {
            name,
            start,
            end,
            skip,
            limit,
        } => {
            let query = TradeDateQuery {
                start: parse_date(start.as_deref())?,
                end: parse_date(end.as_deref())?,
                skip,
                limit,
            };
            let dates = TradeDateService::new(app.store()).fetch_trade_dates(&name, &query)?;
            println!("{}", serde_json::to_string_pretty(&dates)?);
            return Ok(());
        }
        Command::Settlement => vec![TableKind::Settlements],
        Command::VolumeOi => vec![TableKind::VolumeAndOpenInterest],
        Command::All => TableKind::ALL.to_vec(),
    };

    let reports = app.run(&kinds).await?;
    if let Some(aborted) = reports.iter().find_map(|r| r.aborted.as_deref()) {
        bail!("Run aborted: {aborted}");
    }
    Ok(())
}
