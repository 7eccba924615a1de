use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;
use std::{fs, path::PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(
    name = "parse-trades",
    about = "Parse a broker trade-history export (CSV/XLSX/XLS) into completed trades."
)]
struct Args {
    /// Path to the export file
    input: PathBuf,

    /// Optional settings.json path (date order, filters, insights gate)
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Optional output path; defaults to stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Pretty-print the JSON output
    #[arg(long, default_value_t = true)]
    pretty: bool,
}

// The persistence-shaped payload: one row per completed trade plus the
// individual legs, ids assigned the way the storage layer would.
#[derive(Serialize)]
struct ParsedUpload {
    filename: String,
    trade_count: usize,
    trades: Vec<models::TradeRecord>,
    transactions: Vec<models::TransactionRecord>,
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let settings = settings_loader::load_settings_or_default(args.settings.as_ref())?;
    let bytes = fs::read(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    let filename = args
        .input
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let completed = trade_parser::parse_trade_file(&bytes, &filename, &settings)?;
    if completed.is_empty() {
        bail!("No valid trades found in file");
    }

    let mut trades = Vec::with_capacity(completed.len());
    let mut transactions = Vec::new();
    for (idx, trade) in completed.iter().enumerate() {
        let id = format!("trade-{:05}", idx + 1);
        trades.push(trade.to_record(id.clone()));
        transactions.extend(trade.leg_records(&id));
    }

    let payload = ParsedUpload {
        filename,
        trade_count: trades.len(),
        trades,
        transactions,
    };

    let json = if args.pretty {
        serde_json::to_string_pretty(&payload)?
    } else {
        serde_json::to_string(&payload)?
    };
    match &args.output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("writing {}", path.display()))?
        }
        None => println!("{}", json),
    }

    eprintln!(
        "Parsed {} trades from {}",
        payload.trade_count,
        args.input.display()
    );
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
