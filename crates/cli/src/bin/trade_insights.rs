use anyhow::{bail, Context, Result};
use clap::Parser;
use models::{TradeRecord, TransactionRecord};
use serde::Deserialize;
use std::{fs, path::PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(
    name = "trade-insights",
    about = "Compute an insights report from parsed trade JSON."
)]
struct Args {
    /// Path to the trades JSON produced by parse-trades
    input: PathBuf,

    /// Optional settings.json path
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Optional output path; defaults to stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Pretty-print the JSON output
    #[arg(long, default_value_t = true)]
    pretty: bool,
}

#[derive(Deserialize)]
struct ParsedUpload {
    trades: Vec<TradeRecord>,
    #[serde(default)]
    transactions: Vec<TransactionRecord>,
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let settings = settings_loader::load_settings_or_default(args.settings.as_ref())?;
    let raw = fs::read_to_string(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    let upload: ParsedUpload = serde_json::from_str(&raw)
        .with_context(|| format!("parsing {}", args.input.display()))?;

    if upload.trades.is_empty() {
        bail!("No trades found in {}", args.input.display());
    }
    // The meaningfulness gate lives here, at the calling layer; the engine
    // itself has no minimum.
    if upload.trades.len() < settings.min_trades_for_insights {
        bail!(
            "Minimum {} trades required for meaningful insights",
            settings.min_trades_for_insights
        );
    }

    let transactions = (!upload.transactions.is_empty()).then_some(upload.transactions.as_slice());
    let insights = insights_engine::calculate_insights(&upload.trades, transactions);

    let json = if args.pretty {
        serde_json::to_string_pretty(&insights)?
    } else {
        serde_json::to_string(&insights)?
    };
    match &args.output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("writing {}", path.display()))?
        }
        None => println!("{}", json),
    }

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
