//! Ingestion pipeline for heterogeneous trade-history exports.
//!
//! Raw file bytes go through a format adapter (CSV or XLSX/XLS), platform
//! fingerprinting, fuzzy column resolution, date/numeric normalization, and
//! finally FIFO buy/sell matching into completed round-trip trades with
//! computed P&L. The pipeline is deliberately forgiving: a structurally
//! broken file errors out, a malformed row never does.

pub mod columns;
mod csv_file;
pub mod datetime;
mod error;
mod ingest;
pub mod instrument;
mod matcher;
pub mod numeric;
pub mod platform;
mod workbook;

use models::{CompletedTrade, RawTransaction, Settings};
use tracing::debug;

use crate::platform::detect_platform;

pub use crate::error::ParseError;
pub use crate::ingest::normalize_rows;
pub use crate::matcher::match_trades;

/// Parses an uploaded export into completed round-trip trades.
///
/// The adapter is selected by file extension (`.csv` vs `.xlsx`/`.xls`);
/// any other extension is `ParseError::UnsupportedFormat`. The returned
/// list contains every input transaction, matched or as a one-sided
/// leftover; it is never partially applied.
pub fn parse_trade_file(
    bytes: &[u8],
    filename: &str,
    settings: &Settings,
) -> Result<Vec<CompletedTrade>, ParseError> {
    let transactions = parse_transactions(bytes, filename, settings)?;
    Ok(match_trades(transactions))
}

/// Parses an uploaded export into raw transactions, without matching.
pub fn parse_transactions(
    bytes: &[u8],
    filename: &str,
    settings: &Settings,
) -> Result<Vec<RawTransaction>, ParseError> {
    let lower = filename.to_lowercase();
    let (headers, rows) = if lower.ends_with(".csv") {
        csv_file::read_rows(bytes)?
    } else if lower.ends_with(".xlsx") || lower.ends_with(".xls") {
        workbook::read_rows(bytes)?
    } else {
        let extension = lower.rsplit('.').next().unwrap_or("").to_string();
        return Err(ParseError::UnsupportedFormat(extension));
    };

    let platform = detect_platform(&headers);
    debug!(%platform, rows = rows.len(), file = filename, "rows parsed");

    Ok(ingest::normalize_rows(rows, platform, settings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::{Platform, Side};

    const TOS_CSV: &str = "\
Exec Time,Symbol,Side,Qty,Price,Commission,Pos Effect
01/15/24 09:30:00,AAPL,BUY,10,100,1,TO OPEN
01/15/24 10:45:00,AAPL,SELL,10,110,1,TO CLOSE
01/15/24 11:00:00,MSFT,BUY,5,300,0.5,TO OPEN
";

    #[test]
    fn test_csv_end_to_end() {
        let trades = parse_trade_file(TOS_CSV.as_bytes(), "export.csv", &Settings::default()).unwrap();

        assert_eq!(trades.len(), 2);
        let aapl = &trades[0];
        assert_eq!(aapl.symbol, "AAPL");
        assert!(aapl.is_matched());
        assert_eq!(aapl.platform, Platform::ThinkOrSwim);
        assert!((aapl.pnl - 98.0).abs() < 1e-9);

        let msft = &trades[1];
        assert_eq!(msft.symbol, "MSFT");
        assert_eq!(msft.side, Side::Buy);
        assert!(!msft.is_matched());
    }

    #[test]
    fn test_reparsing_is_idempotent() {
        let settings = Settings::default();
        let first = parse_trade_file(TOS_CSV.as_bytes(), "export.csv", &settings).unwrap();
        let second = parse_trade_file(TOS_CSV.as_bytes(), "export.csv", &settings).unwrap();

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.symbol, b.symbol);
            assert_eq!(a.entry_price, b.entry_price);
            assert_eq!(a.exit_price, b.exit_price);
            assert_eq!(a.quantity, b.quantity);
            assert_eq!(a.pnl, b.pnl);
            assert_eq!(a.trade_date, b.trade_date);
        }
    }

    #[test]
    fn test_every_transaction_is_represented() {
        let settings = Settings::default();
        let transactions = parse_transactions(TOS_CSV.as_bytes(), "export.csv", &settings).unwrap();
        let buys = transactions.iter().filter(|t| t.side == Side::Buy).count();
        let sells = transactions.iter().filter(|t| t.side == Side::Sell).count();

        let trades = match_trades(transactions);
        let buy_legs = trades.iter().filter(|t| t.buy_transaction.is_some()).count();
        let sell_legs = trades.iter().filter(|t| t.sell_transaction.is_some()).count();

        assert_eq!(buys, buy_legs);
        assert_eq!(sells, sell_legs);
    }

    #[test]
    fn test_unsupported_extension() {
        let err = parse_trade_file(b"whatever", "export.txt", &Settings::default()).unwrap_err();
        assert!(matches!(err, ParseError::UnsupportedFormat(ref ext) if ext == "txt"));
    }

    #[test]
    fn test_corrupt_workbook_is_fatal() {
        let err = parse_trade_file(b"not a real workbook", "export.xlsx", &Settings::default());
        assert!(err.is_err());
    }

    #[test]
    fn test_noise_rows_are_skipped_not_fatal() {
        let csv = "\
Date,Symbol,Side,Qty,Price
,,,
01/15/2024,AAPL,BUY,10,100
TOTALS,,,,
01/16/2024,AAPL,SELL,10,105
";
        let trades = parse_trade_file(csv.as_bytes(), "export.csv", &Settings::default()).unwrap();
        // the TOTALS line has no symbol and disappears; the blank line too
        assert_eq!(trades.len(), 1);
        assert!(trades[0].is_matched());
    }
}
