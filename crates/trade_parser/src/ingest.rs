use models::{DateOrder, Platform, RawTransaction, Settings};
use serde_json::{Map, Value};
use tracing::debug;

use crate::columns::{self, find_field, value_str};
use crate::datetime::{infer_date_order, parse_exec_time};
use crate::instrument::classify_instrument;
use crate::numeric::{parse_numeric, parse_side};

const DATE_SAMPLE_ROWS: usize = 5;

/// Normalizes parsed rows into raw BUY/SELL transactions. Rows with no
/// resolvable symbol (and, when `require_quantity` is set, no resolvable
/// quantity) are assumed to be section headers, subtotal lines, or other
/// non-trade noise and skipped; every surviving row yields a transaction,
/// however incomplete its data.
pub fn normalize_rows(
    rows: Vec<Map<String, Value>>,
    platform: Platform,
    settings: &Settings,
) -> Vec<RawTransaction> {
    let total = rows.len();
    let rows: Vec<Map<String, Value>> = rows
        .into_iter()
        .filter(|row| is_trade_row(row, settings))
        .collect();
    debug!(kept = rows.len(), total, %platform, "filtered trade rows");

    let samples: Vec<String> = rows
        .iter()
        .take(DATE_SAMPLE_ROWS)
        .filter_map(|row| find_field(row, columns::DATE).map(value_str))
        .collect();
    let order = infer_date_order(&samples, settings.date_order);

    rows.into_iter()
        .map(|row| normalize_row(row, platform, order))
        .collect()
}

fn is_trade_row(row: &Map<String, Value>, settings: &Settings) -> bool {
    let has_symbol = find_field(row, columns::SYMBOL)
        .map(|v| !value_str(v).trim().is_empty())
        .unwrap_or(false);
    if !has_symbol {
        return false;
    }
    if settings.require_quantity && find_field(row, columns::QUANTITY).is_none() {
        return false;
    }
    true
}

fn normalize_row(row: Map<String, Value>, platform: Platform, order: DateOrder) -> RawTransaction {
    let symbol = find_field(&row, columns::SYMBOL)
        .map(|v| value_str(v).trim().to_uppercase())
        .unwrap_or_else(|| "UNKNOWN".to_string());

    let side = parse_side(find_field(&row, columns::SIDE));
    let quantity = parse_numeric(find_field(&row, columns::QUANTITY)).abs();
    let price = parse_numeric(find_field(&row, columns::PRICE));
    let net = parse_numeric(find_field(&row, columns::NET_PRICE));
    let net_price = (net > 0.0).then_some(net);
    let commission = parse_numeric(find_field(&row, columns::COMMISSION)).abs();
    let pnl_hint = parse_numeric(find_field(&row, columns::PNL));

    let (exec_time, date_confidence) = parse_exec_time(
        find_field(&row, columns::DATE),
        find_field(&row, columns::TIME),
        order,
    );

    let instrument_type = classify_instrument(&symbol, &row);

    RawTransaction {
        symbol,
        side,
        quantity,
        price,
        net_price,
        commission,
        pnl_hint,
        exec_time,
        date_confidence,
        platform,
        instrument_type,
        raw: row,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::{DateConfidence, InstrumentType, Side};
    use serde_json::json;

    fn rows(values: Vec<Value>) -> Vec<Map<String, Value>> {
        values
            .into_iter()
            .map(|v| v.as_object().unwrap().clone())
            .collect()
    }

    #[test]
    fn test_rows_without_symbol_are_dropped() {
        let input = rows(vec![
            json!({"Symbol": "AAPL", "Qty": 10, "Price": 100, "Side": "BUY", "Date": "01/15/2024"}),
            json!({"Description": "Account subtotal", "Amount": "1,234.00"}),
            json!({"Symbol": "", "Qty": 5}),
        ]);
        let txs = normalize_rows(input, Platform::Unknown, &Settings::default());
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].symbol, "AAPL");
    }

    #[test]
    fn test_strict_variant_requires_quantity() {
        let settings = Settings {
            require_quantity: true,
            ..Settings::default()
        };
        let input = rows(vec![
            json!({"Symbol": "AAPL", "Price": 100}),
            json!({"Symbol": "MSFT", "Qty": 5, "Price": 300}),
        ]);
        let txs = normalize_rows(input, Platform::Unknown, &settings);
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].symbol, "MSFT");
    }

    #[test]
    fn test_malformed_row_degrades_to_defaults() {
        let input = rows(vec![json!({
            "Symbol": "tsla",
            "Side": "transfer",
            "Qty": "??",
            "Price": "n/a",
            "Date": "yesterday"
        })]);
        let txs = normalize_rows(input, Platform::Unknown, &Settings::default());
        assert_eq!(txs.len(), 1);
        let tx = &txs[0];
        assert_eq!(tx.symbol, "TSLA");
        assert_eq!(tx.side, Side::Buy);
        assert_eq!(tx.quantity, 0.0);
        assert_eq!(tx.price, 0.0);
        assert_eq!(tx.date_confidence, DateConfidence::Fallback);
    }

    #[test]
    fn test_fields_are_normalized() {
        let input = rows(vec![json!({
            "Exec Time": "01/15/24 09:30:00",
            "Symbol": "aapl",
            "Side": "Sell to Close",
            "Qty": "-10",
            "Price": "$110.50",
            "Net Price": "110.45",
            "Commission": "(1.25)",
            "Realized P/L": "98.00"
        })]);
        let txs = normalize_rows(input, Platform::ThinkOrSwim, &Settings::default());
        let tx = &txs[0];
        assert_eq!(tx.symbol, "AAPL");
        assert_eq!(tx.side, Side::Sell);
        assert_eq!(tx.quantity, 10.0);
        assert_eq!(tx.price, 110.50);
        assert_eq!(tx.net_price, Some(110.45));
        assert_eq!(tx.commission, 1.25);
        assert_eq!(tx.exec_time.to_rfc3339(), "2024-01-15T09:30:00+00:00");
        assert_eq!(tx.date_confidence, DateConfidence::Parsed);
        assert_eq!(tx.instrument_type, InstrumentType::Stock);
        // the original row rides along for audit
        assert_eq!(tx.raw.get("Symbol"), Some(&json!("aapl")));
    }

    #[test]
    fn test_sampled_dates_lock_day_first_for_whole_file() {
        // the second row is ambiguous on its own; the first locks day-first
        let input = rows(vec![
            json!({"Symbol": "VOD", "Date": "25/01/2024", "Qty": 1, "Price": 10, "Side": "BUY"}),
            json!({"Symbol": "VOD", "Date": "05/02/2024", "Qty": 1, "Price": 11, "Side": "SELL"}),
        ]);
        let txs = normalize_rows(input, Platform::Unknown, &Settings::default());
        assert_eq!(txs[1].exec_time.to_rfc3339(), "2024-02-05T00:00:00+00:00");
    }
}
