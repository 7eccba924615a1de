use serde_json::{Map, Value};

// Canonical field taxonomy -> known column aliases, collected from the
// export formats of the supported platforms. Adding a broker format is a
// one-line change here, not a new code path.
pub const DATE: &[&str] = &[
    "date",
    "trade_date",
    "exec time",
    "datetime",
    "order_time",
    "order created_at",
    "transaction_date",
    "entry_date",
    "timestamp",
];
pub const TIME: &[&str] = &["time", "exec time", "order_time", "datetime"];
pub const SYMBOL: &[&str] = &[
    "symbol",
    "ticker",
    "ticker_symbol",
    "stock",
    "underlying",
    "chain_symbol",
];
pub const SIDE: &[&str] = &[
    "side",
    "action",
    "b/s",
    "type",
    "direction",
    "order_type",
    "action_type",
];
pub const QUANTITY: &[&str] = &[
    "quantity",
    "qty",
    "filled_qty",
    "shares",
    "contracts",
    "order_quantity",
    "processed_quantity",
];
pub const PRICE: &[&str] = &[
    "price",
    "filled_price",
    "exec_price",
    "average_price",
    "net price",
    "t. price",
    "c. price",
];
pub const NET_PRICE: &[&str] = &["net price", "net_price", "adjusted_price"];
pub const COMMISSION: &[&str] = &["commission", "comm", "fees", "comm/fee", "fee"];
pub const PNL: &[&str] = &[
    "pnl",
    "realized_pnl",
    "realized p/l",
    "net_amount",
    "proceeds",
    "amount",
    "mtm p/l",
];
pub const DESCRIPTION: &[&str] = &["description", "notes"];
pub const STRIKE: &[&str] = &["strike", "strike_price"];
pub const EXPIRATION: &[&str] = &["expiration", "expiration_date", "exp"];

/// Resolves the first non-empty value in `row` whose column name matches one
/// of `aliases`. The first pass compares trimmed names case-insensitively,
/// in row column order; the second pass retries with internal whitespace
/// collapsed on both sides, tolerating platforms that pad their headers.
/// Returns None when nothing matches; callers treat that as "use the
/// default", never as an error.
pub fn find_field<'a>(row: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
    for (key, value) in row {
        let lower_key = key.trim().to_lowercase();
        for alias in aliases {
            if lower_key == alias.trim().to_lowercase() && !is_empty_value(value) {
                return Some(value);
            }
        }
    }

    for alias in aliases {
        let collapsed_alias = trim_midspaces(&alias.to_lowercase());
        for (key, value) in row {
            if trim_midspaces(&key.to_lowercase()) == collapsed_alias && !is_empty_value(value) {
                return Some(value);
            }
        }
    }

    None
}

/// Renders a cell the way it would appear in the source file.
pub fn value_str(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => value.to_string(),
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn trim_midspaces(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_exact_case_insensitive_match() {
        let row = row(json!({"Symbol": "AAPL", "Qty": 10}));
        assert_eq!(find_field(&row, SYMBOL), Some(&json!("AAPL")));
        assert_eq!(find_field(&row, QUANTITY), Some(&json!(10)));
    }

    #[test]
    fn test_collapsed_whitespace_fallback() {
        let row = row(json!({"Exec  Time": "01/15/24 09:30:00"}));
        assert_eq!(find_field(&row, DATE), Some(&json!("01/15/24 09:30:00")));
    }

    #[test]
    fn test_empty_values_are_skipped() {
        let row = row(json!({"symbol": "  ", "ticker": "MSFT"}));
        assert_eq!(find_field(&row, SYMBOL), Some(&json!("MSFT")));
    }

    #[test]
    fn test_no_alias_matches() {
        let row = row(json!({"unrelated": "x"}));
        assert_eq!(find_field(&row, SYMBOL), None);
    }

    #[test]
    fn test_row_order_wins_over_alias_order() {
        // "ticker" appears before "symbol" in the row, so it resolves first
        // even though "symbol" leads the alias list
        let row = row(json!({"Ticker": "TSLA", "Symbol": "AAPL"}));
        assert_eq!(find_field(&row, SYMBOL), Some(&json!("TSLA")));
    }
}
