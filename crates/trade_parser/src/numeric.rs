use models::Side;
use serde_json::Value;

use crate::columns::value_str;

/// Converts a cell into a signed float. Currency symbols, thousands
/// separators and stray whitespace are stripped; accounting-style
/// parentheses negate the value. Unparseable or missing input yields 0 —
/// this function never fails and never returns NaN.
pub fn parse_numeric(value: Option<&Value>) -> f64 {
    let Some(value) = value else {
        return 0.0;
    };

    if let Value::Number(n) = value {
        return n.as_f64().filter(|v| v.is_finite()).unwrap_or(0.0);
    }

    let raw = value_str(value);
    let compact: String = raw
        .chars()
        .filter(|c| !matches!(c, '$' | '€' | '£' | ',') && !c.is_whitespace())
        .collect();
    if compact.is_empty() {
        return 0.0;
    }

    let (digits, negative) = match compact
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
    {
        Some(inner) => (inner, true),
        None => (compact.as_str(), false),
    };

    match digits.parse::<f64>() {
        Ok(v) if v.is_finite() => {
            if negative {
                -v
            } else {
                v
            }
        }
        _ => 0.0,
    }
}

/// Resolves an action/direction cell to a side. Unrecognized or missing
/// values default to BUY.
pub fn parse_side(value: Option<&Value>) -> Side {
    let Some(value) = value else {
        return Side::Buy;
    };
    let s = value_str(value).trim().to_uppercase();
    if s.contains("SELL") || s.contains("SHORT") || s == "S" {
        return Side::Sell;
    }
    if s.contains("BUY") || s.contains("LONG") || s == "B" {
        return Side::Buy;
    }
    Side::Buy
}
