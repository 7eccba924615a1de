use models::InstrumentType;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::columns::{self, find_field};

// Substrings that mark a crypto instrument. Checked before the forex shape
// so pairs like BTCUSD classify as crypto.
const CRYPTO_TICKERS: &[&str] = &[
    "BTC", "ETH", "SOL", "ADA", "DOGE", "XRP", "LTC", "BNB", "SHIB",
];

// Futures root + exchange month code + year digits, e.g. ESZ4 or CLM25.
static FUTURES_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{1,3}[FGHJKMNQUVXZ]\d{1,2}$").unwrap());

/// Heuristic instrument classification from the symbol shape and the
/// presence of option-specific columns. Checked in order: option, crypto,
/// forex, futures, stock.
pub fn classify_instrument(symbol: &str, row: &Map<String, Value>) -> InstrumentType {
    if find_field(row, columns::STRIKE).is_some() || find_field(row, columns::EXPIRATION).is_some()
    {
        return InstrumentType::Option;
    }
    if CRYPTO_TICKERS.iter().any(|ticker| symbol.contains(ticker)) {
        return InstrumentType::Crypto;
    }
    if symbol.len() == 6 && symbol.chars().all(|c| c.is_ascii_uppercase()) {
        return InstrumentType::Forex;
    }
    if symbol.starts_with('/') || FUTURES_CODE.is_match(symbol) {
        return InstrumentType::Futures;
    }
    InstrumentType::Stock
}
