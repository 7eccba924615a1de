use models::Platform;

/// Fingerprints the producing platform from the header row. Signatures are
/// header-substring combinations tested in order: more specific ones come
/// before generic ones, and the first hit wins. Detection is informational;
/// an Unknown platform still parses.
pub fn detect_platform(headers: &[String]) -> Platform {
    let header_str = headers.join("|").to_lowercase();
    let has = |needle: &str| header_str.contains(needle);

    if has("exec time") && has("pos effect") {
        return Platform::ThinkOrSwim;
    }
    if has("t. price") && has("c. price") && has("flex") {
        return Platform::InteractiveBrokers;
    }
    if has("chain_symbol") && has("opening_strategy") {
        return Platform::Robinhood;
    }
    if has("order_time") && has("filled_qty") {
        return Platform::Webull;
    }
    if has("transaction date") && has("pos effect") {
        return Platform::ETrade;
    }
    if has("datetime") && has("quantity") && has("proceeds") {
        return Platform::TradeStation;
    }

    Platform::Unknown
}
