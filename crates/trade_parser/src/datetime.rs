use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use models::{DateConfidence, DateOrder};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::warn;

use crate::columns::value_str;

// Broker exports encode timestamps in wildly inconsistent ways: 2- and
// 4-digit years, slash and dash separators, day-first and month-first
// ordering, embedded or separate time fields, epoch integers, spelled-out
// month names. No single format covers that space, so parsing runs an
// ordered battery of pattern matchers and stops at the first one that both
// matches and yields a valid calendar date.

static SLASH_YY_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{2})\s+(\d{1,2}):(\d{2})(?::(\d{2}))?").unwrap()
});
static SLASH_YYYY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})(?:\s+(\d{1,2}):(\d{2})(?::(\d{2}))?)?").unwrap()
});
static ISO_8601: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(\d{4})-(\d{1,2})-(\d{1,2})(?:[T ](\d{1,2}):(\d{2})(?::(\d{2})(?:\.\d+)?)?)?(Z|[+-]\d{2}:?\d{2})?\s*$",
    )
    .unwrap()
});
static YEAR_FIRST_SLASH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4})/(\d{1,2})/(\d{1,2})(?:\s+(\d{1,2}):(\d{2})(?::(\d{2}))?)?").unwrap()
});
static DASH_NN_NN_YYYY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2})-(\d{1,2})-(\d{4})(?:\s+(\d{1,2}):(\d{2})(?::(\d{2}))?)?").unwrap()
});
static UNIX_EPOCH: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{9,14}$").unwrap());
static MONTH_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z]{3,9})\.?\s+(\d{1,2}),?\s+(\d{4})(?:\s+(\d{1,2}):(\d{2})(?::(\d{2}))?)?")
        .unwrap()
});
static NN_NN_YEAR_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})[/-](\d{1,2})[/-]\d{4}").unwrap());

const MONTH_PREFIXES: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// Resolves a date cell (plus an optional separate time cell) into a UTC
/// timestamp. Total failure degrades to the current time tagged
/// `Fallback` and logs a warning, preserving pipeline liveness at the cost
/// of mis-dating that row.
pub fn parse_exec_time(
    date: Option<&Value>,
    time: Option<&Value>,
    order: DateOrder,
) -> (DateTime<Utc>, DateConfidence) {
    let Some(date) = date else {
        warn!("row has no resolvable date field, using current time");
        return (Utc::now(), DateConfidence::Fallback);
    };

    let mut s = value_str(date).trim().to_string();
    if let Some(time) = time {
        let t = value_str(time).trim().to_string();
        // a time column that duplicates the date column adds nothing
        if !t.is_empty() && t != s {
            s = format!("{} {}", s, t);
        }
    }

    if s.is_empty() {
        warn!("row has an empty date field, using current time");
        return (Utc::now(), DateConfidence::Fallback);
    }

    match parse_timestamp(&s, order) {
        Some(parsed) => (parsed, DateConfidence::Parsed),
        None => {
            warn!(value = %s, "unparseable date, using current time");
            (Utc::now(), DateConfidence::Fallback)
        }
    }
}

/// The pattern battery itself, usable on an already-combined string.
pub fn parse_timestamp(s: &str, order: DateOrder) -> Option<DateTime<Utc>> {
    match_slash_two_digit_year(s)
        .or_else(|| match_slash_four_digit_year(s, order))
        .or_else(|| match_iso_8601(s))
        .or_else(|| match_year_first_slash(s))
        .or_else(|| match_dash_four_digit_year(s, order))
        .or_else(|| match_unix_epoch(s))
        .or_else(|| match_month_name(s))
        .or_else(|| match_generic(s))
}

/// Infers the day/month order for a whole file from a handful of sample
/// date strings: any sample with an out-of-range first or second number
/// locks the order for every row, otherwise the configured default stands.
pub fn infer_date_order(samples: &[String], default: DateOrder) -> DateOrder {
    for sample in samples {
        let Some(caps) = NN_NN_YEAR_PREFIX.captures(sample.trim()) else {
            continue;
        };
        let first: u32 = caps[1].parse().unwrap_or(0);
        let second: u32 = caps[2].parse().unwrap_or(0);
        if first > 12 && second <= 12 {
            return DateOrder::DayFirst;
        }
        if second > 12 && first <= 12 {
            return DateOrder::MonthFirst;
        }
    }
    default
}

// MM/DD/YY HH:MM[:SS], the desk-platform style. Two-digit years window at
// 30: 24 -> 2024, 99 -> 1999.
fn match_slash_two_digit_year(s: &str) -> Option<DateTime<Utc>> {
    let caps = SLASH_YY_TIME.captures(s)?;
    let month: u32 = caps[1].parse().ok()?;
    let day: u32 = caps[2].parse().ok()?;
    let short_year: i32 = caps[3].parse().ok()?;
    let year = if short_year < 30 {
        2000 + short_year
    } else {
        1900 + short_year
    };
    let (hour, minute, second) = captured_time(&caps, 4);
    utc_datetime(year, month, day, hour, minute, second)
}

// NN/NN/YYYY with optional time. If either number exceeds 12 the ordering
// is forced; the genuinely ambiguous case follows the configured order.
fn match_slash_four_digit_year(s: &str, order: DateOrder) -> Option<DateTime<Utc>> {
    let caps = SLASH_YYYY.captures(s)?;
    let first: u32 = caps[1].parse().ok()?;
    let second: u32 = caps[2].parse().ok()?;
    let year: i32 = caps[3].parse().ok()?;
    let (month, day) = resolve_day_month(first, second, order);
    let (hour, minute, sec) = captured_time(&caps, 4);
    utc_datetime(year, month, day, hour, minute, sec)
}

fn match_iso_8601(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(s) {
        return Some(parsed.with_timezone(&Utc));
    }

    let caps = ISO_8601.captures(s)?;
    let year: i32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let day: u32 = caps[3].parse().ok()?;
    let (hour, minute, sec) = captured_time(&caps, 4);
    let mut parsed = utc_datetime(year, month, day, hour, minute, sec)?;

    // explicit offsets not already handled by the RFC 3339 path ("+0500")
    if let Some(offset) = caps.get(7).map(|m| m.as_str()).filter(|o| *o != "Z") {
        let sign: i64 = if offset.starts_with('-') { -1 } else { 1 };
        let digits: String = offset.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.len() == 4 {
            let hours: i64 = digits[..2].parse().ok()?;
            let minutes: i64 = digits[2..].parse().ok()?;
            parsed -= Duration::minutes(sign * (hours * 60 + minutes));
        }
    }
    Some(parsed)
}

fn match_year_first_slash(s: &str) -> Option<DateTime<Utc>> {
    let caps = YEAR_FIRST_SLASH.captures(s)?;
    let year: i32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let day: u32 = caps[3].parse().ok()?;
    let (hour, minute, sec) = captured_time(&caps, 4);
    utc_datetime(year, month, day, hour, minute, sec)
}

// NN-NN-YYYY, same disambiguation rules as the slash form.
fn match_dash_four_digit_year(s: &str, order: DateOrder) -> Option<DateTime<Utc>> {
    let caps = DASH_NN_NN_YYYY.captures(s)?;
    let first: u32 = caps[1].parse().ok()?;
    let second: u32 = caps[2].parse().ok()?;
    let year: i32 = caps[3].parse().ok()?;
    let (month, day) = resolve_day_month(first, second, order);
    let (hour, minute, sec) = captured_time(&caps, 4);
    utc_datetime(year, month, day, hour, minute, sec)
}

// Bare integer strings: more than ten digits means milliseconds since
// epoch, otherwise seconds.
fn match_unix_epoch(s: &str) -> Option<DateTime<Utc>> {
    if !UNIX_EPOCH.is_match(s) {
        return None;
    }
    if s.len() > 10 {
        let millis: i64 = s.parse().ok()?;
        Utc.timestamp_millis_opt(millis).single()
    } else {
        let secs: i64 = s.parse().ok()?;
        Utc.timestamp_opt(secs, 0).single()
    }
}

// "January 15, 2024" and friends, matched on a three-letter month prefix.
fn match_month_name(s: &str) -> Option<DateTime<Utc>> {
    let caps = MONTH_NAME.captures(s)?;
    let month = month_from_name(&caps[1])?;
    let day: u32 = caps[2].parse().ok()?;
    let year: i32 = caps[3].parse().ok()?;
    let (hour, minute, sec) = captured_time(&caps, 4);
    utc_datetime(year, month, day, hour, minute, sec)
}

// Last resort before giving up: the formats chrono can take directly.
fn match_generic(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc2822(s) {
        return Some(parsed.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y%m%d %H:%M:%S"] {
        if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    for fmt in ["%Y-%m-%d", "%Y%m%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
        }
    }
    None
}

fn resolve_day_month(first: u32, second: u32, order: DateOrder) -> (u32, u32) {
    // returns (month, day); a number above 12 can only be a day
    if first > 12 {
        (second, first)
    } else if second > 12 {
        (first, second)
    } else {
        match order {
            DateOrder::MonthFirst => (first, second),
            DateOrder::DayFirst => (second, first),
        }
    }
}

fn captured_time(caps: &regex::Captures<'_>, start: usize) -> (u32, u32, u32) {
    let part = |i: usize| {
        caps.get(start + i)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0)
    };
    (part(0), part(1), part(2))
}

fn utc_datetime(
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
) -> Option<DateTime<Utc>> {
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let naive = date.and_hms_opt(hour, minute, second)?;
    Some(Utc.from_utc_datetime(&naive))
}

fn month_from_name(name: &str) -> Option<u32> {
    let lower = name.to_lowercase();
    MONTH_PREFIXES
        .iter()
        .position(|prefix| lower.starts_with(prefix))
        .map(|i| i as u32 + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ts(s: &str) -> DateTime<Utc> {
        parse_timestamp(s, DateOrder::MonthFirst).unwrap()
    }

    #[test]
    fn test_two_digit_year_with_time() {
        assert_eq!(ts("01/15/24 09:31:00").to_rfc3339(), "2024-01-15T09:31:00+00:00");
        // years at or above the window are 1900s
        assert_eq!(ts("12/31/99 23:59").to_rfc3339(), "1999-12-31T23:59:00+00:00");
    }

    #[test]
    fn test_four_digit_year_with_optional_time() {
        assert_eq!(ts("01/15/2024").to_rfc3339(), "2024-01-15T00:00:00+00:00");
        assert_eq!(ts("1/5/2024 9:07").to_rfc3339(), "2024-01-05T09:07:00+00:00");
    }

    #[test]
    fn test_unambiguous_day_first_always_wins() {
        // day 13 cannot be a month, whatever the configured order says
        for order in [DateOrder::MonthFirst, DateOrder::DayFirst] {
            let parsed = parse_timestamp("13/01/2024 09:30", order).unwrap();
            assert_eq!(parsed.to_rfc3339(), "2024-01-13T09:30:00+00:00");
        }
    }

    #[test]
    fn test_ambiguous_date_follows_configured_order() {
        let us = parse_timestamp("02/03/2024", DateOrder::MonthFirst).unwrap();
        assert_eq!(us.to_rfc3339(), "2024-02-03T00:00:00+00:00");
        let intl = parse_timestamp("02/03/2024", DateOrder::DayFirst).unwrap();
        assert_eq!(intl.to_rfc3339(), "2024-03-02T00:00:00+00:00");
    }

    #[test]
    fn test_iso_8601_variants() {
        assert_eq!(ts("2024-01-15").to_rfc3339(), "2024-01-15T00:00:00+00:00");
        assert_eq!(ts("2024-01-15T09:30:00Z").to_rfc3339(), "2024-01-15T09:30:00+00:00");
        assert_eq!(
            ts("2024-01-15T09:30:00-05:00").to_rfc3339(),
            "2024-01-15T14:30:00+00:00"
        );
        assert_eq!(ts("2024-01-15 09:30:00").to_rfc3339(), "2024-01-15T09:30:00+00:00");
    }

    #[test]
    fn test_year_first_slash() {
        assert_eq!(ts("2024/01/15 09:30").to_rfc3339(), "2024-01-15T09:30:00+00:00");
    }

    #[test]
    fn test_dash_separated() {
        assert_eq!(ts("01-15-2024 09:30").to_rfc3339(), "2024-01-15T09:30:00+00:00");
        assert_eq!(ts("15-01-2024").to_rfc3339(), "2024-01-15T00:00:00+00:00");
    }

    #[test]
    fn test_unix_epoch_seconds_and_millis() {
        assert_eq!(ts("1705315800").to_rfc3339(), "2024-01-15T10:50:00+00:00");
        assert_eq!(ts("1705315800000").to_rfc3339(), "2024-01-15T10:50:00+00:00");
    }

    #[test]
    fn test_month_names() {
        assert_eq!(ts("January 15, 2024").to_rfc3339(), "2024-01-15T00:00:00+00:00");
        assert_eq!(ts("Sep 3 2024").to_rfc3339(), "2024-09-03T00:00:00+00:00");
    }

    #[test]
    fn test_invalid_calendar_date_falls_through() {
        // 13/13 matches the slash pattern shape but is not a real date
        assert!(parse_timestamp("13/13/2024", DateOrder::MonthFirst).is_none());
        assert!(parse_timestamp("02/30/2024", DateOrder::MonthFirst).is_none());
    }

    #[test]
    fn test_unparseable_degrades_to_fallback_now() {
        let (_, confidence) =
            parse_exec_time(Some(&json!("not a date")), None, DateOrder::MonthFirst);
        assert_eq!(confidence, DateConfidence::Fallback);
        let (_, confidence) = parse_exec_time(None, None, DateOrder::MonthFirst);
        assert_eq!(confidence, DateConfidence::Fallback);
    }

    #[test]
    fn test_separate_time_column_is_combined() {
        let (parsed, confidence) = parse_exec_time(
            Some(&json!("01/15/2024")),
            Some(&json!("09:30")),
            DateOrder::MonthFirst,
        );
        assert_eq!(confidence, DateConfidence::Parsed);
        assert_eq!(parsed.to_rfc3339(), "2024-01-15T09:30:00+00:00");
    }

    #[test]
    fn test_duplicate_time_column_is_ignored() {
        let (parsed, _) = parse_exec_time(
            Some(&json!("01/15/24 09:30:00")),
            Some(&json!("01/15/24 09:30:00")),
            DateOrder::MonthFirst,
        );
        assert_eq!(parsed.to_rfc3339(), "2024-01-15T09:30:00+00:00");
    }

    #[test]
    fn test_infer_date_order_from_samples() {
        let day_first = vec!["25/01/2024".to_string(), "03/02/2024".to_string()];
        assert_eq!(
            infer_date_order(&day_first, DateOrder::MonthFirst),
            DateOrder::DayFirst
        );

        let month_first = vec!["01/25/2024".to_string()];
        assert_eq!(
            infer_date_order(&month_first, DateOrder::DayFirst),
            DateOrder::MonthFirst
        );

        let ambiguous = vec!["02/03/2024".to_string()];
        assert_eq!(
            infer_date_order(&ambiguous, DateOrder::DayFirst),
            DateOrder::DayFirst
        );
    }
}
