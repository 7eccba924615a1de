//! Statistical insights computed from completed trade history. No machine
//! learning, no network calls: every figure here is plain arithmetic over
//! the rows handed in, and the same input always produces the same report.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use models::{
    DateConfidence, DayOfWeekStats, HoldingTimeAnalysis, Insights, OverallPerformance,
    RiskManagementScore, Side, SymbolStats, TimeOfDayStats, TimePatterns, TradeRecord,
    TransactionRecord,
};

const TIME_BUCKETS: [&str; 5] = [
    "Night (12AM-6AM)",
    "Morning (6AM-12PM)",
    "Afternoon (12PM-5PM)",
    "Evening (5PM-9PM)",
    "Late (9PM-12AM)",
];

const DAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

/// Computes the full insights report for a set of persisted trades.
///
/// `transactions` optionally supplies the individual buy/sell legs; when
/// present, time-pattern buckets key on each trade's exit execution time
/// and holding times are measured between real entry and exit timestamps.
/// Zero trades produce a fully populated, zeroed report. This function
/// never fails; minimum-sample policies belong to the calling layer.
pub fn calculate_insights(
    trades: &[TradeRecord],
    transactions: Option<&[TransactionRecord]>,
) -> Insights {
    if trades.is_empty() {
        return empty_insights();
    }

    let legs = index_legs(transactions);

    // Overall performance
    let winners: Vec<&TradeRecord> = trades.iter().filter(|t| t.pnl > 0.0).collect();
    let losers: Vec<&TradeRecord> = trades.iter().filter(|t| t.pnl < 0.0).collect();
    let total_pnl: f64 = trades.iter().map(|t| t.pnl).sum();
    let total_win_amount: f64 = winners.iter().map(|t| t.pnl).sum();
    let total_loss_amount: f64 = losers.iter().map(|t| t.pnl).sum::<f64>().abs();
    let win_rate = winners.len() as f64 / trades.len() as f64 * 100.0;
    let profit_factor = if total_loss_amount > 0.0 {
        total_win_amount / total_loss_amount
    } else {
        total_win_amount
    };
    let average_win = if winners.is_empty() {
        0.0
    } else {
        total_win_amount / winners.len() as f64
    };
    let average_loss = if losers.is_empty() {
        0.0
    } else {
        -(total_loss_amount / losers.len() as f64)
    };
    let largest_win = trades.iter().map(|t| t.pnl).fold(0.0, f64::max);
    let largest_loss = trades.iter().map(|t| t.pnl).fold(0.0, f64::min);

    // Time patterns, keyed on the exit leg's execution time when the legs
    // are known. Placeholder-dated trades would manufacture a fake
    // time-of-day edge, so they are left out of the buckets.
    let pattern_trades: Vec<(&TradeRecord, DateTime<Utc>)> = trades
        .iter()
        .filter(|t| t.date_confidence != DateConfidence::Fallback)
        .map(|t| (t, pattern_time(t, &legs)))
        .collect();

    let mut hour_pnls: HashMap<&'static str, Vec<f64>> = HashMap::new();
    let mut day_pnls: HashMap<&'static str, Vec<f64>> = HashMap::new();
    for (trade, ts) in &pattern_trades {
        hour_pnls.entry(hour_bucket(ts.hour())).or_default().push(trade.pnl);
        day_pnls.entry(day_name(ts.weekday())).or_default().push(trade.pnl);
    }

    let time_stats = bucket_stats(&TIME_BUCKETS, &hour_pnls);
    let (best_time, worst_time) = best_and_worst(&time_stats);
    let day_stats = bucket_stats(&DAY_NAMES, &day_pnls);
    let (best_day, worst_day) = best_and_worst(&day_stats);

    // Holding times need both legs' timestamps
    let winner_holds: Vec<f64> = winners.iter().filter_map(|t| hold_hours(t, &legs)).collect();
    let loser_holds: Vec<f64> = losers.iter().filter_map(|t| hold_hours(t, &legs)).collect();
    let avg_winner_hold = mean(&winner_holds);
    let avg_loser_hold = mean(&loser_holds);

    let insight = if winner_holds.is_empty() && loser_holds.is_empty() {
        "Not enough data".to_string()
    } else if avg_loser_hold > avg_winner_hold {
        "You hold losers longer than winners. Consider tighter stop losses.".to_string()
    } else if avg_winner_hold > avg_loser_hold {
        "You hold winners longer than losers. Good discipline on cutting losses.".to_string()
    } else {
        "Your hold times are balanced.".to_string()
    };

    // Risk management score: a rule-of-thumb heuristic, not a validated
    // risk model
    let large_drawdowns = trades
        .iter()
        .filter(|t| t.pnl < -(total_pnl.abs() * 0.1))
        .count();
    let mut score = 5i32;
    score += if win_rate > 50.0 { 2 } else { -1 };
    score += if profit_factor > 1.5 {
        2
    } else if profit_factor > 1.0 {
        1
    } else {
        -1
    };
    score += if large_drawdowns == 0 { 1 } else { -2 };
    let score = score.clamp(1, 10) as u8;

    let mut strengths = Vec::new();
    if profit_factor > 1.0 {
        strengths.push("Positive profit factor".to_string());
    }
    if win_rate > 45.0 {
        strengths.push("Win rate above 45%".to_string());
    }
    if large_drawdowns == 0 {
        strengths.push("No major drawdowns".to_string());
    }
    if strengths.is_empty() {
        strengths.push("Data available for analysis".to_string());
    }

    let mut weaknesses = Vec::new();
    if profit_factor < 1.0 {
        weaknesses.push("Negative profit factor".to_string());
    }
    if win_rate < 40.0 {
        weaknesses.push("Low win rate".to_string());
    }
    if large_drawdowns > 0 {
        weaknesses.push(format!("{} large drawdowns detected", large_drawdowns));
    }
    if avg_loser_hold > avg_winner_hold {
        weaknesses.push("Holding losers too long".to_string());
    }
    if weaknesses.is_empty() {
        weaknesses.push("No issues detected".to_string());
    }

    // Top symbols by total P&L
    let mut symbol_order: Vec<&str> = Vec::new();
    let mut by_symbol: HashMap<&str, Vec<f64>> = HashMap::new();
    for trade in trades {
        if !by_symbol.contains_key(trade.symbol.as_str()) {
            symbol_order.push(&trade.symbol);
        }
        by_symbol.entry(&trade.symbol).or_default().push(trade.pnl);
    }
    let mut top_symbols: Vec<SymbolStats> = symbol_order
        .iter()
        .map(|symbol| {
            let pnls = &by_symbol[symbol];
            SymbolStats {
                symbol: symbol.to_string(),
                trades: pnls.len(),
                win_rate: win_rate_of(pnls),
                total_pnl: pnls.iter().sum(),
            }
        })
        .collect();
    top_symbols.sort_by(|a, b| {
        b.total_pnl
            .partial_cmp(&a.total_pnl)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    top_symbols.truncate(5);

    Insights {
        overall_performance: OverallPerformance {
            total_trades: trades.len(),
            winners: winners.len(),
            losers: losers.len(),
            win_rate,
            total_pnl,
            profit_factor,
            average_win,
            average_loss,
            largest_win,
            largest_loss,
        },
        time_patterns: TimePatterns {
            best_time_of_day: TimeOfDayStats {
                time_range: best_time.0.clone(),
                win_rate: best_time.1,
                pnl: best_time.2,
            },
            worst_time_of_day: TimeOfDayStats {
                time_range: worst_time.0.clone(),
                win_rate: worst_time.1,
                pnl: worst_time.2,
            },
            best_day_of_week: DayOfWeekStats {
                day: best_day.0.clone(),
                win_rate: best_day.1,
                pnl: best_day.2,
            },
            worst_day_of_week: DayOfWeekStats {
                day: worst_day.0.clone(),
                win_rate: worst_day.1,
                pnl: worst_day.2,
            },
        },
        holding_time_analysis: HoldingTimeAnalysis {
            avg_winner_hold_time: format_hold_time(avg_winner_hold),
            avg_loser_hold_time: format_hold_time(avg_loser_hold),
            insight,
        },
        risk_management_score: RiskManagementScore {
            score,
            strengths,
            weaknesses,
        },
        top_symbols,
    }
}

fn empty_insights() -> Insights {
    let na_time = || TimeOfDayStats {
        time_range: "N/A".to_string(),
        win_rate: 0.0,
        pnl: 0.0,
    };
    let na_day = || DayOfWeekStats {
        day: "N/A".to_string(),
        win_rate: 0.0,
        pnl: 0.0,
    };
    Insights {
        overall_performance: OverallPerformance {
            total_trades: 0,
            winners: 0,
            losers: 0,
            win_rate: 0.0,
            total_pnl: 0.0,
            profit_factor: 0.0,
            average_win: 0.0,
            average_loss: 0.0,
            largest_win: 0.0,
            largest_loss: 0.0,
        },
        time_patterns: TimePatterns {
            best_time_of_day: na_time(),
            worst_time_of_day: na_time(),
            best_day_of_week: na_day(),
            worst_day_of_week: na_day(),
        },
        holding_time_analysis: HoldingTimeAnalysis {
            avg_winner_hold_time: "0h".to_string(),
            avg_loser_hold_time: "0h".to_string(),
            insight: "Not enough data".to_string(),
        },
        risk_management_score: RiskManagementScore {
            score: 0,
            strengths: Vec::new(),
            weaknesses: Vec::new(),
        },
        top_symbols: Vec::new(),
    }
}

fn index_legs(
    transactions: Option<&[TransactionRecord]>,
) -> HashMap<&str, Vec<&TransactionRecord>> {
    let mut index: HashMap<&str, Vec<&TransactionRecord>> = HashMap::new();
    if let Some(transactions) = transactions {
        for tx in transactions {
            index.entry(tx.trade_id.as_str()).or_default().push(tx);
        }
    }
    index
}

// The timestamp a trade's patterns key on: the chronologically last leg
// when legs are known, the persisted trade date otherwise.
fn pattern_time(trade: &TradeRecord, legs: &HashMap<&str, Vec<&TransactionRecord>>) -> DateTime<Utc> {
    legs.get(trade.id.as_str())
        .and_then(|txs| txs.iter().map(|tx| tx.exec_time).max())
        .unwrap_or(trade.trade_date)
}

// Hold time in hours, first BUY leg to last SELL leg.
fn hold_hours(trade: &TradeRecord, legs: &HashMap<&str, Vec<&TransactionRecord>>) -> Option<f64> {
    let txs = legs.get(trade.id.as_str())?;
    let entry = txs
        .iter()
        .filter(|tx| tx.side == Side::Buy)
        .map(|tx| tx.exec_time)
        .min()?;
    let exit = txs
        .iter()
        .filter(|tx| tx.side == Side::Sell)
        .map(|tx| tx.exec_time)
        .max()?;
    Some((exit - entry).num_seconds() as f64 / 3600.0)
}

fn hour_bucket(hour: u32) -> &'static str {
    if hour < 6 {
        TIME_BUCKETS[0]
    } else if hour < 12 {
        TIME_BUCKETS[1]
    } else if hour < 17 {
        TIME_BUCKETS[2]
    } else if hour < 21 {
        TIME_BUCKETS[3]
    } else {
        TIME_BUCKETS[4]
    }
}

fn day_name(weekday: Weekday) -> &'static str {
    DAY_NAMES[weekday.num_days_from_sunday() as usize]
}

// (label, win rate, total pnl) per non-empty bucket, in fixed label order
// so ties resolve deterministically.
fn bucket_stats(
    labels: &[&'static str],
    pnls: &HashMap<&'static str, Vec<f64>>,
) -> Vec<(String, f64, f64)> {
    labels
        .iter()
        .filter_map(|label| {
            pnls.get(label).map(|bucket| {
                (
                    label.to_string(),
                    win_rate_of(bucket),
                    bucket.iter().sum::<f64>(),
                )
            })
        })
        .collect()
}

// Best and worst bucket by total P&L, not win rate. Empty stats report
// "N/A" so callers never see an error.
fn best_and_worst(stats: &[(String, f64, f64)]) -> ((String, f64, f64), (String, f64, f64)) {
    let na = ("N/A".to_string(), 0.0, 0.0);
    let Some(first) = stats.first() else {
        return (na.clone(), na);
    };
    let mut best = first;
    let mut worst = first;
    for stat in &stats[1..] {
        if stat.2 > best.2 {
            best = stat;
        }
        if stat.2 < worst.2 {
            worst = stat;
        }
    }
    (best.clone(), worst.clone())
}

fn win_rate_of(pnls: &[f64]) -> f64 {
    if pnls.is_empty() {
        return 0.0;
    }
    pnls.iter().filter(|p| **p > 0.0).count() as f64 / pnls.len() as f64 * 100.0
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn format_hold_time(hours: f64) -> String {
    if hours < 1.0 {
        format!("{}m", (hours * 60.0).round() as i64)
    } else if hours < 24.0 {
        format!("{:.1}h", hours)
    } else {
        format!("{:.1}d", hours / 24.0)
    }
}
