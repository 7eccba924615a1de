use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// Transaction direction. Free-text action columns ("Buy to Open", "S",
// "SHORT") are resolved to this closed enum during ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    #[serde(rename = "BUY")]
    Buy,
    #[serde(rename = "SELL")]
    Sell,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

// Source platform, fingerprinted from column headers. Informational only:
// parsing never hard-depends on a correct detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Platform {
    #[serde(rename = "ThinkorSwim")]
    ThinkOrSwim,
    InteractiveBrokers,
    Robinhood,
    Webull,
    ETrade,
    TradeStation,
    #[default]
    Unknown,
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Platform::ThinkOrSwim => "ThinkorSwim",
            Platform::InteractiveBrokers => "InteractiveBrokers",
            Platform::Robinhood => "Robinhood",
            Platform::Webull => "Webull",
            Platform::ETrade => "ETrade",
            Platform::TradeStation => "TradeStation",
            Platform::Unknown => "Unknown",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstrumentType {
    #[default]
    Stock,
    Option,
    Futures,
    Forex,
    Crypto,
}

// Whether an execution timestamp came out of an actual date pattern or is
// the "now" placeholder for an unparseable source value. Downstream
// time-pattern analysis uses this to skip placeholder-dated rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateConfidence {
    #[default]
    Parsed,
    Fallback,
}

// Convention used for ambiguous NN/NN/YYYY dates where neither number
// exceeds 12.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateOrder {
    #[default]
    MonthFirst,
    DayFirst,
}

// Runtime configuration, loaded from settings.json by settings_loader.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub date_order: DateOrder,
    pub require_quantity: bool,
    pub min_trades_for_insights: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            date_order: DateOrder::MonthFirst,
            require_quantity: false,
            min_trades_for_insights: 5,
        }
    }
}

// One normalized row from an uploaded export: a single BUY or SELL event,
// not yet paired into a round-trip trade. `raw` keeps the original row
// (source column order preserved) for audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTransaction {
    pub symbol: String,
    pub side: Side,
    pub quantity: f64,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub net_price: Option<f64>,
    pub commission: f64,
    pub pnl_hint: f64,
    pub exec_time: DateTime<Utc>,
    #[serde(default)]
    pub date_confidence: DateConfidence,
    #[serde(default)]
    pub platform: Platform,
    #[serde(default)]
    pub instrument_type: InstrumentType,
    #[serde(default)]
    pub raw: Map<String, Value>,
}

// A matched BUY/SELL pair, or a one-sided leftover (unmatched SELL, or a
// BUY still open at end of file). Leftovers keep side = their own side and
// a zero price on the missing leg; no transaction is ever dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedTrade {
    pub symbol: String,
    pub side: Side,
    pub entry_price: f64,
    pub exit_price: f64,
    pub quantity: f64,
    pub commission: f64,
    pub pnl: f64,
    pub trade_date: DateTime<Utc>,
    #[serde(default)]
    pub platform: Platform,
    #[serde(default)]
    pub instrument_type: InstrumentType,
    #[serde(default)]
    pub date_confidence: DateConfidence,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buy_transaction: Option<RawTransaction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sell_transaction: Option<RawTransaction>,
}

impl CompletedTrade {
    /// True when both legs are present.
    pub fn is_matched(&self) -> bool {
        self.buy_transaction.is_some() && self.sell_transaction.is_some()
    }

    /// The storage-shaped trade row handed to the persistence collaborator.
    pub fn to_record(&self, id: impl Into<String>) -> TradeRecord {
        TradeRecord {
            id: id.into(),
            symbol: self.symbol.clone(),
            entry_price: self.entry_price,
            exit_price: self.exit_price,
            pnl: self.pnl,
            trade_date: self.trade_date,
            quantity: self.quantity,
            side: self.side,
            date_confidence: self.date_confidence,
        }
    }

    /// Per-leg transaction rows for the same trade id, in BUY, SELL order.
    pub fn leg_records(&self, trade_id: &str) -> Vec<TransactionRecord> {
        let mut legs = Vec::new();
        if let Some(buy) = &self.buy_transaction {
            legs.push(leg_record(buy, trade_id, "buy"));
        }
        if let Some(sell) = &self.sell_transaction {
            legs.push(leg_record(sell, trade_id, "sell"));
        }
        legs
    }
}

fn leg_record(tx: &RawTransaction, trade_id: &str, suffix: &str) -> TransactionRecord {
    TransactionRecord {
        id: format!("{}-{}", trade_id, suffix),
        trade_id: trade_id.to_string(),
        symbol: tx.symbol.clone(),
        side: tx.side,
        quantity: tx.quantity,
        price: tx.price,
        net_price: tx.net_price,
        commission: tx.commission,
        exec_time: tx.exec_time,
        date_confidence: tx.date_confidence,
    }
}

// Minimal persisted trade row, as read back from storage for insights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub id: String,
    pub symbol: String,
    pub entry_price: f64,
    pub exit_price: f64,
    pub pnl: f64,
    pub trade_date: DateTime<Utc>,
    pub quantity: f64,
    pub side: Side,
    #[serde(default)]
    pub date_confidence: DateConfidence,
}

// Minimal persisted per-leg row. Optional input to the insights engine;
// when present it supplies real entry/exit execution times.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: String,
    pub trade_id: String,
    pub symbol: String,
    pub side: Side,
    pub quantity: f64,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub net_price: Option<f64>,
    pub commission: f64,
    pub exec_time: DateTime<Utc>,
    #[serde(default)]
    pub date_confidence: DateConfidence,
}

// Insights report models

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverallPerformance {
    pub total_trades: usize,
    pub winners: usize,
    pub losers: usize,
    pub win_rate: f64,
    pub total_pnl: f64,
    pub profit_factor: f64,
    pub average_win: f64,
    pub average_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeOfDayStats {
    pub time_range: String,
    pub win_rate: f64,
    pub pnl: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayOfWeekStats {
    pub day: String,
    pub win_rate: f64,
    pub pnl: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimePatterns {
    pub best_time_of_day: TimeOfDayStats,
    pub worst_time_of_day: TimeOfDayStats,
    pub best_day_of_week: DayOfWeekStats,
    pub worst_day_of_week: DayOfWeekStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoldingTimeAnalysis {
    pub avg_winner_hold_time: String,
    pub avg_loser_hold_time: String,
    pub insight: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskManagementScore {
    pub score: u8,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolStats {
    pub symbol: String,
    pub trades: usize,
    pub win_rate: f64,
    pub total_pnl: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insights {
    pub overall_performance: OverallPerformance,
    pub time_patterns: TimePatterns,
    pub holding_time_analysis: HoldingTimeAnalysis,
    pub risk_management_score: RiskManagementScore,
    pub top_symbols: Vec<SymbolStats>,
}
