use std::collections::{HashMap, VecDeque};

use models::{CompletedTrade, DateConfidence, RawTransaction, Side};
use tracing::debug;

const QTY_EPSILON: f64 = 1e-9;

/// Pairs BUY and SELL events FIFO per symbol into completed round-trip
/// trades. Legs with mismatched quantities are split: the consumed portion
/// forms the trade and the remainder stays in play with its commission
/// pro-rated by consumed fraction. Unmatched legs (a SELL with nothing
/// pending, a BUY still open at end of file) come out as one-sided trades,
/// so every input transaction is represented in the output.
pub fn match_trades(transactions: Vec<RawTransaction>) -> Vec<CompletedTrade> {
    let mut by_symbol: HashMap<String, Vec<RawTransaction>> = HashMap::new();
    let mut symbol_order: Vec<String> = Vec::new();
    for tx in transactions {
        if !by_symbol.contains_key(&tx.symbol) {
            symbol_order.push(tx.symbol.clone());
        }
        by_symbol.entry(tx.symbol.clone()).or_default().push(tx);
    }

    let mut completed = Vec::new();
    for symbol in symbol_order {
        let mut txs = by_symbol.remove(&symbol).unwrap_or_default();
        // stable sort: same-timestamp events keep their file order
        txs.sort_by_key(|tx| tx.exec_time);
        match_symbol(txs, &mut completed);
    }
    completed
}

struct OpenLeg {
    tx: RawTransaction,
    remaining: f64,
}

impl OpenLeg {
    fn new(tx: RawTransaction) -> Self {
        let remaining = tx.quantity;
        Self { tx, remaining }
    }

    // commission attributable to `quantity` units of this leg
    fn commission_for(&self, quantity: f64) -> f64 {
        if self.tx.quantity > QTY_EPSILON {
            self.tx.commission * quantity / self.tx.quantity
        } else {
            self.tx.commission
        }
    }

    // (price, true) when the leg supplies a fee-inclusive net price
    fn effective_price(&self) -> (f64, bool) {
        match self.tx.net_price {
            Some(net) if net > 0.0 => (net, true),
            _ => (self.tx.price, false),
        }
    }
}

fn match_symbol(txs: Vec<RawTransaction>, out: &mut Vec<CompletedTrade>) {
    let mut pending: VecDeque<OpenLeg> = VecDeque::new();

    for tx in txs {
        if tx.side == Side::Buy {
            pending.push_back(OpenLeg::new(tx));
            continue;
        }

        let mut sell = OpenLeg::new(tx);
        let mut consumed_any = false;
        while let Some(buy) = pending.front_mut() {
            let quantity = buy.remaining.min(sell.remaining);
            out.push(matched_trade(buy, &sell, quantity));
            consumed_any = true;
            buy.remaining -= quantity;
            sell.remaining -= quantity;
            if buy.remaining <= QTY_EPSILON {
                pending.pop_front();
            }
            if sell.remaining <= QTY_EPSILON {
                break;
            }
        }

        if !consumed_any || sell.remaining > QTY_EPSILON {
            // short sale, missing historical buy, or oversized sell surplus
            debug!(symbol = %sell.tx.symbol, quantity = sell.remaining, "unmatched SELL");
            out.push(unmatched_leg(&sell));
        }
    }

    // position still open at end of file
    for leg in &pending {
        debug!(symbol = %leg.tx.symbol, quantity = leg.remaining, "unmatched BUY");
        out.push(unmatched_leg(leg));
    }
}

fn matched_trade(buy: &OpenLeg, sell: &OpenLeg, quantity: f64) -> CompletedTrade {
    let (entry_price, entry_net) = buy.effective_price();
    let (exit_price, exit_net) = sell.effective_price();
    let commission = buy.commission_for(quantity) + sell.commission_for(quantity);

    let gross = (exit_price - entry_price) * quantity;
    // net prices already embed fees; only subtract commission when neither
    // leg supplies one
    let pnl = if entry_net || exit_net {
        gross
    } else {
        gross - commission
    };

    let date_confidence = if buy.tx.date_confidence == DateConfidence::Fallback
        || sell.tx.date_confidence == DateConfidence::Fallback
    {
        DateConfidence::Fallback
    } else {
        DateConfidence::Parsed
    };

    CompletedTrade {
        symbol: sell.tx.symbol.clone(),
        // a completed round trip is attributed to its entry
        side: Side::Buy,
        entry_price,
        exit_price,
        quantity,
        commission,
        pnl,
        // performance attribution uses the closing event
        trade_date: sell.tx.exec_time,
        platform: buy.tx.platform,
        instrument_type: buy.tx.instrument_type,
        date_confidence,
        buy_transaction: Some(buy.tx.clone()),
        sell_transaction: Some(sell.tx.clone()),
    }
}

fn unmatched_leg(leg: &OpenLeg) -> CompletedTrade {
    let (entry_price, exit_price) = match leg.tx.side {
        Side::Buy => (leg.tx.price, 0.0),
        Side::Sell => (0.0, leg.tx.price),
    };

    CompletedTrade {
        symbol: leg.tx.symbol.clone(),
        side: leg.tx.side,
        entry_price,
        exit_price,
        quantity: leg.remaining,
        commission: leg.commission_for(leg.remaining),
        // platform-reported figure; display fallback only, never recomputed
        pnl: leg.tx.pnl_hint,
        trade_date: leg.tx.exec_time,
        platform: leg.tx.platform,
        instrument_type: leg.tx.instrument_type,
        date_confidence: leg.tx.date_confidence,
        buy_transaction: (leg.tx.side == Side::Buy).then(|| leg.tx.clone()),
        sell_transaction: (leg.tx.side == Side::Sell).then(|| leg.tx.clone()),
    }
}
