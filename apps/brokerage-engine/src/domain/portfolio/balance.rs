//! Quotes and account balance.

use rust_decimal::Decimal;
use serde::Serialize;

/// Current quote of one instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Quote {
    /// Instrument code.
    pub instrument: String,
    /// Last trade price.
    pub price: Decimal,
    /// Change versus previous close.
    pub change: Decimal,
    /// Change rate in percent.
    pub change_rate: Decimal,
}

/// One holding line.
///
/// The `current_*` fields come from a separate quote lookup and stay empty
/// when that lookup fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Holding {
    /// Instrument code.
    pub instrument: String,
    /// Instrument name.
    pub name: String,
    /// Shares held.
    pub quantity: u64,
    /// Average purchase price.
    pub average_price: Decimal,
    /// Total purchase amount.
    pub purchase_amount: Decimal,
    /// Evaluation at the brokerage's price.
    pub evaluation_amount: Decimal,
    /// Unrealized profit or loss.
    pub profit_loss: Decimal,
    /// Unrealized profit or loss rate in percent.
    pub profit_loss_rate: Decimal,
    /// Live price.
    pub current_price: Option<Decimal>,
    /// Live change versus previous close.
    pub change: Option<Decimal>,
    /// Live change rate in percent.
    pub change_rate: Option<Decimal>,
}

impl Holding {
    /// Fill the live quote fields.
    pub fn enrich(&mut self, quote: &Quote) {
        self.current_price = Some(quote.price);
        self.change = Some(quote.change);
        self.change_rate = Some(quote.change_rate);
    }
}

/// Account totals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BalanceSummary {
    /// Total evaluation (stocks + cash).
    pub total_asset: Decimal,
    /// Stock evaluation.
    pub stock_evaluation: Decimal,
    /// Deposit.
    pub cash: Decimal,
    /// Total unrealized profit or loss.
    pub total_profit_loss: Decimal,
    /// Total purchase amount.
    pub purchase_amount: Decimal,
}

/// Holdings and totals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Balance {
    /// Holding lines.
    pub holdings: Vec<Holding>,
    /// Account totals; absent when the brokerage returns none.
    pub summary: Option<BalanceSummary>,
}
