//! Order ticket: what to send to the brokerage.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{OrderKind, OrderSide};

/// A single cash-equity order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTicket {
    /// Instrument code (6-digit KRX code).
    pub instrument: String,
    /// Buy or sell.
    pub side: OrderSide,
    /// Share count.
    pub quantity: u64,
    /// Limit price; ignored for market orders.
    pub price: Decimal,
    /// Limit or market.
    pub kind: OrderKind,
}

impl OrderTicket {
    /// Limit order.
    #[must_use]
    pub fn limit(instrument: impl Into<String>, side: OrderSide, quantity: u64, price: Decimal) -> Self {
        Self {
            instrument: instrument.into(),
            side,
            quantity,
            price,
            kind: OrderKind::Limit,
        }
    }

    /// Market order.
    #[must_use]
    pub fn market(instrument: impl Into<String>, side: OrderSide, quantity: u64) -> Self {
        Self {
            instrument: instrument.into(),
            side,
            quantity,
            price: Decimal::ZERO,
            kind: OrderKind::Market,
        }
    }

    /// Price as sent on the wire: whole won, `0` for market orders.
    #[must_use]
    pub fn wire_price(&self) -> Decimal {
        match self.kind {
            OrderKind::Market => Decimal::ZERO,
            OrderKind::Limit => self.price.trunc(),
        }
    }
}
