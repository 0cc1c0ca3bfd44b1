//! Manual order DTOs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::trading::{OrderKind, OrderSide, OrderTicket};

/// DTO for a manual order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceOrderDto {
    /// Instrument code.
    pub instrument: String,
    /// Buy or sell.
    pub side: OrderSide,
    /// Share count.
    pub quantity: u64,
    /// Limit price; ignored for market orders.
    #[serde(default)]
    pub price: Decimal,
    /// Limit or market.
    #[serde(default)]
    pub kind: OrderKind,
}

impl PlaceOrderDto {
    /// Convert to a domain ticket.
    #[must_use]
    pub fn to_ticket(&self) -> OrderTicket {
        match self.kind {
            OrderKind::Limit => {
                OrderTicket::limit(&self.instrument, self.side, self.quantity, self.price)
            }
            OrderKind::Market => OrderTicket::market(&self.instrument, self.side, self.quantity),
        }
    }
}
