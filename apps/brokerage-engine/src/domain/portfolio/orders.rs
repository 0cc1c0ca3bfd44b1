//! Order acknowledgements and order queries.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::trading::OrderSide;

/// Brokerage acknowledgement of an order request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderAck {
    /// Brokerage order number.
    pub order_no: String,
    /// Order time (`HHMMSS`), when reported.
    pub order_time: Option<String>,
    /// Brokerage message.
    pub message: String,
}

/// An order that can still be revised or cancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpenOrder {
    /// Brokerage order number.
    pub order_no: String,
    /// Order number this one revised, if any.
    pub original_order_no: Option<String>,
    /// Instrument code.
    pub instrument: String,
    /// Instrument name.
    pub name: String,
    /// Buy or sell, when reported.
    pub side: Option<OrderSide>,
    /// Ordered shares.
    pub quantity: u64,
    /// Order price.
    pub price: Decimal,
    /// Shares still revisable.
    pub open_quantity: u64,
}

/// An order with fills today.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutedOrder {
    /// Brokerage order number.
    pub order_no: String,
    /// Instrument code.
    pub instrument: String,
    /// Instrument name.
    pub name: String,
    /// Buy or sell, when reported.
    pub side: Option<OrderSide>,
    /// Ordered shares.
    pub quantity: u64,
    /// Filled shares.
    pub filled_quantity: u64,
    /// Average fill price.
    pub average_price: Decimal,
    /// Order time (`HHMMSS`).
    pub order_time: String,
}
