//! Broker Port (Driven Port)
//!
//! Interface for the brokerage gateway. Adapters implement this for a
//! specific brokerage API.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;

use super::session_port::SessionError;
use crate::domain::portfolio::{Balance, ExecutedOrder, OpenOrder, OrderAck, Quote};
use crate::domain::shared::AccountId;
use crate::domain::trading::{OrderKind, OrderTicket, RevisionKind};

/// Request to revise or cancel an open order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RevisionRequest {
    /// Brokerage number of the order being changed.
    pub original_order_no: String,
    /// Revise or cancel.
    pub kind: RevisionKind,
    /// Pricing of the revised order.
    #[serde(default)]
    pub order_kind: OrderKind,
    /// New (or cancelled) share count; ignored when `all` is set.
    #[serde(default)]
    pub quantity: u64,
    /// New price; ignored for cancels.
    #[serde(default)]
    pub price: Decimal,
    /// Apply to the whole remaining quantity.
    #[serde(default)]
    pub all: bool,
}

impl RevisionRequest {
    /// Quantity and price as sent on the wire. A full cancel sends zeros and
    /// a market revision sends a zero price.
    #[must_use]
    pub fn wire_quantity_and_price(&self) -> (u64, Decimal) {
        if self.kind == RevisionKind::Cancel && self.all {
            return (0, Decimal::ZERO);
        }
        let price = match self.order_kind {
            OrderKind::Market => Decimal::ZERO,
            OrderKind::Limit => self.price.trunc(),
        };
        (self.quantity, price)
    }

    /// Cancel everything still open on `order_no`.
    #[must_use]
    pub fn cancel_all(order_no: impl Into<String>) -> Self {
        Self {
            original_order_no: order_no.into(),
            kind: RevisionKind::Cancel,
            order_kind: OrderKind::Limit,
            quantity: 0,
            price: Decimal::ZERO,
            all: true,
        }
    }

    /// Change quantity and price of `order_no`.
    #[must_use]
    pub fn revise(order_no: impl Into<String>, quantity: u64, price: Decimal) -> Self {
        Self {
            original_order_no: order_no.into(),
            kind: RevisionKind::Revise,
            order_kind: OrderKind::Limit,
            quantity,
            price,
            all: false,
        }
    }
}

/// Gateway failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// The brokerage refused the request, either with a non-success result
    /// code on HTTP 200 or with an HTTP error.
    #[error("broker request failed [{code}]: {message}")]
    BrokerRequestFailed {
        /// HTTP status, when the failure was an HTTP error.
        status: Option<u16>,
        /// Brokerage code (or HTTP status code as text).
        code: String,
        /// Brokerage message (or HTTP reason text).
        message: String,
    },

    /// No usable token could be obtained.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Network failure before a response arrived.
    #[error("transport error: {0}")]
    Transport(String),

    /// Success response body could not be understood.
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl GatewayError {
    /// Message suitable for attempt logs and user-facing errors.
    #[must_use]
    pub fn broker_message(&self) -> String {
        match self {
            Self::BrokerRequestFailed { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Brokerage gateway.
///
/// Every call obtains a usable token first and never retries on its own.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BrokerPort: Send + Sync {
    /// Holdings and account totals, holdings enriched with live quotes.
    async fn get_balance(&self, account: &AccountId) -> Result<Balance, GatewayError>;

    /// Current quote of one instrument.
    async fn get_quote(&self, account: &AccountId, instrument: &str)
    -> Result<Quote, GatewayError>;

    /// Place a cash order.
    async fn place_order(
        &self,
        account: &AccountId,
        ticket: &OrderTicket,
    ) -> Result<OrderAck, GatewayError>;

    /// Revise or cancel an open order.
    async fn revise_or_cancel_order(
        &self,
        account: &AccountId,
        request: &RevisionRequest,
    ) -> Result<OrderAck, GatewayError>;

    /// Orders that can still be revised or cancelled.
    async fn get_unfilled_orders(&self, account: &AccountId)
    -> Result<Vec<OpenOrder>, GatewayError>;

    /// Today's orders with fills.
    async fn get_executed_orders(
        &self,
        account: &AccountId,
    ) -> Result<Vec<ExecutedOrder>, GatewayError>;

    /// Handshake key for the real-time stream.
    async fn get_approval_key(&self, account: &AccountId) -> Result<String, GatewayError>;
}
