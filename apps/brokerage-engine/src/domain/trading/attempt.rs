//! Execution attempt records.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

use super::{OrderSide, OrderTicket};
use crate::domain::shared::{AccountId, PlanId};

/// Who originated an order attempt.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttemptSource {
    /// A scheduled order plan.
    Plan(PlanId),
    /// An ad-hoc request.
    Manual,
}

impl AttemptSource {
    /// Whether this attempt belongs to `plan`.
    #[must_use]
    pub fn is_plan(&self, plan: &PlanId) -> bool {
        matches!(self, Self::Plan(id) if id == plan)
    }
}

impl fmt::Display for AttemptSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plan(id) => write!(f, "scheduled_{id}"),
            Self::Manual => f.write_str("manual"),
        }
    }
}

impl Serialize for AttemptSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Outcome reported by the brokerage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttemptOutcome {
    /// Order accepted.
    Success,
    /// Order rejected or request failed.
    Failed,
}

/// Immutable log line for one order try.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionAttempt {
    /// Plan tag or `manual`.
    pub source: AttemptSource,
    /// Account the order was sent for.
    pub account_id: AccountId,
    /// Instrument code.
    pub instrument: String,
    /// Buy or sell.
    pub side: OrderSide,
    /// Order price.
    pub price: Decimal,
    /// Share count.
    pub quantity: u64,
    /// Brokerage outcome.
    pub outcome: AttemptOutcome,
    /// Brokerage message.
    pub message: String,
    /// When the attempt was recorded.
    pub recorded_at: DateTime<Utc>,
}

impl ExecutionAttempt {
    /// Record an accepted order.
    #[must_use]
    pub fn success(
        source: AttemptSource,
        account_id: AccountId,
        ticket: &OrderTicket,
        message: impl Into<String>,
    ) -> Self {
        Self::record(source, account_id, ticket, AttemptOutcome::Success, message.into())
    }

    /// Record a failed order.
    #[must_use]
    pub fn failed(
        source: AttemptSource,
        account_id: AccountId,
        ticket: &OrderTicket,
        message: impl Into<String>,
    ) -> Self {
        Self::record(source, account_id, ticket, AttemptOutcome::Failed, message.into())
    }

    fn record(
        source: AttemptSource,
        account_id: AccountId,
        ticket: &OrderTicket,
        outcome: AttemptOutcome,
        message: String,
    ) -> Self {
        Self {
            source,
            account_id,
            instrument: ticket.instrument.clone(),
            side: ticket.side,
            price: ticket.price,
            quantity: ticket.quantity,
            outcome,
            message,
            recorded_at: Utc::now(),
        }
    }

    /// Whether the attempt succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcome == AttemptOutcome::Success
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn source_tags() {
        assert_eq!(AttemptSource::Plan(PlanId::from("7")).to_string(), "scheduled_7");
        assert_eq!(AttemptSource::Manual.to_string(), "manual");
    }

    #[test]
    fn attempt_serializes_source_as_tag() {
        let ticket = OrderTicket::limit("005930", OrderSide::Buy, 4, dec!(70000));
        let attempt = ExecutionAttempt::failed(
            AttemptSource::Plan(PlanId::from("p1")),
            AccountId::from("a1"),
            &ticket,
            "insufficient cash",
        );
        let json = serde_json::to_value(&attempt).unwrap();
        assert_eq!(json["source"], "scheduled_p1");
        assert_eq!(json["outcome"], "FAILED");
        assert_eq!(json["side"], "BUY");
        assert!(!attempt.is_success());
    }

    #[test]
    fn is_plan_matches_only_that_plan() {
        let source = AttemptSource::Plan(PlanId::from("p1"));
        assert!(source.is_plan(&PlanId::from("p1")));
        assert!(!source.is_plan(&PlanId::from("p2")));
        assert!(!AttemptSource::Manual.is_plan(&PlanId::from("p1")));
    }
}
