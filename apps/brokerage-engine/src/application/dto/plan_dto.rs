//! Plan DTOs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::domain::order_plan::{
    FulfillmentMode, PlanError, PlanStatus, PlanTarget, ScheduledOrderPlan,
};
use crate::domain::trading::OrderSide;

/// DTO for creating a plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePlanDto {
    /// Owning account.
    pub account_id: String,
    /// Instrument code.
    pub instrument: String,
    /// Buy or sell.
    pub side: OrderSide,
    /// Unit of `total` and `per_cycle`.
    pub mode: FulfillmentMode,
    /// Total target.
    pub total: Decimal,
    /// Per-cycle slice.
    pub per_cycle: Decimal,
}

impl CreatePlanDto {
    /// Convert to a domain target.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::InvalidTarget` if a quantity-mode value is not a
    /// whole, non-negative share count.
    pub fn to_target(&self) -> Result<PlanTarget, PlanError> {
        match self.mode {
            FulfillmentMode::Quantity => {
                let total = whole_shares(self.total)?;
                let per_cycle = whole_shares(self.per_cycle)?;
                Ok(PlanTarget::quantity(total, per_cycle))
            }
            FulfillmentMode::Amount => Ok(PlanTarget::amount(self.total, self.per_cycle)),
        }
    }
}

fn whole_shares(value: Decimal) -> Result<u64, PlanError> {
    if value.fract() != Decimal::ZERO {
        return Err(PlanError::InvalidTarget {
            reason: format!("share count must be whole: {value}"),
        });
    }
    value.to_u64().ok_or_else(|| PlanError::InvalidTarget {
        reason: format!("share count out of range: {value}"),
    })
}

/// DTO representing a plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanDto {
    /// Plan id.
    pub id: String,
    /// Owning account.
    pub account_id: String,
    /// Instrument code.
    pub instrument: String,
    /// Buy or sell.
    pub side: OrderSide,
    /// Unit.
    pub mode: FulfillmentMode,
    /// Total target.
    pub total: Decimal,
    /// Per-cycle slice.
    pub per_cycle: Decimal,
    /// Executed so far.
    pub executed: Decimal,
    /// Status.
    pub status: PlanStatus,
    /// Created at.
    pub created_at: DateTime<Utc>,
}

impl PlanDto {
    /// Create from a domain plan.
    #[must_use]
    pub fn from_plan(plan: &ScheduledOrderPlan) -> Self {
        let (total, per_cycle, executed) = match plan.target() {
            PlanTarget::Quantity {
                total,
                per_cycle,
                executed,
            } => (
                Decimal::from(*total),
                Decimal::from(*per_cycle),
                Decimal::from(*executed),
            ),
            PlanTarget::Amount {
                total,
                per_cycle,
                executed,
            } => (*total, *per_cycle, *executed),
        };

        Self {
            id: plan.id().to_string(),
            account_id: plan.account_id().to_string(),
            instrument: plan.instrument().to_string(),
            side: plan.side(),
            mode: plan.target().mode(),
            total,
            per_cycle,
            executed,
            status: plan.status(),
            created_at: plan.created_at(),
        }
    }
}
