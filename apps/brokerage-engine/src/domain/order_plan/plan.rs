//! Scheduled order plan aggregate.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::{PlanError, PlanStatus, PlanTarget};
use crate::domain::shared::{AccountId, PlanId};
use crate::domain::trading::OrderSide;

/// One multi-day execution intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledOrderPlan {
    id: PlanId,
    account_id: AccountId,
    instrument: String,
    side: OrderSide,
    target: PlanTarget,
    status: PlanStatus,
    created_at: DateTime<Utc>,
}

impl ScheduledOrderPlan {
    /// Create an ACTIVE plan.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::InvalidTarget` if the instrument is blank or the
    /// target/slice is not positive.
    pub fn new(
        account_id: AccountId,
        instrument: impl Into<String>,
        side: OrderSide,
        target: PlanTarget,
    ) -> Result<Self, PlanError> {
        let instrument = instrument.into().trim().to_string();
        if instrument.is_empty() {
            return Err(PlanError::InvalidTarget {
                reason: "instrument code is required".to_string(),
            });
        }
        target.validate()?;

        Ok(Self {
            id: PlanId::generate(),
            account_id,
            instrument,
            side,
            target,
            status: PlanStatus::Active,
            created_at: Utc::now(),
        })
    }

    /// Plan id.
    #[must_use]
    pub const fn id(&self) -> &PlanId {
        &self.id
    }

    /// Owning account.
    #[must_use]
    pub const fn account_id(&self) -> &AccountId {
        &self.account_id
    }

    /// Instrument code.
    #[must_use]
    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    /// Buy or sell.
    #[must_use]
    pub const fn side(&self) -> OrderSide {
        self.side
    }

    /// Target and progress.
    #[must_use]
    pub const fn target(&self) -> &PlanTarget {
        &self.target
    }

    /// Lifecycle status.
    #[must_use]
    pub const fn status(&self) -> PlanStatus {
        self.status
    }

    /// Creation time.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Whether the plan still executes.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == PlanStatus::Active
    }

    /// Move to COMPLETED.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::InvalidTransition` from a terminal state.
    pub fn complete(&mut self) -> Result<(), PlanError> {
        self.transition(PlanStatus::Completed)
    }

    /// Move to CANCELLED.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::InvalidTransition` from a terminal state.
    pub fn cancel(&mut self) -> Result<(), PlanError> {
        self.transition(PlanStatus::Cancelled)
    }

    /// Apply an accepted order of `quantity` shares at `price`.
    ///
    /// Returns `true` if the plan reached its target and completed.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::InvalidTransition` if the plan is not ACTIVE.
    pub fn record_fill(&mut self, quantity: u64, price: Decimal) -> Result<bool, PlanError> {
        if !self.is_active() {
            return Err(PlanError::InvalidTransition {
                from: self.status,
                to: PlanStatus::Active,
            });
        }
        self.target.add_fill(quantity, price);
        if self.target.is_exhausted() {
            self.status = PlanStatus::Completed;
            return Ok(true);
        }
        Ok(false)
    }

    /// Read-time completion inference.
    ///
    /// An ACTIVE plan is completed when executed ≥ 99% of total, or when
    /// `success_count` reaches `ceil(total / per_cycle)`. The two rules are
    /// independent. Returns `true` if the status changed.
    pub fn reconcile(&mut self, success_count: usize) -> bool {
        if !self.is_active() {
            return false;
        }
        let by_ratio = self.target.is_near_complete();
        let by_cycles = success_count as u64 >= self.target.expected_cycles();
        if by_ratio || by_cycles {
            self.status = PlanStatus::Completed;
            return true;
        }
        false
    }

    fn transition(&mut self, next: PlanStatus) -> Result<(), PlanError> {
        if !self.status.can_transition_to(next) {
            return Err(PlanError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}
