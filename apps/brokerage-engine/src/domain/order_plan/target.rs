//! Plan targets and per-cycle sizing.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use super::PlanError;

/// Unit a plan is denominated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FulfillmentMode {
    /// Share count.
    Quantity,
    /// Currency amount.
    Amount,
}

/// Total target, per-cycle slice, and executed total, in one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanTarget {
    /// Denominated in shares.
    Quantity {
        /// Shares to trade in total.
        total: u64,
        /// Shares per cycle.
        per_cycle: u64,
        /// Shares traded so far.
        executed: u64,
    },
    /// Denominated in currency.
    Amount {
        /// Currency to spend or raise in total.
        total: Decimal,
        /// Currency per cycle.
        per_cycle: Decimal,
        /// Currency filled so far (quantity × fill price).
        executed: Decimal,
    },
}

impl PlanTarget {
    /// Quantity-mode target with nothing executed.
    #[must_use]
    pub const fn quantity(total: u64, per_cycle: u64) -> Self {
        Self::Quantity {
            total,
            per_cycle,
            executed: 0,
        }
    }

    /// Amount-mode target with nothing executed.
    #[must_use]
    pub const fn amount(total: Decimal, per_cycle: Decimal) -> Self {
        Self::Amount {
            total,
            per_cycle,
            executed: Decimal::ZERO,
        }
    }

    pub(super) fn validate(&self) -> Result<(), PlanError> {
        let valid = match self {
            Self::Quantity {
                total, per_cycle, ..
            } => *total > 0 && *per_cycle > 0,
            Self::Amount {
                total, per_cycle, ..
            } => *total > Decimal::ZERO && *per_cycle > Decimal::ZERO,
        };
        if valid {
            Ok(())
        } else {
            Err(PlanError::InvalidTarget {
                reason: "total and per-cycle slice must be positive".to_string(),
            })
        }
    }

    /// Unit of this target.
    #[must_use]
    pub const fn mode(&self) -> FulfillmentMode {
        match self {
            Self::Quantity { .. } => FulfillmentMode::Quantity,
            Self::Amount { .. } => FulfillmentMode::Amount,
        }
    }

    /// Whether nothing remains to execute.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        match self {
            Self::Quantity {
                total, executed, ..
            } => executed >= total,
            Self::Amount {
                total, executed, ..
            } => executed >= total,
        }
    }

    /// Shares to order this cycle at `price`.
    ///
    /// Quantity mode: `min(per_cycle, remaining)`. Amount mode:
    /// `floor(min(per_cycle, remaining) / price)`. Zero means the cycle is
    /// deferred (nothing remains, or the price exceeds the slice budget).
    #[must_use]
    pub fn cycle_quantity(&self, price: Decimal) -> u64 {
        match self {
            Self::Quantity {
                total,
                per_cycle,
                executed,
            } => (*per_cycle).min(total.saturating_sub(*executed)),
            Self::Amount {
                total,
                per_cycle,
                executed,
            } => {
                let remaining = *total - *executed;
                if remaining <= Decimal::ZERO || price <= Decimal::ZERO {
                    return 0;
                }
                let slice = (*per_cycle).min(remaining);
                (slice / price).floor().to_u64().unwrap_or(0)
            }
        }
    }

    /// Add a fill of `quantity` shares at `price`.
    pub(super) fn add_fill(&mut self, quantity: u64, price: Decimal) {
        match self {
            Self::Quantity { executed, .. } => *executed = executed.saturating_add(quantity),
            Self::Amount { executed, .. } => *executed += Decimal::from(quantity) * price,
        }
    }

    /// Whether executed has reached 99% of total.
    #[must_use]
    pub fn is_near_complete(&self) -> bool {
        match self {
            Self::Quantity {
                total, executed, ..
            } => u128::from(*executed) * 100 >= u128::from(*total) * 99,
            Self::Amount {
                total, executed, ..
            } => *executed * Decimal::ONE_HUNDRED >= *total * Decimal::from(99),
        }
    }

    /// Number of cycles the plan should take: `ceil(total / per_cycle)`.
    #[must_use]
    pub fn expected_cycles(&self) -> u64 {
        match self {
            Self::Quantity {
                total, per_cycle, ..
            } => total.div_ceil((*per_cycle).max(1)),
            Self::Amount {
                total, per_cycle, ..
            } => {
                if *per_cycle <= Decimal::ZERO {
                    return u64::MAX;
                }
                (*total / *per_cycle).ceil().to_u64().unwrap_or(u64::MAX)
            }
        }
    }
}
