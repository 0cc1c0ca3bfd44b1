//! Plan errors.

use super::PlanStatus;
use crate::domain::shared::RepositoryError;

/// Errors raised by plan rules and plan use cases.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    /// Target or slice is not positive, or the instrument is empty.
    #[error("invalid plan: {reason}")]
    InvalidTarget {
        /// What was wrong.
        reason: String,
    },

    /// Status change out of a terminal state.
    #[error("cannot move plan from {from} to {to}")]
    InvalidTransition {
        /// Current status.
        from: PlanStatus,
        /// Requested status.
        to: PlanStatus,
    },

    /// No plan with this id.
    #[error("plan not found: {plan_id}")]
    NotFound {
        /// Requested id.
        plan_id: String,
    },

    /// Storage failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
