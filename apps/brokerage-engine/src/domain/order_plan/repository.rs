//! Plan repository trait.

use async_trait::async_trait;

use super::ScheduledOrderPlan;
use crate::domain::shared::{AccountId, PlanId, RepositoryError};
use crate::domain::trading::OrderSide;

/// Persistence for scheduled order plans. Plans are never deleted.
#[async_trait]
pub trait PlanRepository: Send + Sync {
    /// Find one plan.
    async fn find(&self, id: &PlanId) -> Result<Option<ScheduledOrderPlan>, RepositoryError>;

    /// Plans of an account (or all accounts), newest first.
    async fn list(
        &self,
        account: Option<&AccountId>,
    ) -> Result<Vec<ScheduledOrderPlan>, RepositoryError>;

    /// ACTIVE plans on `side`, in a stable order (oldest first).
    async fn list_active(&self, side: OrderSide) -> Result<Vec<ScheduledOrderPlan>, RepositoryError>;

    /// Insert or replace one plan.
    async fn save(&self, plan: &ScheduledOrderPlan) -> Result<(), RepositoryError>;

    /// Insert or replace a batch in one commit.
    async fn save_all(&self, plans: &[ScheduledOrderPlan]) -> Result<(), RepositoryError>;
}
