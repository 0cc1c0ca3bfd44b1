//! Plan Management Use Case
//!
//! Create, list (with read-time reconciliation) and cancel plans.

use std::sync::Arc;

use crate::application::dto::CreatePlanDto;
use crate::domain::order_plan::{PlanError, PlanRepository, ScheduledOrderPlan};
use crate::domain::shared::{AccountId, PlanId};
use crate::domain::trading::ExecutionLog;

/// Use case for plan CRUD.
pub struct ManagePlansUseCase<P, L>
where
    P: PlanRepository,
    L: ExecutionLog,
{
    plans: Arc<P>,
    log: Arc<L>,
}

impl<P, L> ManagePlansUseCase<P, L>
where
    P: PlanRepository,
    L: ExecutionLog,
{
    /// Create a new ManagePlansUseCase.
    pub const fn new(plans: Arc<P>, log: Arc<L>) -> Self {
        Self { plans, log }
    }

    /// Create an ACTIVE plan.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::InvalidTarget` for non-positive targets or slices.
    pub async fn create(&self, request: &CreatePlanDto) -> Result<ScheduledOrderPlan, PlanError> {
        let plan = ScheduledOrderPlan::new(
            AccountId::new(&request.account_id),
            &request.instrument,
            request.side,
            request.to_target()?,
        )?;
        self.plans.save(&plan).await?;

        tracing::info!(
            plan_id = %plan.id(),
            account_id = %plan.account_id(),
            instrument = %plan.instrument(),
            side = %plan.side(),
            mode = ?plan.target().mode(),
            "Scheduled plan created"
        );
        Ok(plan)
    }

    /// List plans, newest first, completing any ACTIVE plan that the
    /// completion heuristics consider done.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::Repository` on storage failure.
    pub async fn list(
        &self,
        account: Option<&AccountId>,
    ) -> Result<Vec<ScheduledOrderPlan>, PlanError> {
        let mut plans = self.plans.list(account).await?;
        let mut changed = Vec::new();

        for plan in plans.iter_mut().filter(|p| p.is_active()) {
            let successes = self.log.count_successes(plan.id()).await?;
            if plan.reconcile(successes) {
                tracing::info!(
                    plan_id = %plan.id(),
                    successes,
                    "Plan reconciled to COMPLETED"
                );
                changed.push(plan.clone());
            }
        }

        if !changed.is_empty() {
            self.plans.save_all(&changed).await?;
        }
        Ok(plans)
    }

    /// Cancel an ACTIVE plan.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::NotFound` for an unknown id and
    /// `PlanError::InvalidTransition` for a terminal plan.
    pub async fn cancel(&self, id: &PlanId) -> Result<ScheduledOrderPlan, PlanError> {
        let mut plan = self
            .plans
            .find(id)
            .await?
            .ok_or_else(|| PlanError::NotFound {
                plan_id: id.to_string(),
            })?;
        plan.cancel()?;
        self.plans.save(&plan).await?;

        tracing::info!(plan_id = %id, "Scheduled plan cancelled");
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::domain::order_plan::{FulfillmentMode, PlanStatus};
    use crate::domain::trading::{AttemptSource, ExecutionAttempt, OrderSide, OrderTicket};
    use crate::infrastructure::persistence::{InMemoryExecutionLog, InMemoryPlanRepository};

    fn use_case() -> (
        ManagePlansUseCase<InMemoryPlanRepository, InMemoryExecutionLog>,
        Arc<InMemoryExecutionLog>,
    ) {
        let log = Arc::new(InMemoryExecutionLog::new());
        (
            ManagePlansUseCase::new(Arc::new(InMemoryPlanRepository::new()), Arc::clone(&log)),
            log,
        )
    }

    fn request(total: u64, per_cycle: u64) -> CreatePlanDto {
        CreatePlanDto {
            account_id: "acct".to_string(),
            instrument: "005930".to_string(),
            side: OrderSide::Buy,
            mode: FulfillmentMode::Quantity,
            total: total.into(),
            per_cycle: per_cycle.into(),
        }
    }

    #[tokio::test]
    async fn create_rejects_zero_slice() {
        let (use_case, _) = use_case();
        let result = use_case.create(&request(100, 0)).await;
        assert!(matches!(result, Err(PlanError::InvalidTarget { .. })));
    }

    #[tokio::test]
    async fn list_completes_plan_by_success_count() {
        let (use_case, log) = use_case();
        let plan = use_case.create(&request(100, 30)).await.unwrap();

        let ticket = OrderTicket::limit("005930", OrderSide::Buy, 30, dec!(70000));
        for _ in 0..4 {
            log.append(ExecutionAttempt::success(
                AttemptSource::Plan(plan.id().clone()),
                AccountId::from("acct"),
                &ticket,
                "ok",
            ))
            .await
            .unwrap();
        }

        let listed = use_case.list(None).await.unwrap();
        assert_eq!(listed[0].status(), PlanStatus::Completed);

        let again = use_case.list(Some(&AccountId::from("acct"))).await.unwrap();
        assert_eq!(again[0].status(), PlanStatus::Completed);
    }

    #[tokio::test]
    async fn cancel_twice_is_an_invalid_transition() {
        let (use_case, _) = use_case();
        let plan = use_case.create(&request(10, 5)).await.unwrap();

        let cancelled = use_case.cancel(plan.id()).await.unwrap();
        assert_eq!(cancelled.status(), PlanStatus::Cancelled);
        assert!(matches!(
            use_case.cancel(plan.id()).await,
            Err(PlanError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn cancel_unknown_plan_is_not_found() {
        let (use_case, _) = use_case();
        assert!(matches!(
            use_case.cancel(&PlanId::from("missing")).await,
            Err(PlanError::NotFound { .. })
        ));
    }
}
