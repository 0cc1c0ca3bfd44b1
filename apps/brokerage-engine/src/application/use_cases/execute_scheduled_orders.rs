//! Execute Scheduled Orders Use Case
//!
//! One execution cycle over every ACTIVE plan on one side:
//!
//! 1. Re-read the plan; skip it if it was cancelled out of band.
//! 2. Nothing remaining → COMPLETED, no order.
//! 3. Fetch a quote and size the slice; zero shares defers the plan.
//! 4. Place a limit order at the quote. SUCCESS advances progress (and may
//!    complete the plan); FAILED only appends a record.
//!
//! Per-plan failures are logged and never abort the cycle. Mutated plans are
//! committed in one batch at the end.

use std::sync::Arc;

use serde::Serialize;

use crate::application::ports::{BrokerPort, GatewayError};
use crate::domain::order_plan::{PlanError, PlanRepository, ScheduledOrderPlan};
use crate::domain::trading::{AttemptSource, ExecutionAttempt, ExecutionLog, OrderSide, OrderTicket};
use crate::infrastructure::metrics;

/// Counts for one cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// Side this cycle ran for.
    pub side: OrderSide,
    /// ACTIVE plans found at the start.
    pub considered: usize,
    /// Orders accepted.
    pub executed: usize,
    /// Orders rejected.
    pub failed: usize,
    /// Plans deferred because the slice buys zero shares.
    pub deferred: usize,
    /// Plans that reached COMPLETED this cycle.
    pub completed: usize,
    /// Plans skipped because they were no longer ACTIVE.
    pub withdrawn: usize,
    /// Plans that hit an error before an order was placed.
    pub errors: usize,
}

impl CycleReport {
    const fn new(side: OrderSide) -> Self {
        Self {
            side,
            considered: 0,
            executed: 0,
            failed: 0,
            deferred: 0,
            completed: 0,
            withdrawn: 0,
            errors: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Exhausted,
    Deferred,
    Filled { completed: bool },
    Rejected,
}

impl Step {
    const fn mutates_plan(self) -> bool {
        matches!(self, Self::Exhausted | Self::Filled { .. })
    }
}

#[derive(Debug, thiserror::Error)]
enum StepError {
    #[error("quote lookup failed: {0}")]
    Quote(#[from] GatewayError),
    #[error(transparent)]
    Plan(#[from] PlanError),
}

/// Use case for running one scheduled execution cycle.
pub struct ExecuteScheduledOrdersUseCase<B, P, L>
where
    B: BrokerPort,
    P: PlanRepository,
    L: ExecutionLog,
{
    broker: Arc<B>,
    plans: Arc<P>,
    log: Arc<L>,
}

impl<B, P, L> ExecuteScheduledOrdersUseCase<B, P, L>
where
    B: BrokerPort,
    P: PlanRepository,
    L: ExecutionLog,
{
    /// Create a new ExecuteScheduledOrdersUseCase.
    pub const fn new(broker: Arc<B>, plans: Arc<P>, log: Arc<L>) -> Self {
        Self { broker, plans, log }
    }

    /// Run one cycle for `side`.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::Repository` if the active plans cannot be listed
    /// or the final batch commit fails.
    pub async fn execute(&self, side: OrderSide) -> Result<CycleReport, PlanError> {
        tracing::info!(side = %side, "Scheduled order cycle started");

        let active = self.plans.list_active(side).await?;
        let mut report = CycleReport::new(side);
        let mut touched = Vec::new();

        for listed in active {
            report.considered += 1;

            let mut plan = match self.plans.find(listed.id()).await {
                Ok(Some(plan)) if plan.is_active() => plan,
                Ok(_) => {
                    tracing::info!(plan_id = %listed.id(), "Plan no longer active, skipping");
                    report.withdrawn += 1;
                    continue;
                }
                Err(e) => {
                    tracing::error!(plan_id = %listed.id(), error = %e, "Failed to re-read plan");
                    report.errors += 1;
                    continue;
                }
            };

            match self.process(&mut plan).await {
                Ok(step) => {
                    match step {
                        Step::Exhausted => report.completed += 1,
                        Step::Deferred => report.deferred += 1,
                        Step::Filled { completed } => {
                            report.executed += 1;
                            if completed {
                                report.completed += 1;
                            }
                        }
                        Step::Rejected => report.failed += 1,
                    }
                    if step.mutates_plan() {
                        touched.push(plan);
                    }
                }
                Err(e) => {
                    tracing::error!(
                        plan_id = %plan.id(),
                        instrument = %plan.instrument(),
                        error = %e,
                        "Error processing scheduled plan"
                    );
                    report.errors += 1;
                }
            }
        }

        self.plans.save_all(&touched).await?;

        tracing::info!(
            side = %side,
            considered = report.considered,
            executed = report.executed,
            failed = report.failed,
            deferred = report.deferred,
            completed = report.completed,
            errors = report.errors,
            "Scheduled order cycle finished"
        );
        Ok(report)
    }

    async fn process(&self, plan: &mut ScheduledOrderPlan) -> Result<Step, StepError> {
        if plan.target().is_exhausted() {
            plan.complete()?;
            return Ok(Step::Exhausted);
        }

        let quote = self
            .broker
            .get_quote(plan.account_id(), plan.instrument())
            .await?;
        let price = quote.price;

        let quantity = plan.target().cycle_quantity(price);
        if quantity == 0 {
            tracing::info!(
                plan_id = %plan.id(),
                price = %price,
                "Skipping plan: slice budget below one share"
            );
            metrics::record_scheduled_skip();
            return Ok(Step::Deferred);
        }

        tracing::info!(
            plan_id = %plan.id(),
            instrument = %plan.instrument(),
            side = %plan.side(),
            quantity,
            price = %price,
            mode = ?plan.target().mode(),
            "Executing scheduled plan"
        );

        let ticket = OrderTicket::limit(plan.instrument(), plan.side(), quantity, price);
        let source = AttemptSource::Plan(plan.id().clone());

        match self.broker.place_order(plan.account_id(), &ticket).await {
            Ok(ack) => {
                let completed = plan.record_fill(quantity, price)?;
                metrics::record_scheduled_attempt(plan.side().as_str(), true);
                self.append(ExecutionAttempt::success(
                    source,
                    plan.account_id().clone(),
                    &ticket,
                    ack.message,
                ))
                .await;
                Ok(Step::Filled { completed })
            }
            Err(e) => {
                tracing::error!(
                    plan_id = %plan.id(),
                    error = %e,
                    "Scheduled order rejected"
                );
                metrics::record_scheduled_attempt(plan.side().as_str(), false);
                self.append(ExecutionAttempt::failed(
                    source,
                    plan.account_id().clone(),
                    &ticket,
                    e.broker_message(),
                ))
                .await;
                Ok(Step::Rejected)
            }
        }
    }

    async fn append(&self, attempt: ExecutionAttempt) {
        if let Err(e) = self.log.append(attempt).await {
            tracing::error!(error = %e, "Failed to append execution attempt");
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::application::ports::MockBrokerPort;
    use crate::domain::order_plan::{PlanStatus, PlanTarget};
    use crate::domain::portfolio::{OrderAck, Quote};
    use crate::domain::shared::AccountId;
    use crate::infrastructure::persistence::{InMemoryExecutionLog, InMemoryPlanRepository};

    fn quote(price: Decimal) -> Quote {
        Quote {
            instrument: "005930".to_string(),
            price,
            change: Decimal::ZERO,
            change_rate: Decimal::ZERO,
        }
    }

    fn ack() -> OrderAck {
        OrderAck {
            order_no: "0000117057".to_string(),
            order_time: Some("121500".to_string()),
            message: "주문 전송 완료 되었습니다.".to_string(),
        }
    }

    async fn setup(
        broker: MockBrokerPort,
        target: PlanTarget,
        side: OrderSide,
    ) -> (
        ExecuteScheduledOrdersUseCase<MockBrokerPort, InMemoryPlanRepository, InMemoryExecutionLog>,
        Arc<InMemoryPlanRepository>,
        Arc<InMemoryExecutionLog>,
        ScheduledOrderPlan,
    ) {
        let plans = Arc::new(InMemoryPlanRepository::new());
        let log = Arc::new(InMemoryExecutionLog::new());
        let plan = ScheduledOrderPlan::new(AccountId::from("acct"), "005930", side, target).unwrap();
        plans.save(&plan).await.unwrap();
        let use_case =
            ExecuteScheduledOrdersUseCase::new(Arc::new(broker), Arc::clone(&plans), Arc::clone(&log));
        (use_case, plans, log, plan)
    }

    #[tokio::test]
    async fn amount_mode_sizes_slice_by_price() {
        let mut broker = MockBrokerPort::new();
        broker
            .expect_get_quote()
            .returning(|_, _| Ok(quote(dec!(70000))));
        broker
            .expect_place_order()
            .withf(|_, ticket| ticket.quantity == 4 && ticket.price == dec!(70000))
            .times(1)
            .returning(|_, _| Ok(ack()));

        let (use_case, plans, _, plan) = setup(
            broker,
            PlanTarget::amount(dec!(1000000), dec!(300000)),
            OrderSide::Buy,
        )
        .await;

        let report = use_case.execute(OrderSide::Buy).await.unwrap();
        assert_eq!(report.executed, 1);

        let stored = plans.find(plan.id()).await.unwrap().unwrap();
        assert_eq!(
            stored.target(),
            &PlanTarget::Amount {
                total: dec!(1000000),
                per_cycle: dec!(300000),
                executed: dec!(280000),
            }
        );
    }

    #[tokio::test]
    async fn expensive_instrument_defers_without_order_or_record() {
        let mut broker = MockBrokerPort::new();
        broker
            .expect_get_quote()
            .returning(|_, _| Ok(quote(dec!(1500000))));
        broker.expect_place_order().never();

        let (use_case, plans, log, plan) = setup(
            broker,
            PlanTarget::amount(dec!(1000000), dec!(300000)),
            OrderSide::Buy,
        )
        .await;

        let report = use_case.execute(OrderSide::Buy).await.unwrap();
        assert_eq!(report.deferred, 1);
        assert_eq!(log.page(0, 10).await.unwrap().len(), 0);
        assert_eq!(plans.find(plan.id()).await.unwrap().unwrap(), plan);
    }

    #[tokio::test]
    async fn quote_failure_is_isolated_per_plan() {
        let mut broker = MockBrokerPort::new();
        broker.expect_get_quote().returning(|_, instrument| {
            if instrument == "000660" {
                Err(GatewayError::Transport("timeout".to_string()))
            } else {
                Ok(quote(dec!(70000)))
            }
        });
        broker.expect_place_order().times(1).returning(|_, _| Ok(ack()));

        let (use_case, plans, _, _) =
            setup(broker, PlanTarget::quantity(10, 5), OrderSide::Sell).await;
        let failing = ScheduledOrderPlan::new(
            AccountId::from("acct"),
            "000660",
            OrderSide::Sell,
            PlanTarget::quantity(10, 5),
        )
        .unwrap();
        plans.save(&failing).await.unwrap();

        let report = use_case.execute(OrderSide::Sell).await.unwrap();
        assert_eq!(report.considered, 2);
        assert_eq!(report.errors, 1);
        assert_eq!(report.executed, 1);
    }

    #[tokio::test]
    async fn cancelled_plan_is_not_executed() {
        let mut broker = MockBrokerPort::new();
        broker.expect_get_quote().never();
        broker.expect_place_order().never();

        let (use_case, plans, _, mut plan) =
            setup(broker, PlanTarget::quantity(10, 5), OrderSide::Buy).await;
        plan.cancel().unwrap();
        plans.save(&plan).await.unwrap();

        let report = use_case.execute(OrderSide::Buy).await.unwrap();
        assert_eq!(report.considered, 0);
        assert_eq!(
            plans.find(plan.id()).await.unwrap().unwrap().status(),
            PlanStatus::Cancelled
        );
    }

    #[tokio::test]
    async fn only_plans_on_the_triggering_side_run() {
        let mut broker = MockBrokerPort::new();
        broker.expect_get_quote().never();
        broker.expect_place_order().never();

        let (use_case, _, _, _) = setup(broker, PlanTarget::quantity(10, 5), OrderSide::Buy).await;
        let report = use_case.execute(OrderSide::Sell).await.unwrap();
        assert_eq!(report.considered, 0);
    }
}
