//! Job bodies wired to the use cases.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;

use super::jobs::JobKind;
use super::service::{JobError, JobRunner};
use crate::application::ports::{BrokerPort, DashboardSink};
use crate::application::use_cases::{
    ExecuteScheduledOrdersUseCase, RecordAssetsUseCase, SyncDashboardUseCase,
};
use crate::domain::order_plan::PlanRepository;
use crate::domain::portfolio::AssetHistoryRepository;
use crate::domain::session::{AccountRepository, SWEEP_MARGIN};
use crate::domain::trading::{ExecutionLog, OrderSide};
use crate::infrastructure::session::SessionManager;

/// Dispatch table from job kind to use case.
pub struct EngineJobs<B, P, L, H>
where
    B: BrokerPort,
    P: PlanRepository,
    L: ExecutionLog,
    H: AssetHistoryRepository,
{
    orders: ExecuteScheduledOrdersUseCase<B, P, L>,
    assets: RecordAssetsUseCase<B, dyn AccountRepository, H>,
    dashboard: SyncDashboardUseCase<H, dyn DashboardSink>,
    sessions: Arc<SessionManager>,
    timezone: Tz,
}

impl<B, P, L, H> EngineJobs<B, P, L, H>
where
    B: BrokerPort,
    P: PlanRepository,
    L: ExecutionLog,
    H: AssetHistoryRepository,
{
    /// Create the dispatch table.
    pub const fn new(
        orders: ExecuteScheduledOrdersUseCase<B, P, L>,
        assets: RecordAssetsUseCase<B, dyn AccountRepository, H>,
        dashboard: SyncDashboardUseCase<H, dyn DashboardSink>,
        sessions: Arc<SessionManager>,
        timezone: Tz,
    ) -> Self {
        Self {
            orders,
            assets,
            dashboard,
            sessions,
            timezone,
        }
    }

    fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.timezone).date_naive()
    }

    async fn cycle(&self, job: JobKind, side: OrderSide) -> Result<String, JobError> {
        let report = self.orders.execute(side).await.map_err(|e| failed(job, e))?;
        Ok(format!(
            "{side}: considered={} executed={} failed={} deferred={} completed={} errors={}",
            report.considered,
            report.executed,
            report.failed,
            report.deferred,
            report.completed,
            report.errors
        ))
    }
}

fn failed(job: JobKind, error: impl std::fmt::Display) -> JobError {
    JobError::Failed {
        job,
        message: error.to_string(),
    }
}

#[async_trait]
impl<B, P, L, H> JobRunner for EngineJobs<B, P, L, H>
where
    B: BrokerPort,
    P: PlanRepository,
    L: ExecutionLog,
    H: AssetHistoryRepository,
{
    async fn run(&self, job: JobKind) -> Result<String, JobError> {
        match job {
            JobKind::DailySell => self.cycle(job, OrderSide::Sell).await,
            JobKind::DailyBuy => self.cycle(job, OrderSide::Buy).await,
            JobKind::HourlyTokenRefresh => {
                let report = self
                    .sessions
                    .check_and_refresh_all_accounts(SWEEP_MARGIN)
                    .await
                    .map_err(|e| failed(job, e))?;
                Ok(format!(
                    "checked={} refreshed={} failed={}",
                    report.checked, report.refreshed, report.failed
                ))
            }
            JobKind::DailyAssetRecording => {
                let report = self
                    .assets
                    .execute(self.today())
                    .await
                    .map_err(|e| failed(job, e))?;
                Ok(format!(
                    "recorded={} skipped={} failed={}",
                    report.recorded, report.skipped, report.failed
                ))
            }
            JobKind::DashboardSync => {
                let count = self
                    .dashboard
                    .execute(self.today())
                    .await
                    .map_err(|e| failed(job, e))?;
                Ok(format!("published={count}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rust_decimal_macros::dec;

    use super::*;
    use crate::application::ports::{AppCredentials, LoggingDashboardSink, MockBrokerPort};
    use crate::domain::order_plan::{PlanTarget, ScheduledOrderPlan};
    use crate::domain::portfolio::{Balance, BalanceSummary, OrderAck, Quote};
    use crate::domain::shared::AccountId;
    use crate::infrastructure::persistence::{
        InMemoryAccountRepository, InMemoryAssetHistory, InMemoryExecutionLog,
        InMemoryPlanRepository,
    };
    use crate::infrastructure::session::DirectTokenIssuer;
    use crate::infrastructure::vault::InMemoryCredentialVault;

    type TestJobs = EngineJobs<
        MockBrokerPort,
        InMemoryPlanRepository,
        InMemoryExecutionLog,
        InMemoryAssetHistory,
    >;

    struct Fixture {
        jobs: TestJobs,
        plans: Arc<InMemoryPlanRepository>,
        history: Arc<InMemoryAssetHistory>,
        sessions: Arc<SessionManager>,
    }

    fn fixture(broker: MockBrokerPort) -> Fixture {
        let broker = Arc::new(broker);
        let plans = Arc::new(InMemoryPlanRepository::new());
        let log = Arc::new(InMemoryExecutionLog::new());
        let history = Arc::new(InMemoryAssetHistory::new());
        let accounts: Arc<dyn AccountRepository> = Arc::new(InMemoryAccountRepository::new());
        let sink: Arc<dyn DashboardSink> = Arc::new(LoggingDashboardSink);
        let sessions = Arc::new(SessionManager::new(
            Arc::clone(&accounts),
            Arc::new(InMemoryCredentialVault::new()),
            DirectTokenIssuer::new("http://127.0.0.1:9", Duration::from_millis(200)).unwrap(),
        ));
        let jobs = EngineJobs::new(
            ExecuteScheduledOrdersUseCase::new(Arc::clone(&broker), Arc::clone(&plans), log),
            RecordAssetsUseCase::new(broker, accounts, Arc::clone(&history)),
            SyncDashboardUseCase::new(Arc::clone(&history), sink),
            Arc::clone(&sessions),
            chrono_tz::Asia::Seoul,
        );
        Fixture {
            jobs,
            plans,
            history,
            sessions,
        }
    }

    #[tokio::test]
    async fn sell_job_runs_only_sell_plans() {
        let mut broker = MockBrokerPort::new();
        broker.expect_get_quote().returning(|_, instrument| {
            Ok(Quote {
                instrument: instrument.to_string(),
                price: dec!(70000),
                change: dec!(0),
                change_rate: dec!(0),
            })
        });
        broker
            .expect_place_order()
            .withf(|_, ticket| ticket.side == OrderSide::Sell)
            .times(1)
            .returning(|_, _| {
                Ok(OrderAck {
                    order_no: "1".to_string(),
                    order_time: None,
                    message: "ok".to_string(),
                })
            });
        let f = fixture(broker);
        for side in [OrderSide::Buy, OrderSide::Sell] {
            let plan = ScheduledOrderPlan::new(
                AccountId::from("main"),
                "005930",
                side,
                PlanTarget::quantity(10, 5),
            )
            .unwrap();
            f.plans.save(&plan).await.unwrap();
        }

        let summary = f.jobs.run(JobKind::DailySell).await.unwrap();
        assert!(summary.starts_with("SELL: considered=1 executed=1"), "{summary}");
    }

    #[tokio::test]
    async fn asset_job_then_dashboard_job_publish_the_snapshot() {
        let mut broker = MockBrokerPort::new();
        broker.expect_get_balance().returning(|_| {
            Ok(Balance {
                holdings: Vec::new(),
                summary: Some(BalanceSummary {
                    total_asset: dec!(2000000),
                    stock_evaluation: dec!(1000000),
                    cash: dec!(1000000),
                    total_profit_loss: dec!(50000),
                    purchase_amount: dec!(950000),
                }),
            })
        });
        let f = fixture(broker);
        f.sessions
            .register_account(
                AccountId::from("main"),
                AppCredentials {
                    app_key: "k".to_string(),
                    app_secret: "s".to_string(),
                    account_number: "50123456".to_string(),
                    product_code: "01".to_string(),
                },
                None,
            )
            .await
            .unwrap();

        let recorded = f.jobs.run(JobKind::DailyAssetRecording).await.unwrap();
        assert_eq!(recorded, "recorded=1 skipped=0 failed=0");
        assert_eq!(f.history.list_for_date(f.jobs.today()).await.unwrap().len(), 1);

        let published = f.jobs.run(JobKind::DashboardSync).await.unwrap();
        assert_eq!(published, "published=1");
    }

    #[tokio::test]
    async fn token_job_reports_sweep_counts() {
        let f = fixture(MockBrokerPort::new());
        let summary = f.jobs.run(JobKind::HourlyTokenRefresh).await.unwrap();
        assert_eq!(summary, "checked=0 refreshed=0 failed=0");
    }
}
