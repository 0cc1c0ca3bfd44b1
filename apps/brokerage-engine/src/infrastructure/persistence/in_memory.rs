//! In-memory repositories.
//!
//! Suitable for testing and single-process development. Not durable.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::RwLock;

use crate::domain::order_plan::{PlanRepository, ScheduledOrderPlan};
use crate::domain::portfolio::{AssetHistoryRepository, DailyAssetSnapshot};
use crate::domain::session::{AccountRepository, AccountSession};
use crate::domain::shared::{AccountId, PlanId, RepositoryError};
use crate::domain::trading::{AttemptOutcome, ExecutionAttempt, ExecutionLog, OrderSide};

// ============================================================================
// Accounts
// ============================================================================

/// In-memory implementation of `AccountRepository`.
#[derive(Debug, Default)]
pub struct InMemoryAccountRepository {
    sessions: RwLock<BTreeMap<AccountId, AccountSession>>,
}

impl InMemoryAccountRepository {
    /// Create a new empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Whether no session is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

#[async_trait]
impl AccountRepository for InMemoryAccountRepository {
    async fn find(&self, id: &AccountId) -> Result<Option<AccountSession>, RepositoryError> {
        Ok(self.sessions.read().get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<AccountSession>, RepositoryError> {
        Ok(self.sessions.read().values().cloned().collect())
    }

    async fn save(&self, session: &AccountSession) -> Result<(), RepositoryError> {
        self.sessions
            .write()
            .insert(session.account_id().clone(), session.clone());
        Ok(())
    }
}

// ============================================================================
// Plans
// ============================================================================

#[derive(Debug)]
struct StoredPlan {
    seq: u64,
    plan: ScheduledOrderPlan,
}

/// In-memory implementation of `PlanRepository`.
///
/// Iteration order follows first insertion.
#[derive(Debug, Default)]
pub struct InMemoryPlanRepository {
    plans: RwLock<HashMap<PlanId, StoredPlan>>,
    next_seq: AtomicU64,
}

impl InMemoryPlanRepository {
    /// Create a new empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn upsert(&self, map: &mut HashMap<PlanId, StoredPlan>, plan: &ScheduledOrderPlan) {
        if let Some(stored) = map.get_mut(plan.id()) {
            stored.plan = plan.clone();
        } else {
            let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
            map.insert(
                plan.id().clone(),
                StoredPlan {
                    seq,
                    plan: plan.clone(),
                },
            );
        }
    }

    fn sorted(&self, filter: impl Fn(&ScheduledOrderPlan) -> bool) -> Vec<ScheduledOrderPlan> {
        let map = self.plans.read();
        let mut stored: Vec<&StoredPlan> = map.values().filter(|s| filter(&s.plan)).collect();
        stored.sort_by_key(|s| s.seq);
        stored.into_iter().map(|s| s.plan.clone()).collect()
    }
}

#[async_trait]
impl PlanRepository for InMemoryPlanRepository {
    async fn find(&self, id: &PlanId) -> Result<Option<ScheduledOrderPlan>, RepositoryError> {
        Ok(self.plans.read().get(id).map(|s| s.plan.clone()))
    }

    async fn list(
        &self,
        account: Option<&AccountId>,
    ) -> Result<Vec<ScheduledOrderPlan>, RepositoryError> {
        let mut plans = self.sorted(|p| account.is_none_or(|a| p.account_id() == a));
        plans.reverse();
        Ok(plans)
    }

    async fn list_active(&self, side: OrderSide) -> Result<Vec<ScheduledOrderPlan>, RepositoryError> {
        Ok(self.sorted(|p| p.is_active() && p.side() == side))
    }

    async fn save(&self, plan: &ScheduledOrderPlan) -> Result<(), RepositoryError> {
        let mut map = self.plans.write();
        self.upsert(&mut map, plan);
        Ok(())
    }

    async fn save_all(&self, plans: &[ScheduledOrderPlan]) -> Result<(), RepositoryError> {
        let mut map = self.plans.write();
        for plan in plans {
            self.upsert(&mut map, plan);
        }
        Ok(())
    }
}

// ============================================================================
// Execution log
// ============================================================================

/// In-memory implementation of `ExecutionLog`.
#[derive(Debug, Default)]
pub struct InMemoryExecutionLog {
    records: RwLock<Vec<ExecutionAttempt>>,
}

impl InMemoryExecutionLog {
    /// Create a new empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl ExecutionLog for InMemoryExecutionLog {
    async fn append(&self, attempt: ExecutionAttempt) -> Result<(), RepositoryError> {
        self.records.write().push(attempt);
        Ok(())
    }

    async fn count_successes(&self, plan: &PlanId) -> Result<usize, RepositoryError> {
        Ok(self
            .records
            .read()
            .iter()
            .filter(|r| r.outcome == AttemptOutcome::Success && r.source.is_plan(plan))
            .count())
    }

    async fn page(
        &self,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<ExecutionAttempt>, RepositoryError> {
        Ok(self
            .records
            .read()
            .iter()
            .rev()
            .skip(skip)
            .take(limit)
            .cloned()
            .collect())
    }
}

// ============================================================================
// Asset history
// ============================================================================

/// In-memory implementation of `AssetHistoryRepository`.
#[derive(Debug, Default)]
pub struct InMemoryAssetHistory {
    snapshots: RwLock<BTreeMap<(AccountId, NaiveDate), DailyAssetSnapshot>>,
}

impl InMemoryAssetHistory {
    /// Create a new empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AssetHistoryRepository for InMemoryAssetHistory {
    async fn latest_before(
        &self,
        account: &AccountId,
        date: NaiveDate,
    ) -> Result<Option<DailyAssetSnapshot>, RepositoryError> {
        Ok(self
            .snapshots
            .read()
            .iter()
            .filter(|((id, day), _)| id == account && *day < date)
            .max_by_key(|((_, day), _)| *day)
            .map(|(_, snapshot)| snapshot.clone()))
    }

    async fn save(&self, snapshot: &DailyAssetSnapshot) -> Result<(), RepositoryError> {
        self.snapshots.write().insert(
            (snapshot.account_id.clone(), snapshot.date),
            snapshot.clone(),
        );
        Ok(())
    }

    async fn list_for_date(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<DailyAssetSnapshot>, RepositoryError> {
        Ok(self
            .snapshots
            .read()
            .values()
            .filter(|s| s.date == date)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::domain::order_plan::PlanTarget;
    use crate::domain::portfolio::BalanceSummary;
    use crate::domain::trading::{AttemptSource, OrderTicket};

    fn plan(side: OrderSide) -> ScheduledOrderPlan {
        ScheduledOrderPlan::new(
            AccountId::from("acct"),
            "005930",
            side,
            PlanTarget::quantity(10, 5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn plans_list_newest_first_and_active_oldest_first() {
        let repo = InMemoryPlanRepository::new();
        let first = plan(OrderSide::Buy);
        let second = plan(OrderSide::Buy);
        let sell = plan(OrderSide::Sell);
        repo.save_all(&[first.clone(), second.clone(), sell]).await.unwrap();

        let all = repo.list(None).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[2].id(), first.id());

        let active = repo.list_active(OrderSide::Buy).await.unwrap();
        assert_eq!(active.len(), 2);
        assert_eq!(active[0].id(), first.id());
        assert_eq!(active[1].id(), second.id());
    }

    #[tokio::test]
    async fn update_keeps_position() {
        let repo = InMemoryPlanRepository::new();
        let mut first = plan(OrderSide::Buy);
        let second = plan(OrderSide::Buy);
        repo.save(&first).await.unwrap();
        repo.save(&second).await.unwrap();

        first.cancel().unwrap();
        repo.save(&first).await.unwrap();

        let active = repo.list_active(OrderSide::Buy).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id(), second.id());
        assert_eq!(repo.list(None).await.unwrap()[1].id(), first.id());
    }

    #[tokio::test]
    async fn log_pages_newest_first_and_counts_plan_successes() {
        let log = InMemoryExecutionLog::new();
        let plan_id = PlanId::from("p1");
        let ticket = OrderTicket::limit("005930", OrderSide::Buy, 1, dec!(100));
        for i in 0..5 {
            let attempt = if i % 2 == 0 {
                ExecutionAttempt::success(
                    AttemptSource::Plan(plan_id.clone()),
                    AccountId::from("acct"),
                    &ticket,
                    format!("#{i}"),
                )
            } else {
                ExecutionAttempt::failed(
                    AttemptSource::Plan(plan_id.clone()),
                    AccountId::from("acct"),
                    &ticket,
                    format!("#{i}"),
                )
            };
            log.append(attempt).await.unwrap();
        }
        log.append(ExecutionAttempt::success(
            AttemptSource::Manual,
            AccountId::from("acct"),
            &ticket,
            "manual",
        ))
        .await
        .unwrap();

        assert_eq!(log.count_successes(&plan_id).await.unwrap(), 3);

        let page = log.page(1, 2).await.unwrap();
        assert_eq!(page[0].message, "#4");
        assert_eq!(page[1].message, "#3");
    }

    #[tokio::test]
    async fn latest_before_ignores_same_day_and_other_accounts() {
        let history = InMemoryAssetHistory::new();
        let summary = BalanceSummary::default();
        let day = |d| NaiveDate::from_ymd_opt(2026, 3, d).unwrap();

        for (account, d) in [("a", 2), ("a", 5), ("a", 9), ("b", 8)] {
            history
                .save(&DailyAssetSnapshot::from_summary(
                    AccountId::from(account),
                    day(d),
                    &summary,
                    None,
                ))
                .await
                .unwrap();
        }

        let latest = history
            .latest_before(&AccountId::from("a"), day(9))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.date, day(5));
        assert!(
            history
                .latest_before(&AccountId::from("a"), day(2))
                .await
                .unwrap()
                .is_none()
        );
    }
}
