//! Asset Recording Use Cases
//!
//! End-of-day snapshot of every account, and the production-only push of
//! those snapshots to the dashboard.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;

use crate::application::ports::{BrokerPort, DashboardError, DashboardSink};
use crate::domain::portfolio::{AssetHistoryRepository, DailyAssetSnapshot};
use crate::domain::session::AccountRepository;
use crate::domain::shared::RepositoryError;

/// Per-run counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssetReport {
    /// Snapshots written.
    pub recorded: usize,
    /// Accounts without a balance summary.
    pub skipped: usize,
    /// Accounts whose balance or history lookup failed.
    pub failed: usize,
}

/// Use case for the daily asset snapshot.
pub struct RecordAssetsUseCase<B, A, H>
where
    B: BrokerPort,
    A: AccountRepository + ?Sized,
    H: AssetHistoryRepository,
{
    broker: Arc<B>,
    accounts: Arc<A>,
    history: Arc<H>,
}

impl<B, A, H> RecordAssetsUseCase<B, A, H>
where
    B: BrokerPort,
    A: AccountRepository + ?Sized,
    H: AssetHistoryRepository,
{
    /// Create a new RecordAssetsUseCase.
    pub const fn new(broker: Arc<B>, accounts: Arc<A>, history: Arc<H>) -> Self {
        Self {
            broker,
            accounts,
            history,
        }
    }

    /// Snapshot every account for `date`.
    ///
    /// # Errors
    ///
    /// Returns an error only if the account list cannot be read.
    pub async fn execute(&self, date: NaiveDate) -> Result<AssetReport, RepositoryError> {
        let sessions = self.accounts.list().await?;
        let mut report = AssetReport::default();

        for session in &sessions {
            let account_id = session.account_id();

            let balance = match self.broker.get_balance(account_id).await {
                Ok(balance) => balance,
                Err(e) => {
                    tracing::error!(account_id = %account_id, error = %e, "Balance lookup failed");
                    report.failed += 1;
                    continue;
                }
            };
            let Some(summary) = balance.summary else {
                tracing::warn!(account_id = %account_id, "No balance summary, skipping");
                report.skipped += 1;
                continue;
            };

            let previous = match self.history.latest_before(account_id, date).await {
                Ok(previous) => previous,
                Err(e) => {
                    tracing::error!(account_id = %account_id, error = %e, "History lookup failed");
                    report.failed += 1;
                    continue;
                }
            };

            let snapshot = DailyAssetSnapshot::from_summary(
                account_id.clone(),
                date,
                &summary,
                previous.as_ref(),
            );
            if let Err(e) = self.history.save(&snapshot).await {
                tracing::error!(account_id = %account_id, error = %e, "Snapshot save failed");
                report.failed += 1;
                continue;
            }

            tracing::info!(
                account_id = %account_id,
                total_asset = %snapshot.total_asset,
                daily_profit_loss = %snapshot.daily_profit_loss,
                "Daily asset recorded"
            );
            report.recorded += 1;
        }

        Ok(report)
    }
}

/// Dashboard sync failure.
#[derive(Debug, thiserror::Error)]
pub enum DashboardSyncError {
    /// Snapshot lookup failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    /// Sink rejected the batch.
    #[error(transparent)]
    Dashboard(#[from] DashboardError),
}

/// Use case for pushing a day's snapshots to the dashboard.
pub struct SyncDashboardUseCase<H, D>
where
    H: AssetHistoryRepository,
    D: DashboardSink + ?Sized,
{
    history: Arc<H>,
    sink: Arc<D>,
}

impl<H, D> SyncDashboardUseCase<H, D>
where
    H: AssetHistoryRepository,
    D: DashboardSink + ?Sized,
{
    /// Create a new SyncDashboardUseCase.
    pub const fn new(history: Arc<H>, sink: Arc<D>) -> Self {
        Self { history, sink }
    }

    /// Publish the snapshots of `date`; returns how many were sent.
    ///
    /// # Errors
    ///
    /// Returns the lookup or publish failure.
    pub async fn execute(&self, date: NaiveDate) -> Result<usize, DashboardSyncError> {
        let snapshots = self.history.list_for_date(date).await?;
        self.sink.publish(&snapshots).await?;
        tracing::info!(date = %date, count = snapshots.len(), "Dashboard sync finished");
        Ok(snapshots.len())
    }
}
