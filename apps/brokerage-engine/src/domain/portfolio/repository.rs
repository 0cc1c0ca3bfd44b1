//! Asset history repository trait.

use async_trait::async_trait;
use chrono::NaiveDate;

use super::DailyAssetSnapshot;
use crate::domain::shared::{AccountId, RepositoryError};

/// Persistence for daily asset snapshots.
#[async_trait]
pub trait AssetHistoryRepository: Send + Sync {
    /// Latest snapshot of `account` strictly before `date`.
    async fn latest_before(
        &self,
        account: &AccountId,
        date: NaiveDate,
    ) -> Result<Option<DailyAssetSnapshot>, RepositoryError>;

    /// Insert a snapshot, replacing any for the same account and date.
    async fn save(&self, snapshot: &DailyAssetSnapshot) -> Result<(), RepositoryError>;

    /// All snapshots recorded for `date`.
    async fn list_for_date(&self, date: NaiveDate)
    -> Result<Vec<DailyAssetSnapshot>, RepositoryError>;
}
