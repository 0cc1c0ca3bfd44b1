//! Execution log trait.

use async_trait::async_trait;

use super::ExecutionAttempt;
use crate::domain::shared::{PlanId, RepositoryError};

/// Append-only store of execution attempts.
#[async_trait]
pub trait ExecutionLog: Send + Sync {
    /// Append one record.
    async fn append(&self, attempt: ExecutionAttempt) -> Result<(), RepositoryError>;

    /// Number of SUCCESS records tagged with `plan`.
    async fn count_successes(&self, plan: &PlanId) -> Result<usize, RepositoryError>;

    /// Records newest first, skipping `skip` and returning at most `limit`.
    async fn page(&self, skip: usize, limit: usize)
    -> Result<Vec<ExecutionAttempt>, RepositoryError>;
}
