//! Account session repository trait.

use async_trait::async_trait;

use super::AccountSession;
use crate::domain::shared::{AccountId, RepositoryError};

/// Persistence for account sessions. Sessions are never deleted here.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Find one session.
    async fn find(&self, id: &AccountId) -> Result<Option<AccountSession>, RepositoryError>;

    /// All sessions, ordered by account id.
    async fn list(&self) -> Result<Vec<AccountSession>, RepositoryError>;

    /// Insert or replace a session.
    async fn save(&self, session: &AccountSession) -> Result<(), RepositoryError>;
}
