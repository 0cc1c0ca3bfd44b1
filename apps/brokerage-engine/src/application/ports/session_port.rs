//! Session Port (Driven Port)
//!
//! Supplies bearer tokens and signing material to the brokerage gateway.

use async_trait::async_trait;

use super::vault_port::{AppCredentials, VaultError};
use crate::domain::shared::{AccountId, RepositoryError};

/// Session lifecycle failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The account has no usable credential material. Not retryable.
    #[error("credentials missing for account {account_id}")]
    CredentialMissing {
        /// Account.
        account_id: String,
    },

    /// No session is registered for the account.
    #[error("account not found: {account_id}")]
    AccountNotFound {
        /// Account.
        account_id: String,
    },

    /// The token issuer refused or returned something unusable.
    #[error("token refresh failed for account {account_id}: {reason}")]
    TokenRefreshFailed {
        /// Account.
        account_id: String,
        /// Issuer message or transport failure.
        reason: String,
    },

    /// Vault failure.
    #[error(transparent)]
    Vault(#[from] VaultError),

    /// Storage failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Everything a signed brokerage call needs for one account.
#[derive(Debug, Clone)]
pub struct AuthorizedAccount {
    /// Plaintext bearer token, valid for at least the ad-hoc margin.
    pub bearer: String,
    /// Decrypted app credentials and account number.
    pub credentials: AppCredentials,
}

/// Source of usable tokens.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Valid token plus signing material, refreshing first when needed.
    async fn authorize(&self, account: &AccountId) -> Result<AuthorizedAccount, SessionError>;

    /// Signing material only; no token is issued.
    async fn credentials(&self, account: &AccountId) -> Result<AppCredentials, SessionError>;
}
