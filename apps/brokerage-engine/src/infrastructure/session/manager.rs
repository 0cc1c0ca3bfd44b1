//! Session Lifecycle Manager
//!
//! Owns every account's bearer token. Callers ask for a token and suspend
//! until a usable one exists; refreshes go to the primary deployment first
//! when one is configured, then directly to the brokerage.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeDelta, Utc};

use super::issuer::{BearerToken, DirectTokenIssuer, PrimaryTokenSource};
use crate::application::ports::{
    AppCredentials, AuthorizedAccount, CredentialVault, SessionError, TokenProvider,
};
use crate::domain::session::{AD_HOC_MARGIN, AccountRepository, AccountSession};
use crate::domain::shared::AccountId;
use crate::infrastructure::metrics;

/// Outcome of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Sessions inspected.
    pub checked: usize,
    /// Sessions refreshed.
    pub refreshed: usize,
    /// Sessions whose refresh failed.
    pub failed: usize,
}

/// Session lifecycle manager.
pub struct SessionManager {
    accounts: Arc<dyn AccountRepository>,
    vault: Arc<dyn CredentialVault>,
    direct: DirectTokenIssuer,
    primary: Option<PrimaryTokenSource>,
}

impl SessionManager {
    /// Create a manager that refreshes directly against the brokerage.
    #[must_use]
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        vault: Arc<dyn CredentialVault>,
        direct: DirectTokenIssuer,
    ) -> Self {
        Self {
            accounts,
            vault,
            direct,
            primary: None,
        }
    }

    /// Operate in secondary mode, fetching tokens from `primary` first.
    #[must_use]
    pub fn with_primary(mut self, primary: PrimaryTokenSource) -> Self {
        self.primary = Some(primary);
        self
    }

    /// Whether a primary deployment is configured.
    #[must_use]
    pub const fn is_secondary(&self) -> bool {
        self.primary.is_some()
    }

    /// Seal `credentials` into the vault and register a session without a
    /// token.
    pub async fn register_account(
        &self,
        account_id: AccountId,
        credentials: AppCredentials,
        feed_key: Option<String>,
    ) -> Result<AccountSession, SessionError> {
        if !credentials.is_complete() {
            return Err(SessionError::CredentialMissing {
                account_id: account_id.to_string(),
            });
        }
        let handle = self.vault.store(credentials);
        let mut session = AccountSession::new(account_id, handle);
        if let Some(key) = feed_key {
            session = session.with_feed_key(key);
        }
        self.accounts.save(&session).await?;
        tracing::info!(account_id = %session.account_id(), "Account registered");
        Ok(session)
    }

    /// A token usable for at least the ad-hoc margin, refreshing first when
    /// the cached one is not.
    pub async fn get_token(&self, account: &AccountId) -> Result<BearerToken, SessionError> {
        let session = self.session(account).await?;
        self.ensure_token(session).await
    }

    /// Refresh every session whose token expires within `margin`.
    ///
    /// One account's failure never stops the sweep.
    pub async fn check_and_refresh_all_accounts(
        &self,
        margin: TimeDelta,
    ) -> Result<SweepReport, SessionError> {
        let sessions = self.accounts.list().await?;
        let now = Utc::now();
        let mut report = SweepReport {
            checked: sessions.len(),
            ..SweepReport::default()
        };

        for session in sessions {
            if !session.due_for_sweep(now, margin) {
                continue;
            }
            let account_id = session.account_id().clone();
            match self.refresh(session).await {
                Ok(token) => {
                    report.refreshed += 1;
                    tracing::info!(
                        account_id = %account_id,
                        expires_at = %token.expires_at,
                        "Token refreshed by sweep"
                    );
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::error!(account_id = %account_id, error = %e, "Sweep refresh failed");
                }
            }
        }

        tracing::info!(
            checked = report.checked,
            refreshed = report.refreshed,
            failed = report.failed,
            "Token sweep finished"
        );
        Ok(report)
    }

    /// Token of the account whose decrypted account number matches, for
    /// the sync endpoint. `None` when no account matches.
    pub async fn token_for_account_number(
        &self,
        account_number: &str,
    ) -> Result<Option<BearerToken>, SessionError> {
        for session in self.accounts.list().await? {
            let Ok(credentials) = self.vault.open(session.credential()) else {
                continue;
            };
            if credentials.account_number == account_number {
                return self.ensure_token(session).await.map(Some);
            }
        }
        Ok(None)
    }

    async fn session(&self, account: &AccountId) -> Result<AccountSession, SessionError> {
        self.accounts
            .find(account)
            .await?
            .ok_or_else(|| SessionError::AccountNotFound {
                account_id: account.to_string(),
            })
    }

    fn open_credentials(&self, session: &AccountSession) -> Result<AppCredentials, SessionError> {
        let missing = || SessionError::CredentialMissing {
            account_id: session.account_id().to_string(),
        };
        let credentials = self.vault.open(session.credential()).map_err(|e| {
            tracing::error!(account_id = %session.account_id(), error = %e, "Credentials unavailable");
            missing()
        })?;
        if credentials.is_complete() {
            Ok(credentials)
        } else {
            Err(missing())
        }
    }

    async fn ensure_token(&self, session: AccountSession) -> Result<BearerToken, SessionError> {
        if session.is_usable(Utc::now(), AD_HOC_MARGIN)
            && let Some(token) = session.token()
        {
            match self.vault.unseal(&token.sealed) {
                Ok(access_token) => {
                    return Ok(BearerToken {
                        access_token,
                        expires_at: token.expires_at,
                    });
                }
                Err(e) => tracing::warn!(
                    account_id = %session.account_id(),
                    error = %e,
                    "Cached token unsealable, refreshing"
                ),
            }
        }
        self.refresh(session).await
    }

    /// Obtain a fresh token and persist it. A concurrent refresh of the same
    /// account simply overwrites.
    async fn refresh(&self, mut session: AccountSession) -> Result<BearerToken, SessionError> {
        let credentials = self.open_credentials(&session)?;
        let account_id = session.account_id().clone();

        let token = match self.from_primary(&account_id, &credentials).await {
            Some(token) => token,
            None => {
                let issued = self.direct.issue(&credentials).await;
                metrics::record_token_refresh("direct", issued.is_ok());
                issued.map_err(|e| SessionError::TokenRefreshFailed {
                    account_id: account_id.to_string(),
                    reason: e.to_string(),
                })?
            }
        };

        session.store_token(self.vault.seal(&token.access_token), token.expires_at);
        self.accounts.save(&session).await?;
        tracing::info!(
            account_id = %account_id,
            expires_at = %token.expires_at,
            "Token stored"
        );
        Ok(token)
    }

    async fn from_primary(
        &self,
        account_id: &AccountId,
        credentials: &AppCredentials,
    ) -> Option<BearerToken> {
        let primary = self.primary.as_ref()?;
        match primary.fetch(&credentials.account_number).await {
            Ok(token) => {
                metrics::record_token_refresh("primary", true);
                tracing::info!(account_id = %account_id, "Token synced from primary");
                Some(token)
            }
            Err(e) => {
                metrics::record_token_refresh("primary", false);
                tracing::warn!(
                    account_id = %account_id,
                    primary = %primary.base_url(),
                    error = %e,
                    "PRIMARY SYNC FAILED, falling back to direct brokerage refresh; concurrent refreshes may churn tokens"
                );
                None
            }
        }
    }
}

#[async_trait]
impl TokenProvider for SessionManager {
    async fn authorize(&self, account: &AccountId) -> Result<AuthorizedAccount, SessionError> {
        let session = self.session(account).await?;
        let credentials = self.open_credentials(&session)?;
        let token = self.ensure_token(session).await?;
        Ok(AuthorizedAccount {
            bearer: token.access_token,
            credentials,
        })
    }

    async fn credentials(&self, account: &AccountId) -> Result<AppCredentials, SessionError> {
        let session = self.session(account).await?;
        self.open_credentials(&session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::persistence::InMemoryAccountRepository;
    use crate::infrastructure::vault::InMemoryCredentialVault;
    use std::time::Duration;

    fn manager() -> SessionManager {
        SessionManager::new(
            Arc::new(InMemoryAccountRepository::new()),
            Arc::new(InMemoryCredentialVault::new()),
            DirectTokenIssuer::new("http://127.0.0.1:9", Duration::from_millis(200)).unwrap(),
        )
    }

    fn credentials() -> AppCredentials {
        AppCredentials {
            app_key: "key".to_string(),
            app_secret: "secret".to_string(),
            account_number: "50123456".to_string(),
            product_code: "01".to_string(),
        }
    }

    #[tokio::test]
    async fn unknown_account_is_not_found() {
        let err = manager().get_token(&AccountId::from("ghost")).await.unwrap_err();
        assert!(matches!(err, SessionError::AccountNotFound { .. }));
    }

    #[tokio::test]
    async fn incomplete_credentials_are_rejected_at_registration() {
        let mut creds = credentials();
        creds.app_secret.clear();
        let err = manager()
            .register_account(AccountId::from("a"), creds, None)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::CredentialMissing { .. }));
    }

    #[tokio::test]
    async fn sweep_skips_sessions_without_tokens() {
        let manager = manager();
        manager
            .register_account(AccountId::from("a"), credentials(), Some("hts".to_string()))
            .await
            .unwrap();
        let report = manager
            .check_and_refresh_all_accounts(TimeDelta::hours(1))
            .await
            .unwrap();
        assert_eq!(
            report,
            SweepReport {
                checked: 1,
                refreshed: 0,
                failed: 0
            }
        );
    }

    #[tokio::test]
    async fn unmatched_account_number_yields_none() {
        let manager = manager();
        manager
            .register_account(AccountId::from("a"), credentials(), None)
            .await
            .unwrap();
        assert!(manager.token_for_account_number("99999999").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn credentials_are_opened_from_the_vault() {
        let manager = manager();
        manager
            .register_account(AccountId::from("a"), credentials(), None)
            .await
            .unwrap();
        assert_eq!(
            manager.credentials(&AccountId::from("a")).await.unwrap(),
            credentials()
        );
    }
}
