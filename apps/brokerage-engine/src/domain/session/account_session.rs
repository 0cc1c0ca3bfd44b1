//! Account session aggregate.

use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};

use crate::domain::shared::{AccountId, CredentialHandle};

/// Safety margin applied to ad-hoc token use.
pub const AD_HOC_MARGIN: TimeDelta = TimeDelta::seconds(60);

/// Remaining lifetime below which the hourly sweep refreshes a token.
pub const SWEEP_MARGIN: TimeDelta = TimeDelta::hours(1);

/// Token lifetime assumed when the issuer omits `expires_in`.
pub const DEFAULT_TOKEN_LIFETIME: TimeDelta = TimeDelta::seconds(86_400);

/// Bearer token sealed by the credential vault.
#[derive(Clone, PartialEq, Eq)]
pub struct SealedToken(String);

impl SealedToken {
    /// Wrap vault output.
    #[must_use]
    pub fn new(sealed: impl Into<String>) -> Self {
        Self(sealed.into())
    }

    /// Sealed representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SealedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SealedToken([REDACTED])")
    }
}

/// A sealed token and its expiry. A token never exists without an expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    /// Vault-sealed bearer token.
    pub sealed: SealedToken,
    /// Absolute expiry.
    pub expires_at: DateTime<Utc>,
}

/// Session state of one brokerage account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSession {
    account_id: AccountId,
    credential: CredentialHandle,
    feed_key: Option<String>,
    token: Option<IssuedToken>,
}

impl AccountSession {
    /// Create a session with no token yet.
    #[must_use]
    pub const fn new(account_id: AccountId, credential: CredentialHandle) -> Self {
        Self {
            account_id,
            credential,
            feed_key: None,
            token: None,
        }
    }

    /// Attach the real-time feed subscriber key (HTS id).
    #[must_use]
    pub fn with_feed_key(mut self, feed_key: impl Into<String>) -> Self {
        self.feed_key = Some(feed_key.into());
        self
    }

    /// Account identifier.
    #[must_use]
    pub const fn account_id(&self) -> &AccountId {
        &self.account_id
    }

    /// Vault handle of the account's credentials.
    #[must_use]
    pub const fn credential(&self) -> &CredentialHandle {
        &self.credential
    }

    /// Real-time feed subscriber key, if any.
    #[must_use]
    pub fn feed_key(&self) -> Option<&str> {
        self.feed_key.as_deref()
    }

    /// Current token, if one was ever issued.
    #[must_use]
    pub const fn token(&self) -> Option<&IssuedToken> {
        self.token.as_ref()
    }

    /// Whether the token can be used at `now` with `margin` to spare.
    #[must_use]
    pub fn is_usable(&self, now: DateTime<Utc>, margin: TimeDelta) -> bool {
        self.token
            .as_ref()
            .is_some_and(|t| now < t.expires_at - margin)
    }

    /// Whether the sweep should refresh this session.
    ///
    /// Sessions that never obtained a token are left to on-demand refresh.
    #[must_use]
    pub fn due_for_sweep(&self, now: DateTime<Utc>, margin: TimeDelta) -> bool {
        self.token
            .as_ref()
            .is_some_and(|t| t.expires_at - now < margin)
    }

    /// Replace the token.
    pub fn store_token(&mut self, sealed: SealedToken, expires_at: DateTime<Utc>) {
        self.token = Some(IssuedToken { sealed, expires_at });
    }
}
