//! Credential Vault Port (Driven Port)
//!
//! App keys, account numbers and bearer tokens are only ever held sealed.
//! Plaintext leaves the vault for the duration of one call.

use std::fmt;

use crate::domain::session::SealedToken;
use crate::domain::shared::CredentialHandle;

/// Vault failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VaultError {
    /// Handle does not resolve to any credential set.
    #[error("unknown credential handle: {handle}")]
    UnknownHandle {
        /// Requested handle.
        handle: String,
    },

    /// Sealed material could not be opened.
    #[error("sealed value could not be opened")]
    Unsealable,
}

/// Decrypted per-account app credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct AppCredentials {
    /// Brokerage app key.
    pub app_key: String,
    /// Brokerage app secret.
    pub app_secret: String,
    /// Account number (CANO).
    pub account_number: String,
    /// Account product code.
    pub product_code: String,
}

impl AppCredentials {
    /// Whether every field needed to sign a request is present.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.app_key.is_empty() && !self.app_secret.is_empty() && !self.account_number.is_empty()
    }
}

impl fmt::Debug for AppCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppCredentials")
            .field("app_key", &"[REDACTED]")
            .field("app_secret", &"[REDACTED]")
            .field("account_number", &"[REDACTED]")
            .field("product_code", &self.product_code)
            .finish()
    }
}

/// Credential vault.
pub trait CredentialVault: Send + Sync {
    /// Store a credential set and return its handle.
    fn store(&self, credentials: AppCredentials) -> CredentialHandle;

    /// Decrypt a credential set.
    fn open(&self, handle: &CredentialHandle) -> Result<AppCredentials, VaultError>;

    /// Seal a bearer token for storage.
    fn seal(&self, plaintext: &str) -> SealedToken;

    /// Open a sealed bearer token.
    fn unseal(&self, sealed: &SealedToken) -> Result<String, VaultError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_hides_secrets() {
        let creds = AppCredentials {
            app_key: "PSkey".to_string(),
            app_secret: "s3cr3t-value".to_string(),
            account_number: "50123456".to_string(),
            product_code: "01".to_string(),
        };
        let debug = format!("{creds:?}");
        assert!(!debug.contains("PSkey"));
        assert!(!debug.contains("s3cr3t-value"));
        assert!(!debug.contains("50123456"));
        assert!(creds.is_complete());
    }
}
