//! Credential Vault Adapters
//!
//! Process-local vault: secrets stay in this map and callers only ever hold
//! opaque `tok_<uuid>` references to them.

use std::collections::HashMap;

use parking_lot::RwLock;
use uuid::Uuid;

use crate::application::ports::{AppCredentials, CredentialVault, VaultError};
use crate::domain::session::SealedToken;
use crate::domain::shared::CredentialHandle;

/// In-memory implementation of `CredentialVault`.
#[derive(Debug, Default)]
pub struct InMemoryCredentialVault {
    credentials: RwLock<HashMap<String, AppCredentials>>,
    tokens: RwLock<HashMap<String, String>>,
}

impl InMemoryCredentialVault {
    /// Create an empty vault.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn reference() -> String {
        format!("tok_{}", Uuid::new_v4().simple())
    }
}

impl CredentialVault for InMemoryCredentialVault {
    fn store(&self, credentials: AppCredentials) -> CredentialHandle {
        let handle = Self::reference();
        self.credentials.write().insert(handle.clone(), credentials);
        CredentialHandle::new(handle)
    }

    fn open(&self, handle: &CredentialHandle) -> Result<AppCredentials, VaultError> {
        self.credentials
            .read()
            .get(handle.as_str())
            .cloned()
            .ok_or_else(|| VaultError::UnknownHandle {
                handle: handle.to_string(),
            })
    }

    fn seal(&self, plaintext: &str) -> SealedToken {
        let reference = Self::reference();
        self.tokens
            .write()
            .insert(reference.clone(), plaintext.to_string());
        SealedToken::new(reference)
    }

    fn unseal(&self, sealed: &SealedToken) -> Result<String, VaultError> {
        self.tokens
            .read()
            .get(sealed.as_str())
            .cloned()
            .ok_or(VaultError::Unsealable)
    }
}
