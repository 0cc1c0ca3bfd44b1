//! Token issuers: the brokerage OAuth endpoint and a primary deployment.

use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};

use crate::application::ports::AppCredentials;
use crate::domain::session::DEFAULT_TOKEN_LIFETIME;

/// Header carrying the shared sync secret.
pub const SYNC_KEY_HEADER: &str = "x-sync-key";

/// Timeout of a call to the primary deployment.
pub const PRIMARY_TIMEOUT: Duration = Duration::from_secs(5);

/// Plaintext bearer token and its absolute expiry.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BearerToken {
    /// Bearer token.
    pub access_token: String,
    /// Absolute expiry.
    #[serde(rename = "expired_at")]
    pub expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerToken")
            .field("access_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Issuer failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IssuerError {
    /// Request never got a response.
    #[error("network error: {0}")]
    Network(String),

    /// Non-2xx response.
    #[error("HTTP {status}: {message}")]
    Status {
        /// HTTP status.
        status: u16,
        /// Issuer message or reason text.
        message: String,
    },

    /// Body did not carry a token.
    #[error("malformed token response: {0}")]
    Malformed(String),
}

// =============================================================================
// Direct issuer
// =============================================================================

#[derive(Serialize)]
struct TokenRequest<'a> {
    grant_type: &'static str,
    appkey: &'a str,
    appsecret: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<i64>,
}

#[derive(Default, Deserialize)]
struct TokenErrorBody {
    error_description: Option<String>,
    error_code: Option<String>,
}

/// Client-credentials grant against the brokerage (`/oauth2/tokenP`).
#[derive(Debug, Clone)]
pub struct DirectTokenIssuer {
    client: Client,
    base_url: String,
}

impl DirectTokenIssuer {
    /// Create an issuer for the given brokerage base URL.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, IssuerError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IssuerError::Network(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Issue a new token. Never retries.
    pub async fn issue(&self, credentials: &AppCredentials) -> Result<BearerToken, IssuerError> {
        let request = TokenRequest {
            grant_type: "client_credentials",
            appkey: &credentials.app_key,
            appsecret: &credentials.app_secret,
        };
        let response = self
            .client
            .post(format!("{}/oauth2/tokenP", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| IssuerError::Network(e.to_string()))?;

        let text = success_text(response, |text| {
            serde_json::from_str::<TokenErrorBody>(text)
                .ok()
                .and_then(|b| match (b.error_description, b.error_code) {
                    (Some(desc), Some(code)) => Some(format!("{desc} ({code})")),
                    (desc, code) => desc.or(code),
                })
        })
        .await?;

        let parsed: TokenResponse =
            serde_json::from_str(&text).map_err(|e| IssuerError::Malformed(e.to_string()))?;
        let access_token = parsed
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| IssuerError::Malformed("missing access_token".to_string()))?;
        let lifetime = match parsed.expires_in {
            None => Some(DEFAULT_TOKEN_LIFETIME),
            Some(secs) => TimeDelta::try_seconds(secs),
        };
        let expires_at = lifetime
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
            .ok_or_else(|| {
                IssuerError::Malformed(format!("expires_in out of range: {:?}", parsed.expires_in))
            })?;

        Ok(BearerToken {
            access_token,
            expires_at,
        })
    }
}

// =============================================================================
// Primary deployment
// =============================================================================

#[derive(Deserialize)]
struct SyncResponse {
    access_token: Option<String>,
    expired_at: Option<String>,
}

/// Fetches ready-made tokens from a primary deployment's sync endpoint.
#[derive(Clone)]
pub struct PrimaryTokenSource {
    client: Client,
    base_url: String,
    sync_key: String,
}

impl std::fmt::Debug for PrimaryTokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrimaryTokenSource")
            .field("base_url", &self.base_url)
            .field("sync_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl PrimaryTokenSource {
    /// Create a source for the primary at `base_url`.
    pub fn new(base_url: impl Into<String>, sync_key: impl Into<String>) -> Result<Self, IssuerError> {
        let client = Client::builder()
            .timeout(PRIMARY_TIMEOUT)
            .build()
            .map_err(|e| IssuerError::Network(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            sync_key: sync_key.into(),
        })
    }

    /// Primary base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the primary's current token for `account_number`.
    pub async fn fetch(&self, account_number: &str) -> Result<BearerToken, IssuerError> {
        let response = self
            .client
            .get(format!("{}/v1/sync/kis-token/{account_number}", self.base_url))
            .header(SYNC_KEY_HEADER, &self.sync_key)
            .send()
            .await
            .map_err(|e| IssuerError::Network(e.to_string()))?;

        let text = success_text(response, |_| None).await?;
        let parsed: SyncResponse =
            serde_json::from_str(&text).map_err(|e| IssuerError::Malformed(e.to_string()))?;

        match (parsed.access_token, parsed.expired_at) {
            (Some(access_token), Some(expired_at)) if !access_token.is_empty() => {
                let expires_at = parse_expiry(&expired_at).ok_or_else(|| {
                    IssuerError::Malformed(format!("unparseable expired_at: {expired_at}"))
                })?;
                Ok(BearerToken {
                    access_token,
                    expires_at,
                })
            }
            _ => Err(IssuerError::Malformed(
                "missing access_token or expired_at".to_string(),
            )),
        }
    }
}

/// Body of a 2xx response, or a `Status` error using `describe` for the
/// message when it can extract one.
async fn success_text(
    response: Response,
    describe: impl FnOnce(&str) -> Option<String>,
) -> Result<String, IssuerError> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| IssuerError::Network(e.to_string()))?;
    if status.is_success() {
        return Ok(text);
    }
    let message = describe(&text)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown").to_string());
    Err(IssuerError::Status {
        status: status.as_u16(),
        message,
    })
}

/// RFC 3339, or a naive ISO timestamp taken as UTC.
fn parse_expiry(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn expiry_accepts_rfc3339_and_naive() {
        let expected = Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0).unwrap();
        assert_eq!(parse_expiry("2026-03-02T09:30:00Z"), Some(expected));
        assert_eq!(parse_expiry("2026-03-02T18:30:00+09:00"), Some(expected));
        assert_eq!(parse_expiry("2026-03-02T09:30:00"), Some(expected));
        assert_eq!(parse_expiry("2026-03-02T09:30:00.250").map(|d| d.timestamp()), Some(expected.timestamp()));
        assert_eq!(parse_expiry("tomorrow"), None);
    }

    #[test]
    fn bearer_token_serializes_as_sync_body() {
        let token = BearerToken {
            access_token: "abc".to_string(),
            expires_at: Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0).unwrap(),
        };
        let json = serde_json::to_value(&token).unwrap();
        assert_eq!(json["access_token"], "abc");
        assert_eq!(json["expired_at"], "2026-03-02T09:30:00Z");
        assert!(!format!("{token:?}").contains("abc"));
    }
}
