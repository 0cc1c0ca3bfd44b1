//! Engine Configuration Settings
//!
//! Configuration types for the engine, loaded from environment variables.

use std::time::Duration;

use chrono_tz::Tz;

use crate::application::ports::AppCredentials;
use crate::infrastructure::broker::kis::DEFAULT_BASE_URL;

/// Default brokerage stream base.
pub const DEFAULT_WS_URL: &str = kis_stream_relay::infrastructure::config::DEFAULT_WS_URL;

/// Deployment run mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunEnvironment {
    /// Development (default).
    #[default]
    Dev,
    /// Production; enables the dashboard sync job.
    Prd,
}

impl RunEnvironment {
    /// Parse environment from string.
    #[must_use]
    pub fn from_str_case_insensitive(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "prd" | "prod" | "production" => Self::Prd,
            _ => Self::Dev,
        }
    }

    /// Check if this is production.
    #[must_use]
    pub const fn is_production(&self) -> bool {
        matches!(self, Self::Prd)
    }

    /// Get the environment name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Prd => "prd",
        }
    }
}

/// Account loaded into the vault at startup.
#[derive(Debug, Clone)]
pub struct BootstrapAccount {
    /// App credentials and account number.
    pub credentials: AppCredentials,
    /// Real-time feed subscriber key (HTS id).
    pub feed_key: Option<String>,
}

/// Id given to the bootstrap account.
pub const BOOTSTRAP_ACCOUNT_ID: &str = "default";

/// Complete engine configuration.
#[derive(Clone)]
pub struct EngineConfig {
    /// Shared secret for the sync endpoint and primary calls.
    pub sync_api_key: String,
    /// Primary deployment; presence enables secondary mode.
    pub primary_api_url: Option<String>,
    /// Whether the timer loop runs.
    pub scheduler_enabled: bool,
    /// Run mode.
    pub environment: RunEnvironment,
    /// API port.
    pub http_port: u16,
    /// Brokerage REST base.
    pub kis_base_url: String,
    /// Brokerage stream base.
    pub kis_ws_url: String,
    /// Per-request timeout.
    pub kis_http_timeout: Duration,
    /// Wall-clock zone for triggers.
    pub timezone: Tz,
    /// Optional bootstrap account.
    pub bootstrap: Option<BootstrapAccount>,
}

impl std::fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineConfig")
            .field("sync_api_key", &"[REDACTED]")
            .field("primary_api_url", &self.primary_api_url)
            .field("scheduler_enabled", &self.scheduler_enabled)
            .field("environment", &self.environment)
            .field("http_port", &self.http_port)
            .field("kis_base_url", &self.kis_base_url)
            .field("kis_ws_url", &self.kis_ws_url)
            .field("kis_http_timeout", &self.kis_http_timeout)
            .field("timezone", &self.timezone)
            .field("bootstrap", &self.bootstrap.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl EngineConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required environment variables are missing or
    /// malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns an error if required variables are missing or malformed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let sync_api_key =
            lookup("SYNC_API_KEY").ok_or_else(|| ConfigError::MissingEnvVar("SYNC_API_KEY".to_string()))?;
        if sync_api_key.trim().is_empty() {
            return Err(ConfigError::EmptyValue("SYNC_API_KEY".to_string()));
        }

        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let timezone = match non_empty("SCHEDULER_TIMEZONE") {
            Some(name) => name
                .parse::<Tz>()
                .map_err(|_| ConfigError::InvalidValue {
                    key: "SCHEDULER_TIMEZONE".to_string(),
                    value: name,
                })?,
            None => chrono_tz::Asia::Seoul,
        };

        let bootstrap = match (
            non_empty("KIS_APP_KEY"),
            non_empty("KIS_APP_SECRET"),
            non_empty("KIS_ACCOUNT_NO"),
        ) {
            (Some(app_key), Some(app_secret), Some(account_number)) => Some(BootstrapAccount {
                credentials: AppCredentials {
                    app_key,
                    app_secret,
                    account_number,
                    product_code: non_empty("KIS_PRODUCT_CODE").unwrap_or_else(|| "01".to_string()),
                },
                feed_key: non_empty("KIS_HTS_ID"),
            }),
            (None, None, None) => None,
            _ => {
                return Err(ConfigError::InvalidValue {
                    key: "KIS_APP_KEY/KIS_APP_SECRET/KIS_ACCOUNT_NO".to_string(),
                    value: "set all three or none".to_string(),
                });
            }
        };

        Ok(Self {
            sync_api_key,
            primary_api_url: non_empty("PRIMARY_API_URL"),
            scheduler_enabled: parse_bool(non_empty("SCHEDULER_ENABLED"), true),
            environment: non_empty("APP_ENV")
                .map(|s| RunEnvironment::from_str_case_insensitive(&s))
                .unwrap_or_default(),
            http_port: parse_or(non_empty("HTTP_PORT"), 8000),
            kis_base_url: non_empty("KIS_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            kis_ws_url: non_empty("KIS_WS_URL").unwrap_or_else(|| DEFAULT_WS_URL.to_string()),
            kis_http_timeout: Duration::from_secs(parse_or(non_empty("KIS_HTTP_TIMEOUT_SECS"), 10)),
            timezone,
            bootstrap,
        })
    }

    /// Whether tokens come from a primary deployment.
    #[must_use]
    pub const fn is_secondary(&self) -> bool {
        self.primary_api_url.is_some()
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
    /// Environment variable could not be interpreted.
    #[error("invalid value for {key}: {value}")]
    InvalidValue {
        /// Variable.
        key: String,
        /// Offending value.
        value: String,
    },
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

fn parse_bool(value: Option<String>, default: bool) -> bool {
    match value.as_deref().map(str::trim).map(str::to_lowercase).as_deref() {
        Some("true" | "1" | "yes" | "on") => true,
        Some("false" | "0" | "no" | "off") => false,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<EngineConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        EngineConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_with_only_the_sync_key() {
        let config = config(&[("SYNC_API_KEY", "secret")]).unwrap();
        assert!(config.scheduler_enabled);
        assert!(!config.is_secondary());
        assert_eq!(config.environment, RunEnvironment::Dev);
        assert_eq!(config.http_port, 8000);
        assert_eq!(config.kis_base_url, DEFAULT_BASE_URL);
        assert_eq!(config.kis_ws_url, "ws://ops.koreainvestment.com:21000");
        assert_eq!(config.kis_http_timeout, Duration::from_secs(10));
        assert_eq!(config.timezone, chrono_tz::Asia::Seoul);
        assert!(config.bootstrap.is_none());
    }

    #[test]
    fn sync_key_is_required_and_non_empty() {
        assert!(matches!(config(&[]), Err(ConfigError::MissingEnvVar(_))));
        assert!(matches!(
            config(&[("SYNC_API_KEY", " ")]),
            Err(ConfigError::EmptyValue(_))
        ));
    }

    #[test]
    fn primary_url_enables_secondary_mode() {
        let config = config(&[
            ("SYNC_API_KEY", "secret"),
            ("PRIMARY_API_URL", "http://primary:8000"),
            ("APP_ENV", "prd"),
            ("SCHEDULER_ENABLED", "false"),
        ])
        .unwrap();
        assert!(config.is_secondary());
        assert!(config.environment.is_production());
        assert!(!config.scheduler_enabled);
    }

    #[test]
    fn bootstrap_account_needs_all_three_parts() {
        let partial = config(&[("SYNC_API_KEY", "s"), ("KIS_APP_KEY", "k")]);
        assert!(matches!(partial, Err(ConfigError::InvalidValue { .. })));

        let full = config(&[
            ("SYNC_API_KEY", "s"),
            ("KIS_APP_KEY", "k"),
            ("KIS_APP_SECRET", "v"),
            ("KIS_ACCOUNT_NO", "50123456"),
            ("KIS_HTS_ID", "hts01"),
        ])
        .unwrap();
        let bootstrap = full.bootstrap.unwrap();
        assert_eq!(bootstrap.credentials.product_code, "01");
        assert_eq!(bootstrap.feed_key.as_deref(), Some("hts01"));
    }

    #[test]
    fn bad_timezone_is_rejected() {
        assert!(matches!(
            config(&[("SYNC_API_KEY", "s"), ("SCHEDULER_TIMEZONE", "Mars/Olympus")]),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn debug_hides_secrets() {
        let config = config(&[("SYNC_API_KEY", "top-secret-key")]).unwrap();
        assert!(!format!("{config:?}").contains("top-secret-key"));
    }
}
