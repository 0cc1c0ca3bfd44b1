//! KIS adapter configuration.

use std::time::Duration;

use chrono_tz::Tz;

/// Production REST endpoint.
pub const DEFAULT_BASE_URL: &str = "https://openapi.koreainvestment.com:9443";

/// Configuration for the KIS broker adapter.
#[derive(Debug, Clone)]
pub struct KisConfig {
    /// REST base URL.
    pub base_url: String,
    /// HTTP request timeout.
    pub timeout: Duration,
    /// Delay before each GET.
    pub get_pacing: Duration,
    /// Delay before each order POST.
    pub post_pacing: Duration,
    /// Customer type header (`P` personal).
    pub customer_type: String,
    /// Exchange-local zone used for "today".
    pub timezone: Tz,
}

impl KisConfig {
    /// Create a configuration for `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(10),
            get_pacing: Duration::from_millis(100),
            post_pacing: Duration::from_millis(200),
            customer_type: "P".to_string(),
            timezone: chrono_tz::Asia::Seoul,
        }
    }

    /// Set the HTTP timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set GET and POST pacing.
    #[must_use]
    pub const fn with_pacing(mut self, get: Duration, post: Duration) -> Self {
        self.get_pacing = get;
        self.post_pacing = post;
        self
    }

    /// Set the exchange-local zone.
    #[must_use]
    pub const fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }
}

impl Default for KisConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}
