//! Relay Configuration

/// Default KIS real-time endpoint.
pub const DEFAULT_WS_URL: &str = "ws://ops.koreainvestment.com:21000";

/// Path appended to the base URL when connecting.
pub const DEFAULT_WS_PATH: &str = "/tryitout/H0STCNT0";

/// Settings for the upstream connection and downstream fan-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    /// WebSocket base URL (scheme, host, port).
    pub base_url: String,
    /// Path of the real-time endpoint.
    pub path: String,
    /// Customer type sent in registration frames (`P` = individual).
    pub customer_type: String,
    /// Buffered events per downstream sink before messages are dropped.
    pub sink_capacity: usize,
}

impl RelayConfig {
    /// Create a configuration for the given base URL with default path.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Full connection URL.
    #[must_use]
    pub fn url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.path)
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_WS_URL.to_string(),
            path: DEFAULT_WS_PATH.to_string(),
            customer_type: "P".to_string(),
            sink_capacity: 256,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_url() {
        assert_eq!(
            RelayConfig::default().url(),
            "ws://ops.koreainvestment.com:21000/tryitout/H0STCNT0"
        );
    }

    #[test]
    fn custom_base_url_keeps_path() {
        let config = RelayConfig::new("ws://127.0.0.1:9000/");
        assert_eq!(config.url(), "ws://127.0.0.1:9000/tryitout/H0STCNT0");
        assert_eq!(config.customer_type, "P");
    }
}
