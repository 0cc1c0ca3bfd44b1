//! KIS-specific error types.

use thiserror::Error;

use crate::application::ports::{GatewayError, SessionError};

/// Errors from the KIS adapter.
#[derive(Debug, Error, Clone)]
pub enum KisError {
    /// HTTP 200 with a non-zero `rt_cd`.
    #[error("KIS error: {message} ({code})")]
    Api {
        /// `msg_cd`.
        code: String,
        /// `msg1`.
        message: String,
    },

    /// Non-2xx response.
    #[error("KIS HTTP error ({status}): {message}")]
    Http {
        /// HTTP status.
        status: u16,
        /// Structured code, or the status code as text.
        code: String,
        /// Structured message, or the reason text.
        message: String,
    },

    /// Request never got a response.
    #[error("network error: {0}")]
    Network(String),

    /// Success body did not match the expected shape.
    #[error("JSON parsing error: {0}")]
    JsonParse(String),

    /// No usable session.
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl From<KisError> for GatewayError {
    fn from(err: KisError) -> Self {
        match err {
            KisError::Api { code, message } => Self::BrokerRequestFailed {
                status: None,
                code,
                message,
            },
            KisError::Http {
                status,
                code,
                message,
            } => Self::BrokerRequestFailed {
                status: Some(status),
                code,
                message,
            },
            KisError::Network(msg) => Self::Transport(msg),
            KisError::JsonParse(msg) => Self::Decode(msg),
            KisError::Session(e) => Self::Session(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_becomes_broker_request_failed() {
        let err: GatewayError = KisError::Api {
            code: "40310000".to_string(),
            message: "모의투자 미신청계좌입니다.".to_string(),
        }
        .into();
        assert_eq!(
            err,
            GatewayError::BrokerRequestFailed {
                status: None,
                code: "40310000".to_string(),
                message: "모의투자 미신청계좌입니다.".to_string(),
            }
        );
    }

    #[test]
    fn http_error_keeps_status() {
        let err: GatewayError = KisError::Http {
            status: 500,
            code: "500".to_string(),
            message: "Internal Server Error".to_string(),
        }
        .into();
        assert!(matches!(
            err,
            GatewayError::BrokerRequestFailed {
                status: Some(500),
                ..
            }
        ));
    }

    #[test]
    fn network_error_is_transport() {
        let err: GatewayError = KisError::Network("refused".to_string()).into();
        assert!(matches!(err, GatewayError::Transport(_)));
    }
}
