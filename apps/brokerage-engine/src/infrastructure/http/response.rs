//! HTTP response DTOs and error mapping.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::application::ports::{GatewayError, SessionError};
use crate::domain::order_plan::PlanError;
use crate::domain::shared::RepositoryError;
use crate::infrastructure::scheduler::{JobError, JobRecord, JobView};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Status.
    pub status: String,
    /// Version.
    pub version: String,
}

/// Error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error category.
    pub error: String,
    /// Brokerage code, when the brokerage supplied one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Human-readable message.
    pub message: String,
}

/// A registered job.
#[derive(Debug, Clone, Serialize)]
pub struct JobSummary {
    /// Job id.
    pub id: &'static str,
    /// Description.
    pub description: &'static str,
}

/// Result of a manual job run.
#[derive(Debug, Clone, Serialize)]
pub struct JobRunResponse {
    /// Job id.
    pub job: &'static str,
    /// `SUCCESS` or `FAILED`.
    pub status: &'static str,
    /// Summary or error text.
    pub message: String,
}

/// System status.
#[derive(Debug, Clone, Serialize)]
pub struct SystemStatusResponse {
    /// Wall-clock time in the scheduler zone.
    pub server_time: String,
    /// Scheduler zone.
    pub timezone: String,
    /// `prd` or `dev`.
    pub run_mode: String,
    /// Whether the timer loop is enabled.
    pub scheduler_enabled: bool,
    /// Whether tokens come from a primary deployment.
    pub secondary_mode: bool,
    /// Upstream stream state.
    pub relay_state: &'static str,
    /// Downstream sinks attached.
    pub relay_sinks: usize,
    /// Registered jobs with next and last runs.
    pub jobs: Vec<JobView>,
    /// Recent runs, newest first.
    pub history: Vec<JobRecord>,
}

/// Price subscription result.
#[derive(Debug, Clone, Serialize)]
pub struct SubscribeResponse {
    /// Codes registered upstream.
    pub subscribed: Vec<String>,
    /// Codes ignored.
    pub skipped: Vec<String>,
}

// =============================================================================
// Errors
// =============================================================================

/// Error returned by a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// 400.
    BadRequest(String),
    /// 403.
    Forbidden(String),
    /// 404.
    NotFound(String),
    /// 409.
    Conflict(String),
    /// 502 with the brokerage's detail.
    Broker {
        /// Brokerage code, if any.
        code: Option<String>,
        /// Brokerage message or transport detail.
        message: String,
    },
    /// 503.
    Unavailable(String),
    /// 500.
    Internal(String),
}

impl ApiError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Broker { .. } => StatusCode::BAD_GATEWAY,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    const fn category(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Broker { .. } => "broker_request_failed",
            Self::Unavailable(_) => "unavailable",
            Self::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = self.category().to_string();
        let (code, message) = match self {
            Self::Broker { code, message } => (code, message),
            Self::BadRequest(m)
            | Self::Forbidden(m)
            | Self::NotFound(m)
            | Self::Conflict(m)
            | Self::Unavailable(m)
            | Self::Internal(m) => (None, m),
        };
        (
            status,
            Json(ErrorResponse {
                error,
                code,
                message,
            }),
        )
            .into_response()
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::AccountNotFound { .. } => Self::NotFound(err.to_string()),
            SessionError::CredentialMissing { .. } => Self::BadRequest(err.to_string()),
            SessionError::TokenRefreshFailed { .. } => Self::Broker {
                code: None,
                message: err.to_string(),
            },
            SessionError::Vault(_) | SessionError::Repository(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::BrokerRequestFailed { code, message, .. } => Self::Broker {
                code: Some(code).filter(|c| !c.is_empty()),
                message,
            },
            GatewayError::Session(e) => e.into(),
            GatewayError::Transport(_) | GatewayError::Decode(_) => Self::Broker {
                code: None,
                message: err.to_string(),
            },
        }
    }
}

impl From<PlanError> for ApiError {
    fn from(err: PlanError) -> Self {
        match err {
            PlanError::InvalidTarget { .. } | PlanError::InvalidTransition { .. } => {
                Self::BadRequest(err.to_string())
            }
            PlanError::NotFound { .. } => Self::NotFound(err.to_string()),
            PlanError::Repository(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<JobError> for ApiError {
    fn from(err: JobError) -> Self {
        match err {
            JobError::AlreadyRunning { .. } => Self::Conflict(err.to_string()),
            JobError::NotRegistered { .. } => Self::NotFound(err.to_string()),
            JobError::Failed { .. } => Self::Internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order_plan::PlanStatus;
    use crate::infrastructure::scheduler::JobKind;

    #[test]
    fn broker_failure_is_bad_gateway_with_code() {
        let err: ApiError = GatewayError::BrokerRequestFailed {
            status: None,
            code: "APBK0919".to_string(),
            message: "주문가능금액을 초과 했습니다".to_string(),
        }
        .into();
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            err,
            ApiError::Broker {
                code: Some("APBK0919".to_string()),
                message: "주문가능금액을 초과 했습니다".to_string(),
            }
        );
    }

    #[test]
    fn unknown_account_is_not_found() {
        let err: ApiError = GatewayError::Session(SessionError::AccountNotFound {
            account_id: "ghost".to_string(),
        })
        .into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn plan_errors_map_to_client_errors() {
        let transition: ApiError = PlanError::InvalidTransition {
            from: PlanStatus::Completed,
            to: PlanStatus::Cancelled,
        }
        .into();
        assert_eq!(transition.status(), StatusCode::BAD_REQUEST);

        let missing: ApiError = PlanError::NotFound {
            plan_id: "p".to_string(),
        }
        .into();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn running_job_is_conflict() {
        let err: ApiError = JobError::AlreadyRunning {
            job: JobKind::DailyBuy,
        }
        .into();
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }
}
