//! HTTP Controller (Driver Adapter)
//!
//! Axum-based REST API that delegates to application use cases, plus the
//! operational surfaces: token sync, manual job runs and system status.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use kis_stream_relay::RelayClient;
use subtle::ConstantTimeEq;

use crate::application::dto::{CreatePlanDto, PlaceOrderDto, PlanDto};
use crate::application::ports::{BrokerPort, RevisionRequest};
use crate::application::use_cases::{ManagePlansUseCase, ManualTradingUseCase};
use crate::domain::order_plan::PlanRepository;
use crate::domain::portfolio::AssetHistoryRepository;
use crate::domain::session::AccountRepository;
use crate::domain::shared::{AccountId, PlanId};
use crate::domain::trading::ExecutionLog;
use crate::infrastructure::metrics;
use crate::infrastructure::scheduler::{EngineJobs, JobError, JobKind, Scheduler};
use crate::infrastructure::session::{SYNC_KEY_HEADER, SessionManager};

use super::request::{PlanListQuery, TradeLogQuery};
use super::response::{
    ApiError, HealthResponse, JobRunResponse, JobSummary, SystemStatusResponse,
};
use super::ws;

/// Recent runs included in the status page.
const STATUS_HISTORY_LIMIT: usize = 20;

/// Run-mode flags shown on the status page.
#[derive(Debug, Clone)]
pub struct RunMode {
    /// `APP_ENV` value.
    pub app_env: String,
    /// Whether the timer loop runs.
    pub scheduler_enabled: bool,
}

/// Application state shared across handlers.
pub struct AppState<B, P, L, H>
where
    B: BrokerPort,
    P: PlanRepository,
    L: ExecutionLog,
    H: AssetHistoryRepository,
{
    /// Gateway, for approval keys.
    pub broker: Arc<B>,
    /// Manual trading and trade log.
    pub trading: Arc<ManualTradingUseCase<B, L>>,
    /// Plan management.
    pub plans: Arc<ManagePlansUseCase<P, L>>,
    /// Scheduler, for manual runs and status.
    pub scheduler: Arc<Scheduler<EngineJobs<B, P, L, H>>>,
    /// Session manager, for the sync endpoint.
    pub sessions: Arc<SessionManager>,
    /// Account sessions, for feed keys.
    pub accounts: Arc<dyn AccountRepository>,
    /// Real-time relay.
    pub relay: RelayClient,
    /// Shared secret guarding the sync endpoint.
    pub sync_key: Arc<str>,
    /// Run-mode flags.
    pub run_mode: RunMode,
    /// Application version.
    pub version: String,
}

impl<B, P, L, H> Clone for AppState<B, P, L, H>
where
    B: BrokerPort,
    P: PlanRepository,
    L: ExecutionLog,
    H: AssetHistoryRepository,
{
    fn clone(&self) -> Self {
        Self {
            broker: Arc::clone(&self.broker),
            trading: Arc::clone(&self.trading),
            plans: Arc::clone(&self.plans),
            scheduler: Arc::clone(&self.scheduler),
            sessions: Arc::clone(&self.sessions),
            accounts: Arc::clone(&self.accounts),
            relay: self.relay.clone(),
            sync_key: Arc::clone(&self.sync_key),
            run_mode: self.run_mode.clone(),
            version: self.version.clone(),
        }
    }
}

/// Create the HTTP router with all endpoints.
pub fn create_router<B, P, L, H>(state: AppState<B, P, L, H>) -> Router
where
    B: BrokerPort + 'static,
    P: PlanRepository + 'static,
    L: ExecutionLog + 'static,
    H: AssetHistoryRepository + 'static,
{
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(render_metrics))
        .route("/v1/sync/kis-token/{account_number}", get(sync_token))
        .route("/v1/accounts/{account_id}/balance", get(balance))
        .route("/v1/accounts/{account_id}/quote/{code}", get(quote))
        .route("/v1/accounts/{account_id}/orders", post(place_order))
        .route("/v1/accounts/{account_id}/orders/revise", post(revise_order))
        .route("/v1/accounts/{account_id}/orders/unfilled", get(unfilled_orders))
        .route("/v1/accounts/{account_id}/orders/executed", get(executed_orders))
        .route("/v1/plans", get(list_plans).post(create_plan))
        .route("/v1/plans/{plan_id}/cancel", post(cancel_plan))
        .route("/v1/logs", get(trade_log))
        .route("/v1/jobs", get(list_jobs))
        .route("/v1/jobs/{job_id}/run", post(run_job))
        .route("/v1/system/status", get(system_status))
        .route("/v1/ws/orders/{account_id}", get(ws::order_socket))
        .route("/v1/ws/subscribe", post(ws::subscribe_prices))
        .with_state(state)
}

async fn health_check<B, P, L, H>(State(state): State<AppState<B, P, L, H>>) -> impl IntoResponse
where
    B: BrokerPort,
    P: PlanRepository,
    L: ExecutionLog,
    H: AssetHistoryRepository,
{
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
    })
}

async fn render_metrics() -> impl IntoResponse {
    metrics::get_metrics_handle().map_or_else(String::new, |handle| handle.render())
}

// =============================================================================
// Token sync (primary side)
// =============================================================================

async fn sync_token<B, P, L, H>(
    State(state): State<AppState<B, P, L, H>>,
    Path(account_number): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError>
where
    B: BrokerPort,
    P: PlanRepository,
    L: ExecutionLog,
    H: AssetHistoryRepository,
{
    let presented = headers
        .get(SYNC_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if presented.is_empty() || !sync_key_matches(presented, &state.sync_key) {
        tracing::warn!("Sync request with invalid key rejected");
        return Err(ApiError::Forbidden("invalid sync key".to_string()));
    }

    let token = state
        .sessions
        .token_for_account_number(&account_number)
        .await?
        .ok_or_else(|| ApiError::NotFound("no account with this account number".to_string()))?;
    tracing::info!(expires_at = %token.expires_at, "Token served to secondary");
    Ok(Json(token))
}

/// Constant-time in the key's bytes; only a length mismatch returns early.
fn sync_key_matches(presented: &str, expected: &str) -> bool {
    presented.as_bytes().ct_eq(expected.as_bytes()).into()
}

// =============================================================================
// Manual trading
// =============================================================================

async fn balance<B, P, L, H>(
    State(state): State<AppState<B, P, L, H>>,
    Path(account_id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    B: BrokerPort,
    P: PlanRepository,
    L: ExecutionLog,
    H: AssetHistoryRepository,
{
    let balance = state.trading.balance(&AccountId::new(account_id)).await?;
    Ok(Json(balance))
}

async fn quote<B, P, L, H>(
    State(state): State<AppState<B, P, L, H>>,
    Path((account_id, code)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError>
where
    B: BrokerPort,
    P: PlanRepository,
    L: ExecutionLog,
    H: AssetHistoryRepository,
{
    let quote = state
        .trading
        .quote(&AccountId::new(account_id), &code)
        .await?;
    Ok(Json(quote))
}

async fn place_order<B, P, L, H>(
    State(state): State<AppState<B, P, L, H>>,
    Path(account_id): Path<String>,
    Json(request): Json<PlaceOrderDto>,
) -> Result<impl IntoResponse, ApiError>
where
    B: BrokerPort,
    P: PlanRepository,
    L: ExecutionLog,
    H: AssetHistoryRepository,
{
    if request.quantity == 0 || request.instrument.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "instrument and a positive quantity are required".to_string(),
        ));
    }
    let ack = state
        .trading
        .place_order(&AccountId::new(account_id), &request)
        .await?;
    Ok(Json(ack))
}

async fn revise_order<B, P, L, H>(
    State(state): State<AppState<B, P, L, H>>,
    Path(account_id): Path<String>,
    Json(request): Json<RevisionRequest>,
) -> Result<impl IntoResponse, ApiError>
where
    B: BrokerPort,
    P: PlanRepository,
    L: ExecutionLog,
    H: AssetHistoryRepository,
{
    let ack = state
        .trading
        .revise_or_cancel(&AccountId::new(account_id), &request)
        .await?;
    Ok(Json(ack))
}

async fn unfilled_orders<B, P, L, H>(
    State(state): State<AppState<B, P, L, H>>,
    Path(account_id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    B: BrokerPort,
    P: PlanRepository,
    L: ExecutionLog,
    H: AssetHistoryRepository,
{
    let orders = state
        .trading
        .unfilled_orders(&AccountId::new(account_id))
        .await?;
    Ok(Json(orders))
}

async fn executed_orders<B, P, L, H>(
    State(state): State<AppState<B, P, L, H>>,
    Path(account_id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    B: BrokerPort,
    P: PlanRepository,
    L: ExecutionLog,
    H: AssetHistoryRepository,
{
    let orders = state
        .trading
        .executed_orders(&AccountId::new(account_id))
        .await?;
    Ok(Json(orders))
}

async fn trade_log<B, P, L, H>(
    State(state): State<AppState<B, P, L, H>>,
    Query(query): Query<TradeLogQuery>,
) -> Result<impl IntoResponse, ApiError>
where
    B: BrokerPort,
    P: PlanRepository,
    L: ExecutionLog,
    H: AssetHistoryRepository,
{
    let records = state.trading.trade_log(query.skip, query.limit).await?;
    Ok(Json(records))
}

// =============================================================================
// Plans
// =============================================================================

async fn list_plans<B, P, L, H>(
    State(state): State<AppState<B, P, L, H>>,
    Query(query): Query<PlanListQuery>,
) -> Result<impl IntoResponse, ApiError>
where
    B: BrokerPort,
    P: PlanRepository,
    L: ExecutionLog,
    H: AssetHistoryRepository,
{
    let account = query.account_id.map(AccountId::new);
    let plans = state.plans.list(account.as_ref()).await?;
    Ok(Json(plans.iter().map(PlanDto::from_plan).collect::<Vec<_>>()))
}

async fn create_plan<B, P, L, H>(
    State(state): State<AppState<B, P, L, H>>,
    Json(request): Json<CreatePlanDto>,
) -> Result<impl IntoResponse, ApiError>
where
    B: BrokerPort,
    P: PlanRepository,
    L: ExecutionLog,
    H: AssetHistoryRepository,
{
    let plan = state.plans.create(&request).await?;
    Ok((StatusCode::CREATED, Json(PlanDto::from_plan(&plan))))
}

async fn cancel_plan<B, P, L, H>(
    State(state): State<AppState<B, P, L, H>>,
    Path(plan_id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    B: BrokerPort,
    P: PlanRepository,
    L: ExecutionLog,
    H: AssetHistoryRepository,
{
    let plan = state.plans.cancel(&PlanId::new(plan_id)).await?;
    Ok(Json(PlanDto::from_plan(&plan)))
}

// =============================================================================
// Jobs and status
// =============================================================================

async fn list_jobs<B, P, L, H>(State(state): State<AppState<B, P, L, H>>) -> impl IntoResponse
where
    B: BrokerPort,
    P: PlanRepository,
    L: ExecutionLog,
    H: AssetHistoryRepository,
{
    let jobs: Vec<JobSummary> = state
        .scheduler
        .jobs()
        .iter()
        .map(|job| JobSummary {
            id: job.id(),
            description: job.description(),
        })
        .collect();
    Json(jobs)
}

async fn run_job<B, P, L, H>(
    State(state): State<AppState<B, P, L, H>>,
    Path(job_id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    B: BrokerPort + 'static,
    P: PlanRepository + 'static,
    L: ExecutionLog + 'static,
    H: AssetHistoryRepository + 'static,
{
    let job = JobKind::from_id(&job_id)
        .ok_or_else(|| ApiError::NotFound(format!("unknown job: {job_id}")))?;
    tracing::info!(job = %job, "Manual job run requested");

    match state.scheduler.run_now(job).await {
        Ok(message) => Ok(Json(JobRunResponse {
            job: job.id(),
            status: "SUCCESS",
            message,
        })),
        Err(JobError::Failed { message, .. }) => Ok(Json(JobRunResponse {
            job: job.id(),
            status: "FAILED",
            message,
        })),
        Err(e) => Err(e.into()),
    }
}

async fn system_status<B, P, L, H>(
    State(state): State<AppState<B, P, L, H>>,
) -> impl IntoResponse
where
    B: BrokerPort,
    P: PlanRepository,
    L: ExecutionLog,
    H: AssetHistoryRepository,
{
    let timezone = state.scheduler.timezone();
    Json(SystemStatusResponse {
        server_time: Utc::now().with_timezone(&timezone).to_rfc3339(),
        timezone: timezone.to_string(),
        run_mode: state.run_mode.app_env.clone(),
        scheduler_enabled: state.run_mode.scheduler_enabled,
        secondary_mode: state.sessions.is_secondary(),
        relay_state: state.relay.state().as_str(),
        relay_sinks: state.relay.registry().len(),
        jobs: state.scheduler.status(),
        history: state.scheduler.history(STATUS_HISTORY_LIMIT),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{
        AppCredentials, DashboardSink, GatewayError, LoggingDashboardSink, MockBrokerPort,
    };
    use crate::application::use_cases::{
        ExecuteScheduledOrdersUseCase, RecordAssetsUseCase, SyncDashboardUseCase,
    };
    use crate::infrastructure::persistence::{
        InMemoryAccountRepository, InMemoryAssetHistory, InMemoryExecutionLog,
        InMemoryPlanRepository,
    };
    use crate::infrastructure::session::DirectTokenIssuer;
    use crate::infrastructure::vault::InMemoryCredentialVault;
    use axum::body::Body;
    use axum::http::Request;
    use kis_stream_relay::RelayConfig;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;
    use tower::ServiceExt;

    type TestState =
        AppState<MockBrokerPort, InMemoryPlanRepository, InMemoryExecutionLog, InMemoryAssetHistory>;

    fn create_test_state(broker: MockBrokerPort) -> TestState {
        let broker = Arc::new(broker);
        let plans = Arc::new(InMemoryPlanRepository::new());
        let log = Arc::new(InMemoryExecutionLog::new());
        let history = Arc::new(InMemoryAssetHistory::new());
        let accounts: Arc<dyn AccountRepository> = Arc::new(InMemoryAccountRepository::new());
        let sink: Arc<dyn DashboardSink> = Arc::new(LoggingDashboardSink);
        let sessions = Arc::new(SessionManager::new(
            Arc::clone(&accounts),
            Arc::new(InMemoryCredentialVault::new()),
            DirectTokenIssuer::new("http://127.0.0.1:9", Duration::from_millis(200)).unwrap(),
        ));
        let jobs = EngineJobs::new(
            ExecuteScheduledOrdersUseCase::new(
                Arc::clone(&broker),
                Arc::clone(&plans),
                Arc::clone(&log),
            ),
            RecordAssetsUseCase::new(Arc::clone(&broker), Arc::clone(&accounts), Arc::clone(&history)),
            SyncDashboardUseCase::new(Arc::clone(&history), sink),
            Arc::clone(&sessions),
            chrono_tz::Asia::Seoul,
        );
        let scheduler = Arc::new(Scheduler::new(
            Arc::new(jobs),
            chrono_tz::Asia::Seoul,
            JobKind::registered(false),
        ));

        AppState {
            trading: Arc::new(ManualTradingUseCase::new(Arc::clone(&broker), Arc::clone(&log))),
            plans: Arc::new(ManagePlansUseCase::new(plans, log)),
            broker,
            scheduler,
            sessions,
            accounts,
            relay: RelayClient::new(RelayConfig::default(), CancellationToken::new()),
            sync_key: Arc::from("sync-secret"),
            run_mode: RunMode {
                app_env: "dev".to_string(),
                scheduler_enabled: false,
            },
            version: "0.1.0-test".to_string(),
        }
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_check_returns_ok() {
        let app = create_router(create_test_state(MockBrokerPort::new()));
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn sync_rejects_wrong_key() {
        let app = create_router(create_test_state(MockBrokerPort::new()));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/v1/sync/kis-token/50123456")
                    .header(SYNC_KEY_HEADER, "wrong")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn sync_unknown_account_number_is_not_found() {
        let state = create_test_state(MockBrokerPort::new());
        state
            .sessions
            .register_account(
                AccountId::from("a"),
                AppCredentials {
                    app_key: "key".to_string(),
                    app_secret: "secret".to_string(),
                    account_number: "50123456".to_string(),
                    product_code: "01".to_string(),
                },
                None,
            )
            .await
            .unwrap();
        let response = create_router(state)
            .oneshot(
                Request::builder()
                    .uri("/v1/sync/kis-token/99999999")
                    .header(SYNC_KEY_HEADER, "sync-secret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn broker_failure_surfaces_code_and_message() {
        let mut broker = MockBrokerPort::new();
        broker.expect_get_balance().returning(|_| {
            Err(GatewayError::BrokerRequestFailed {
                status: None,
                code: "EGW00123".to_string(),
                message: "기간이 만료된 token 입니다.".to_string(),
            })
        });
        let response = create_router(create_test_state(broker))
            .oneshot(
                Request::builder()
                    .uri("/v1/accounts/a/balance")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = body_json(response).await;
        assert_eq!(body["code"], "EGW00123");
        assert_eq!(body["message"], "기간이 만료된 token 입니다.");
    }

    #[tokio::test]
    async fn create_then_cancel_plan() {
        let state = create_test_state(MockBrokerPort::new());
        let app = create_router(state);

        let body = serde_json::json!({
            "account_id": "a",
            "instrument": "005930",
            "side": "BUY",
            "mode": "QUANTITY",
            "total": "100",
            "per_cycle": "30"
        });
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/plans")
                    .header("content-type", "application/json")
                    .body(Body::from(serde_json::to_vec(&body).unwrap()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let plan_id = body_json(response).await["id"].as_str().unwrap().to_string();

        let cancel = |app: Router| {
            let uri = format!("/v1/plans/{plan_id}/cancel");
            async move {
                app.oneshot(
                    Request::builder()
                        .method("POST")
                        .uri(uri)
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap()
            }
        };
        let response = cancel(app.clone()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "CANCELLED");

        let response = cancel(app).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_job_is_not_found() {
        let response = create_router(create_test_state(MockBrokerPort::new()))
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/jobs/nightly_backup/run")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn token_sweep_job_runs_manually() {
        let state = create_test_state(MockBrokerPort::new());
        let response = create_router(state.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/jobs/hourly_token_refresh/run")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "SUCCESS");

        let status = state.scheduler.status();
        let sweep = status.iter().find(|v| v.id == "hourly_token_refresh").unwrap();
        assert!(sweep.last_run.is_some());
    }

    #[tokio::test]
    async fn price_subscribe_needs_a_live_stream() {
        let response = create_router(create_test_state(MockBrokerPort::new()))
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/ws/subscribe")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"codes":["005930","CASH"]}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn sync_key_comparison_requires_an_exact_match() {
        assert!(sync_key_matches("sync-secret", "sync-secret"));
        assert!(!sync_key_matches("sync-secreT", "sync-secret"));
        assert!(!sync_key_matches("sync-secret-", "sync-secret"));
        assert!(!sync_key_matches("", "sync-secret"));
    }
}
