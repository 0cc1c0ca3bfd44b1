//! Dependency Injection Container
//!
//! Manages creation and wiring of all application components.

use std::sync::Arc;

use kis_stream_relay::{RelayClient, RelayConfig};
use tokio_util::sync::CancellationToken;

use crate::application::ports::{
    BrokerPort, CredentialVault, DashboardSink, LoggingDashboardSink, TokenProvider,
};
use crate::application::use_cases::{
    ExecuteScheduledOrdersUseCase, ManagePlansUseCase, ManualTradingUseCase, RecordAssetsUseCase,
    SyncDashboardUseCase,
};
use crate::domain::order_plan::PlanRepository;
use crate::domain::portfolio::AssetHistoryRepository;
use crate::domain::session::AccountRepository;
use crate::domain::trading::ExecutionLog;
use crate::infrastructure::broker::{KisBrokerAdapter, KisConfig, KisError};
use crate::infrastructure::http::{AppState, RunMode};
use crate::infrastructure::persistence::{
    InMemoryAccountRepository, InMemoryAssetHistory, InMemoryExecutionLog, InMemoryPlanRepository,
};
use crate::infrastructure::scheduler::{EngineJobs, JobKind, Scheduler};
use crate::infrastructure::session::{
    DirectTokenIssuer, IssuerError, PrimaryTokenSource, SessionManager,
};
use crate::infrastructure::vault::InMemoryCredentialVault;

use super::settings::EngineConfig;

/// Container wired with the production adapters.
pub type EngineContainer =
    Container<KisBrokerAdapter, InMemoryPlanRepository, InMemoryExecutionLog, InMemoryAssetHistory>;

/// Dependency injection container.
///
/// Holds all wired dependencies for the application. Use
/// [`Container::from_config`] for the production wiring or
/// [`Container::new`] with specific implementations.
pub struct Container<B, P, L, H>
where
    B: BrokerPort + 'static,
    P: PlanRepository + 'static,
    L: ExecutionLog + 'static,
    H: AssetHistoryRepository + 'static,
{
    // Ports
    broker: Arc<B>,
    plans: Arc<P>,
    log: Arc<L>,
    history: Arc<H>,
    accounts: Arc<dyn AccountRepository>,
    dashboard: Arc<dyn DashboardSink>,

    // Services
    sessions: Arc<SessionManager>,
    relay: RelayClient,
}

impl<B, P, L, H> Container<B, P, L, H>
where
    B: BrokerPort + 'static,
    P: PlanRepository + 'static,
    L: ExecutionLog + 'static,
    H: AssetHistoryRepository + 'static,
{
    /// Create a new container with all dependencies.
    #[allow(clippy::too_many_arguments)]
    pub const fn new(
        broker: Arc<B>,
        plans: Arc<P>,
        log: Arc<L>,
        history: Arc<H>,
        accounts: Arc<dyn AccountRepository>,
        dashboard: Arc<dyn DashboardSink>,
        sessions: Arc<SessionManager>,
        relay: RelayClient,
    ) -> Self {
        Self {
            broker,
            plans,
            log,
            history,
            accounts,
            dashboard,
            sessions,
            relay,
        }
    }

    /// Get the broker port.
    pub fn broker(&self) -> Arc<B> {
        Arc::clone(&self.broker)
    }

    /// Get the plan repository.
    pub fn plans(&self) -> Arc<P> {
        Arc::clone(&self.plans)
    }

    /// Get the execution log.
    pub fn log(&self) -> Arc<L> {
        Arc::clone(&self.log)
    }

    /// Get the asset history.
    pub fn history(&self) -> Arc<H> {
        Arc::clone(&self.history)
    }

    /// Get the account repository.
    pub fn accounts(&self) -> Arc<dyn AccountRepository> {
        Arc::clone(&self.accounts)
    }

    /// Get the session manager.
    pub fn sessions(&self) -> Arc<SessionManager> {
        Arc::clone(&self.sessions)
    }

    /// Get the relay client.
    pub fn relay(&self) -> RelayClient {
        self.relay.clone()
    }

    // =========================================================================
    // Use Case Factories
    // =========================================================================

    /// Create the scheduled order use case.
    pub fn execute_scheduled_orders_use_case(&self) -> ExecuteScheduledOrdersUseCase<B, P, L> {
        ExecuteScheduledOrdersUseCase::new(self.broker(), self.plans(), self.log())
    }

    /// Create the plan management use case.
    pub fn manage_plans_use_case(&self) -> ManagePlansUseCase<P, L> {
        ManagePlansUseCase::new(self.plans(), self.log())
    }

    /// Create the manual trading use case.
    pub fn manual_trading_use_case(&self) -> ManualTradingUseCase<B, L> {
        ManualTradingUseCase::new(self.broker(), self.log())
    }

    /// Create the asset recording use case.
    pub fn record_assets_use_case(&self) -> RecordAssetsUseCase<B, dyn AccountRepository, H> {
        RecordAssetsUseCase::new(self.broker(), self.accounts(), self.history())
    }

    /// Create the dashboard sync use case.
    pub fn sync_dashboard_use_case(&self) -> SyncDashboardUseCase<H, dyn DashboardSink> {
        SyncDashboardUseCase::new(self.history(), Arc::clone(&self.dashboard))
    }

    /// Create the scheduler with the jobs registered for `config`.
    pub fn scheduler(&self, config: &EngineConfig) -> Arc<Scheduler<EngineJobs<B, P, L, H>>> {
        let jobs = EngineJobs::new(
            self.execute_scheduled_orders_use_case(),
            self.record_assets_use_case(),
            self.sync_dashboard_use_case(),
            self.sessions(),
            config.timezone,
        );
        Arc::new(Scheduler::new(
            Arc::new(jobs),
            config.timezone,
            JobKind::registered(config.environment.is_production()),
        ))
    }

    /// Create the HTTP state around an existing scheduler.
    pub fn app_state(
        &self,
        config: &EngineConfig,
        scheduler: Arc<Scheduler<EngineJobs<B, P, L, H>>>,
        version: impl Into<String>,
    ) -> AppState<B, P, L, H> {
        AppState {
            broker: self.broker(),
            trading: Arc::new(self.manual_trading_use_case()),
            plans: Arc::new(self.manage_plans_use_case()),
            scheduler,
            sessions: self.sessions(),
            accounts: self.accounts(),
            relay: self.relay(),
            sync_key: Arc::from(config.sync_api_key.as_str()),
            run_mode: RunMode {
                app_env: config.environment.as_str().to_string(),
                scheduler_enabled: config.scheduler_enabled,
            },
            version: version.into(),
        }
    }
}

impl EngineContainer {
    /// Wire the production adapters from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be built.
    pub fn from_config(
        config: &EngineConfig,
        shutdown: CancellationToken,
    ) -> Result<Self, ContainerError> {
        let accounts: Arc<dyn AccountRepository> = Arc::new(InMemoryAccountRepository::new());
        let vault: Arc<dyn CredentialVault> = Arc::new(InMemoryCredentialVault::new());

        let direct = DirectTokenIssuer::new(&config.kis_base_url, config.kis_http_timeout)?;
        let mut sessions = SessionManager::new(Arc::clone(&accounts), vault, direct);
        if let Some(primary_url) = &config.primary_api_url {
            sessions = sessions.with_primary(PrimaryTokenSource::new(
                primary_url,
                &config.sync_api_key,
            )?);
        }
        let sessions = Arc::new(sessions);

        let kis_config = KisConfig::new(&config.kis_base_url)
            .with_timeout(config.kis_http_timeout)
            .with_timezone(config.timezone);
        let tokens: Arc<dyn TokenProvider> = Arc::clone(&sessions) as Arc<dyn TokenProvider>;
        let broker = Arc::new(KisBrokerAdapter::new(&kis_config, tokens)?);

        let relay = RelayClient::new(RelayConfig::new(&config.kis_ws_url), shutdown);

        Ok(Self::new(
            broker,
            Arc::new(InMemoryPlanRepository::new()),
            Arc::new(InMemoryExecutionLog::new()),
            Arc::new(InMemoryAssetHistory::new()),
            accounts,
            Arc::new(LoggingDashboardSink),
            sessions,
            relay,
        ))
    }
}

/// Wiring failure.
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    /// Token issuer client could not be built.
    #[error("token issuer setup failed: {0}")]
    Issuer(#[from] IssuerError),
    /// Brokerage client could not be built.
    #[error("brokerage client setup failed: {0}")]
    Broker(#[from] KisError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::AppCredentials;
    use crate::domain::shared::AccountId;
    use crate::infrastructure::scheduler::JobKind;

    fn config(vars: &[(&str, &str)]) -> EngineConfig {
        let vars: std::collections::HashMap<&str, &str> = vars.iter().copied().collect();
        EngineConfig::from_lookup(|key| vars.get(key).map(ToString::to_string)).unwrap()
    }

    #[tokio::test]
    async fn production_wiring_shares_one_session_store() {
        let config = config(&[("SYNC_API_KEY", "k"), ("KIS_BASE_URL", "http://127.0.0.1:9")]);
        let container = EngineContainer::from_config(&config, CancellationToken::new()).unwrap();

        container
            .sessions()
            .register_account(
                AccountId::new("default"),
                AppCredentials {
                    app_key: "app".to_string(),
                    app_secret: "secret".to_string(),
                    account_number: "50123456".to_string(),
                    product_code: "01".to_string(),
                },
                None,
            )
            .await
            .unwrap();

        let listed = container.accounts().list().await.unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[test]
    fn dev_scheduler_omits_production_jobs() {
        let config = config(&[("SYNC_API_KEY", "k")]);
        let container = EngineContainer::from_config(&config, CancellationToken::new()).unwrap();
        let scheduler = container.scheduler(&config);
        assert!(!scheduler.jobs().contains(&JobKind::DashboardSync));

        let prd = self::config(&[("SYNC_API_KEY", "k"), ("APP_ENV", "prd")]);
        assert!(container.scheduler(&prd).jobs().contains(&JobKind::DashboardSync));
    }

    #[test]
    fn primary_url_switches_sessions_to_secondary() {
        let config = config(&[("SYNC_API_KEY", "k"), ("PRIMARY_API_URL", "http://primary:8000")]);
        let container = EngineContainer::from_config(&config, CancellationToken::new()).unwrap();
        assert!(container.sessions().is_secondary());
    }
}
