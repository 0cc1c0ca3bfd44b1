//! Application Ports (Driver and Driven)
//!
//! Ports define interfaces for interacting with external systems.
//! - **Driven Ports** (Secondary/Outbound): brokerage, tokens, vault, dashboard
//!
//! Repository traits live with their aggregates in the domain layer.

mod broker_port;
mod dashboard_port;
mod session_port;
mod vault_port;

#[cfg(test)]
pub use broker_port::MockBrokerPort;
pub use broker_port::{BrokerPort, GatewayError, RevisionRequest};
pub use dashboard_port::{DashboardError, DashboardSink, LoggingDashboardSink};
pub use session_port::{AuthorizedAccount, SessionError, TokenProvider};
pub use vault_port::{AppCredentials, CredentialVault, VaultError};
