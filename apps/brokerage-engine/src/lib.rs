// Allow unwrap/expect in tests - tests should panic on unexpected errors
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements
    )
)]

//! Brokerage Engine - KIS Automation Layer
//!
//! Keeps brokerage sessions alive, executes multi-day order plans on a
//! wall-clock schedule, exposes manual trading over HTTP and relays the
//! real-time execution feed to WebSocket clients.
//!
//! # Architecture (Hexagonal)
//!
//! ## Layers (inside → outside)
//!
//! - **Domain**: Business rules
//!   - `session`: Account sessions and token validity margins
//!   - `order_plan`: Scheduled order plans, targets, status lifecycle
//!   - `trading`: Order sides/kinds, execution attempts, execution log
//!   - `portfolio`: Quotes, balances, orders, daily asset snapshots
//!
//! - **Application**: Use cases and orchestration
//!   - `ports`: `BrokerPort`, `TokenProvider`, `CredentialVault`, `DashboardSink`
//!   - `use_cases`: `ExecuteScheduledOrders`, `ManagePlans`, `ManualTrading`,
//!     `RecordAssets`, `SyncDashboard`
//!   - `dto`: Data transfer objects for API boundaries
//!
//! - **Infrastructure**: Adapters
//!   - `broker`: KIS REST gateway
//!   - `session`: Session lifecycle manager (direct and primary-sync refresh)
//!   - `scheduler`: Daily and hourly jobs
//!   - `http`: Axum REST API and order WebSockets
//!   - `config`: Environment settings and dependency container

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Hexagonal Layers
// =============================================================================

/// Domain layer - business rules.
pub mod domain;

/// Application layer - use cases and ports.
pub mod application;

/// Infrastructure layer - adapters and driving surfaces.
pub mod infrastructure;

/// Tracing and OpenTelemetry setup.
pub mod telemetry;
