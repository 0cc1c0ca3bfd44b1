//! Infrastructure Layer
//!
//! Adapters that implement the application ports plus the driving surfaces.
//!
//! - `broker`: KIS REST gateway
//! - `session`: Token issuance and the session lifecycle manager
//! - `vault`: Credential and token sealing
//! - `persistence`: In-memory repositories
//! - `scheduler`: Wall-clock job timer, job history and job dispatch
//! - `http`: REST API and downstream WebSockets
//! - `metrics`: Prometheus counters
//! - `config`: Environment settings and dependency wiring

pub mod broker;
pub mod config;
pub mod http;
pub mod metrics;
pub mod persistence;
pub mod scheduler;
pub mod session;
pub mod vault;
