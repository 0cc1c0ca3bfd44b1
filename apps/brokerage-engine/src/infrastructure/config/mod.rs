//! Configuration and Dependency Injection
//!
//! - `settings`: Environment-driven engine configuration
//! - `container`: Wiring of adapters, use cases and services

mod container;
mod settings;

pub use container::{Container, ContainerError, EngineContainer};
pub use settings::{
    BOOTSTRAP_ACCOUNT_ID, BootstrapAccount, ConfigError, DEFAULT_WS_URL, EngineConfig,
    RunEnvironment,
};
