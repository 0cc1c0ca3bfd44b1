//! Broker Adapters
//!
//! Implementations of `BrokerPort` for various brokers.

pub mod kis;

pub use kis::{KisBrokerAdapter, KisConfig, KisError, KisHttpClient};
