//! Korea Investment & Securities (KIS) Broker Adapter
//!
//! Implementation of `BrokerPort` for the KIS Open API with:
//! - Bearer token, app key headers and `tr_id` operation selection
//! - Hashkey signing of every POST body
//! - Fixed inter-call pacing (GET 100ms, POST 200ms)
//! - `rt_cd` result-code classification; no automatic retries

mod adapter;
mod api_types;
mod config;
mod error;
mod http_client;

pub use adapter::KisBrokerAdapter;
pub use config::{DEFAULT_BASE_URL, KisConfig};
pub use error::KisError;
pub use http_client::{KisHttpClient, KisReply};
