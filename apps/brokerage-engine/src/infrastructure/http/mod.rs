//! HTTP/REST API adapter.
//!
//! Inbound adapter implementing REST and WebSocket endpoints that delegate to
//! application use cases.

mod controller;
mod request;
mod response;
mod ws;

pub use controller::{AppState, RunMode, create_router};
pub use request::*;
pub use response::*;
