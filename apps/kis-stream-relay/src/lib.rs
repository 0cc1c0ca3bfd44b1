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

//! KIS Stream Relay - Real-time Feed Multiplexer
//!
//! Holds one upstream WebSocket to the KIS real-time endpoint and
//! multiplexes decoded events to any number of downstream subscribers.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Wire layout of the feed
//!   - `frame`: Data/control frame decoding, feed-specific payload parsing
//!   - `subscription`: Registration frames and feed kinds
//!
//! - **Infrastructure**: Connection and fan-out
//!   - `upstream`: Connection state machine and read loop
//!   - `registry`: Downstream sink registry
//!   - `config`: Relay settings
//!
//! # Data Flow
//!
//! ```text
//! KIS WS ──► read loop ──► decode_frame ──► decode_event ──► SubscriberRegistry ──► sink 1..N
//!    ▲
//!    └── subscribe_execution_feed / subscribe_price_feed
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

/// Domain layer - feed wire format.
pub mod domain;

/// Infrastructure layer - upstream client and subscriber fan-out.
pub mod infrastructure;

pub use domain::frame::{
    DataFrame, FrameDecodeError, InboundFrame, RelayEvent, decode_event, decode_frame,
};
pub use domain::subscription::{FeedKind, SubscribeRequest};
pub use infrastructure::config::RelayConfig;
pub use infrastructure::registry::{SinkId, SubscriberRegistry};
pub use infrastructure::upstream::{RelayClient, RelayError, RelayState};
