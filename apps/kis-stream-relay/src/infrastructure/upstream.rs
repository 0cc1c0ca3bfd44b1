//! Upstream Real-time Connection
//!
//! One WebSocket to the KIS real-time endpoint, shared by every downstream
//! consumer.
//!
//! # State Machine
//!
//! ```text
//! Disconnected ──connect()──► Connecting ──ok──► Connected
//!       ▲                          │                 │
//!       └──────── error ───────────┘   transport err │
//!       └────────────────────────────────────────────┘
//! ```
//!
//! The relay never reconnects on its own; whoever called `connect` decides
//! whether to try again. Subscriptions live in memory only and are cleared
//! when the connection drops.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::{SinkExt, Stream, StreamExt};
use metrics::counter;
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_util::sync::CancellationToken;

use super::config::RelayConfig;
use super::registry::SubscriberRegistry;
use crate::domain::frame::{InboundFrame, decode_event, decode_frame};
use crate::domain::subscription::{FeedKind, SubscribeRequest};

// =============================================================================
// Error Type
// =============================================================================

/// Errors from the upstream connection.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// No live upstream connection.
    #[error("relay is not connected")]
    NotConnected,

    /// Transport-level WebSocket failure.
    #[error("WebSocket error: {0}")]
    Transport(#[from] tungstenite::Error),

    /// Registration frame could not be serialized.
    #[error("failed to encode frame: {0}")]
    Encode(#[from] serde_json::Error),
}

// =============================================================================
// Connection State
// =============================================================================

/// Upstream connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelayState {
    /// No connection.
    #[default]
    Disconnected,
    /// Handshake in progress.
    Connecting,
    /// Connected and reading.
    Connected,
}

impl RelayState {
    /// State name for logs and status output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        }
    }
}

struct Connection {
    generation: u64,
    approval_key: String,
    outbound: mpsc::UnboundedSender<Message>,
    cancel: CancellationToken,
}

struct RelayInner {
    config: RelayConfig,
    state: RwLock<RelayState>,
    connection: Mutex<Option<Connection>>,
    subscriptions: Mutex<HashSet<(FeedKind, String)>>,
    registry: Arc<SubscriberRegistry>,
    connect_lock: tokio::sync::Mutex<()>,
    generation: AtomicU64,
    shutdown: CancellationToken,
}

// =============================================================================
// Relay Client
// =============================================================================

/// Handle to the shared upstream connection. Cheap to clone.
#[derive(Clone)]
pub struct RelayClient {
    inner: Arc<RelayInner>,
}

impl RelayClient {
    /// Create a disconnected relay. Cancelling `shutdown` closes any connection.
    #[must_use]
    pub fn new(config: RelayConfig, shutdown: CancellationToken) -> Self {
        let registry = Arc::new(SubscriberRegistry::new(config.sink_capacity));
        Self {
            inner: Arc::new(RelayInner {
                config,
                state: RwLock::new(RelayState::Disconnected),
                connection: Mutex::new(None),
                subscriptions: Mutex::new(HashSet::new()),
                registry,
                connect_lock: tokio::sync::Mutex::new(()),
                generation: AtomicU64::new(0),
                shutdown,
            }),
        }
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> RelayState {
        *self.inner.state.read()
    }

    /// Whether the upstream connection is live.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == RelayState::Connected
    }

    /// Downstream sink registry.
    #[must_use]
    pub fn registry(&self) -> Arc<SubscriberRegistry> {
        Arc::clone(&self.inner.registry)
    }

    /// Number of active upstream subscriptions.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.inner.subscriptions.lock().len()
    }

    /// Open the upstream stream and spawn its read loop.
    ///
    /// A no-op when already connected. Concurrent callers are serialized.
    ///
    /// # Errors
    ///
    /// Returns `RelayError::Transport` if the handshake fails; the relay
    /// stays `Disconnected` and does not retry.
    pub async fn connect(&self, approval_key: &str) -> Result<(), RelayError> {
        let _guard = self.inner.connect_lock.lock().await;
        if self.is_connected() {
            return Ok(());
        }

        *self.inner.state.write() = RelayState::Connecting;
        let url = self.inner.config.url();
        tracing::info!(url = %url, "Connecting to KIS real-time stream");

        let ws_stream = match tokio_tungstenite::connect_async(url.as_str()).await {
            Ok((stream, _response)) => stream,
            Err(e) => {
                *self.inner.state.write() = RelayState::Disconnected;
                counter!("kis_relay_connect_failures_total").increment(1);
                tracing::warn!(error = %e, url = %url, "Real-time stream connection failed");
                return Err(e.into());
            }
        };

        let (mut write, read) = ws_stream.split();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();
        let generation = self.inner.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let cancel = self.inner.shutdown.child_token();

        let writer_cancel = cancel.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = writer_cancel.cancelled() => {
                        let _ = write.close().await;
                        break;
                    }
                    msg = outbound_rx.recv() => {
                        let Some(msg) = msg else { break };
                        if let Err(e) = write.send(msg).await {
                            tracing::warn!(error = %e, "Upstream write failed");
                            writer_cancel.cancel();
                            break;
                        }
                    }
                }
            }
        });

        *self.inner.connection.lock() = Some(Connection {
            generation,
            approval_key: approval_key.to_string(),
            outbound: outbound_tx,
            cancel: cancel.clone(),
        });
        *self.inner.state.write() = RelayState::Connected;
        tracing::info!(generation, "Real-time stream connected");

        tokio::spawn(read_loop(Arc::clone(&self.inner), read, generation, cancel));
        Ok(())
    }

    /// Register for execution notices of an account (keyed by HTS id).
    ///
    /// # Errors
    ///
    /// Returns `RelayError::NotConnected` when there is no live connection.
    pub fn subscribe_execution_feed(&self, account_key: &str) -> Result<(), RelayError> {
        self.subscribe(FeedKind::ExecutionNotice, account_key)
    }

    /// Register for trade price ticks of an instrument.
    ///
    /// # Errors
    ///
    /// Returns `RelayError::NotConnected` when there is no live connection.
    pub fn subscribe_price_feed(&self, instrument: &str) -> Result<(), RelayError> {
        self.subscribe(FeedKind::Price, instrument)
    }

    /// Close the current connection, if any.
    pub fn disconnect(&self) {
        let generation = self.inner.connection.lock().as_ref().map(|c| c.generation);
        if let Some(generation) = generation {
            self.inner.disconnect(generation);
        }
    }

    fn subscribe(&self, feed: FeedKind, key: &str) -> Result<(), RelayError> {
        let connection = self.inner.connection.lock();
        let Some(conn) = connection.as_ref() else {
            return Err(RelayError::NotConnected);
        };

        let entry = (feed, key.to_string());
        let mut subscriptions = self.inner.subscriptions.lock();
        if subscriptions.contains(&entry) {
            tracing::debug!(feed = feed.tr_id(), key, "Already subscribed");
            return Ok(());
        }

        let frame = SubscribeRequest::register(
            &conn.approval_key,
            &self.inner.config.customer_type,
            feed,
            key,
        );
        let json = serde_json::to_string(&frame)?;
        conn.outbound
            .send(Message::Text(json.into()))
            .map_err(|_| RelayError::NotConnected)?;

        subscriptions.insert(entry);
        tracing::info!(feed = feed.tr_id(), key, "Subscription sent");
        Ok(())
    }
}

impl std::fmt::Debug for RelayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayClient")
            .field("url", &self.inner.config.url())
            .field("state", &self.state())
            .field("subscriptions", &self.subscription_count())
            .finish_non_exhaustive()
    }
}

impl RelayInner {
    fn send_raw(&self, message: Message) {
        if let Some(conn) = self.connection.lock().as_ref() {
            let _ = conn.outbound.send(message);
        }
    }

    fn disconnect(&self, generation: u64) {
        let mut connection = self.connection.lock();
        if !connection.as_ref().is_some_and(|c| c.generation == generation) {
            return;
        }
        if let Some(conn) = connection.take() {
            conn.cancel.cancel();
        }
        *self.state.write() = RelayState::Disconnected;
        self.subscriptions.lock().clear();
        tracing::warn!(generation, "Real-time stream disconnected");
    }

    fn handle_text(&self, text: &str) {
        let frame = match decode_frame(text) {
            Ok(frame) => frame,
            Err(e) => {
                counter!("kis_relay_frames_total", "kind" => "invalid").increment(1);
                tracing::warn!(error = %e, "Dropping undecodable frame");
                return;
            }
        };

        if frame.is_keepalive() {
            tracing::trace!("Echoing keepalive");
            self.send_raw(Message::Text(text.to_string().into()));
            return;
        }

        match frame {
            InboundFrame::Control(value) => {
                counter!("kis_relay_frames_total", "kind" => "control").increment(1);
                let rt_cd = value.pointer("/body/rt_cd").and_then(|v| v.as_str());
                let msg = value
                    .pointer("/body/msg1")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default();
                if rt_cd.is_some_and(|code| code != "0") {
                    tracing::warn!(rt_cd, msg, "Upstream rejected request");
                } else {
                    tracing::debug!(msg, "Control frame");
                }
            }
            InboundFrame::Data(data) => match decode_event(&data) {
                Ok(Some(event)) => {
                    counter!("kis_relay_frames_total", "kind" => "event").increment(1);
                    let delivered = self.registry.broadcast(&event);
                    tracing::trace!(feed_type = data.feed_type, delivered, "Event relayed");
                }
                Ok(None) => {
                    counter!("kis_relay_frames_total", "kind" => "unknown").increment(1);
                    tracing::debug!(feed_type = data.feed_type, "Dropping unhandled feed");
                }
                Err(e) => {
                    counter!("kis_relay_frames_total", "kind" => "invalid").increment(1);
                    tracing::warn!(error = %e, feed_type = data.feed_type, "Dropping bad payload");
                }
            },
        }
    }
}

async fn read_loop<S>(inner: Arc<RelayInner>, mut read: S, generation: u64, cancel: CancellationToken)
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                tracing::debug!(generation, "Read loop cancelled");
                break;
            }
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => inner.handle_text(text.as_str()),
                    Some(Ok(Message::Binary(data))) => match std::str::from_utf8(&data) {
                        Ok(text) => inner.handle_text(text),
                        Err(_) => tracing::warn!(len = data.len(), "Received non-UTF8 binary frame"),
                    },
                    Some(Ok(Message::Ping(payload))) => inner.send_raw(Message::Pong(payload)),
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!("Server sent close frame");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        counter!("kis_relay_transport_errors_total").increment(1);
                        tracing::warn!(error = %e, "Upstream read failed");
                        break;
                    }
                    None => {
                        tracing::info!("Upstream stream ended");
                        break;
                    }
                }
            }
        }
    }

    inner.disconnect(generation);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_relay_is_disconnected() {
        let relay = RelayClient::new(RelayConfig::default(), CancellationToken::new());
        assert_eq!(relay.state(), RelayState::Disconnected);
        assert_eq!(relay.subscription_count(), 0);
    }

    #[test]
    fn subscribe_without_connection_fails() {
        let relay = RelayClient::new(RelayConfig::default(), CancellationToken::new());
        assert!(matches!(
            relay.subscribe_price_feed("005930"),
            Err(RelayError::NotConnected)
        ));
        assert!(matches!(
            relay.subscribe_execution_feed("hts-user"),
            Err(RelayError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn failed_connect_stays_disconnected() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let relay = RelayClient::new(
            RelayConfig::new(format!("ws://{addr}")),
            CancellationToken::new(),
        );
        let result = relay.connect("approval").await;
        assert!(matches!(result, Err(RelayError::Transport(_))));
        assert_eq!(relay.state(), RelayState::Disconnected);
    }
}
