//! Downstream Subscriber Registry
//!
//! Each downstream consumer registers a bounded sink. Broadcasts use
//! `try_send`, so a slow sink drops events instead of stalling the read
//! loop, and a closed sink is pruned on the next broadcast.

use std::collections::HashMap;
use std::fmt;

use metrics::counter;
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::domain::frame::RelayEvent;

/// Identifier of a registered sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SinkId(uuid::Uuid);

impl SinkId {
    fn generate() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl fmt::Display for SinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registry of downstream sinks.
#[derive(Debug)]
pub struct SubscriberRegistry {
    sinks: RwLock<HashMap<SinkId, mpsc::Sender<RelayEvent>>>,
    capacity: usize,
}

impl SubscriberRegistry {
    /// Create a registry whose sinks buffer `capacity` events each.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            sinks: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Register a new sink and return its receiving end.
    pub fn register(&self) -> (SinkId, mpsc::Receiver<RelayEvent>) {
        let (tx, rx) = mpsc::channel(self.capacity);
        let id = SinkId::generate();
        self.sinks.write().insert(id, tx);
        tracing::debug!(sink_id = %id, "Sink registered");
        (id, rx)
    }

    /// Remove a sink. Returns `true` if it was registered.
    pub fn remove(&self, id: SinkId) -> bool {
        let removed = self.sinks.write().remove(&id).is_some();
        if removed {
            tracing::debug!(sink_id = %id, "Sink removed");
        }
        removed
    }

    /// Number of registered sinks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sinks.read().len()
    }

    /// Whether no sinks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sinks.read().is_empty()
    }

    /// Deliver `event` to every sink. Returns the number of sinks that accepted it.
    pub fn broadcast(&self, event: &RelayEvent) -> usize {
        let mut delivered = 0;
        let mut closed = Vec::new();

        {
            let sinks = self.sinks.read();
            for (id, tx) in sinks.iter() {
                match tx.try_send(event.clone()) {
                    Ok(()) => delivered += 1,
                    Err(TrySendError::Full(_)) => {
                        counter!("kis_relay_events_dropped_total").increment(1);
                        tracing::warn!(sink_id = %id, "Sink full, event dropped");
                    }
                    Err(TrySendError::Closed(_)) => closed.push(*id),
                }
            }
        }

        if !closed.is_empty() {
            let mut sinks = self.sinks.write();
            for id in &closed {
                sinks.remove(id);
            }
            counter!("kis_relay_sinks_pruned_total").increment(closed.len() as u64);
            tracing::debug!(pruned = closed.len(), "Pruned closed sinks");
        }

        delivered
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn broadcast_reaches_all_sinks() {
        let registry = SubscriberRegistry::new(4);
        let (_a, mut rx_a) = registry.register();
        let (_b, mut rx_b) = registry.register();

        assert_eq!(registry.broadcast(&RelayEvent::Execution), 2);
        assert_eq!(rx_a.recv().await, Some(RelayEvent::Execution));
        assert_eq!(rx_b.recv().await, Some(RelayEvent::Execution));
    }

    #[tokio::test]
    async fn closed_sink_is_pruned_without_affecting_others() {
        let registry = SubscriberRegistry::new(4);
        let (_gone, rx_gone) = registry.register();
        let (_alive, mut rx_alive) = registry.register();
        drop(rx_gone);

        assert_eq!(registry.broadcast(&RelayEvent::Execution), 1);
        assert_eq!(registry.len(), 1);
        assert_eq!(rx_alive.recv().await, Some(RelayEvent::Execution));
    }

    #[test]
    fn full_sink_drops_but_stays_registered() {
        let registry = SubscriberRegistry::new(1);
        let (_id, _rx) = registry.register();

        assert_eq!(registry.broadcast(&RelayEvent::Execution), 1);
        assert_eq!(registry.broadcast(&RelayEvent::Execution), 0);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn remove_unregisters() {
        let registry = SubscriberRegistry::default();
        let (id, _rx) = registry.register();
        assert!(registry.remove(id));
        assert!(!registry.remove(id));
        assert!(registry.is_empty());
    }
}
