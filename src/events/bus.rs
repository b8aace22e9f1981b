//! # Observer bus for passive event consumers.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] that mirrors
//! every registry event for observers (logging, metrics) that do not need the
//! synchronous delivery semantics of [`Consumer`](crate::Consumer).
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks; it calls
//!   `broadcast::Sender::send`.
//! - **Bounded capacity**: a single ring buffer stores recent events for all
//!   receivers.
//! - **Lag handling**: slow receivers get `RecvError::Lagged(n)` and skip the
//!   `n` oldest items.
//! - **No persistence**: events are lost if there are no active receivers at
//!   send time.
//!
//! Trackers never consume the bus: dependency resolution requires the
//! synchronous listener path. The bus exists for the asynchronous tail of the
//! system only.

use tokio::sync::broadcast;

use super::event::ServiceEvent;

/// Broadcast channel mirroring registry events.
///
/// Cheap to clone (internally holds an `Arc`-backed sender); multiple
/// publishers can publish concurrently and receivers get clones of each event.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<ServiceEvent>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (clamped to 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _rx) = broadcast::channel::<ServiceEvent>(capacity);
        Self { tx }
    }

    /// Publishes an event to all active receivers.
    ///
    /// If there are no receivers, the event is dropped.
    pub fn publish(&self, ev: ServiceEvent) {
        let _ = self.tx.send(ev);
    }

    /// Publishes a borrowed event by cloning it.
    pub fn publish_ref(&self, ev: &ServiceEvent) {
        let _ = self.tx.send(ev.clone());
    }

    /// Creates a new receiver that will observe subsequent events.
    ///
    /// Each call creates an independent receiver; a receiver only gets events
    /// sent after it subscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<ServiceEvent> {
        self.tx.subscribe()
    }
}
