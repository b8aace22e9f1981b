//! # Logging observer for debugging and demos.
//!
//! [`LogObserver`] drains a [`Bus`](crate::Bus) receiver on a background task
//! and logs every registry event via `tracing`. Useful during development;
//! production consumers will usually implement their own observer.

use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info};

use crate::events::bus::Bus;
use crate::events::event::EventKind;

/// Logs registry events from the observer bus.
#[derive(Default)]
pub struct LogObserver;

impl LogObserver {
    /// Spawns a background task that logs events until the bus is dropped.
    ///
    /// Lagged receivers skip the missed events and keep going.
    pub fn spawn(bus: &Bus) {
        let mut rx = bus.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => {
                        let id = ev.capability.id().unwrap_or("<none>").to_string();
                        match ev.kind {
                            EventKind::Registered => info!(
                                seq = ev.seq,
                                %id,
                                types = ?ev.capability.types(),
                                ranking = ev.capability.ranking(),
                                "capability registered"
                            ),
                            EventKind::Modified => info!(seq = ev.seq, %id, "capability modified"),
                            EventKind::Unregistering => {
                                info!(seq = ev.seq, %id, "capability unregistering")
                            }
                        }
                    }
                    Err(RecvError::Lagged(n)) => {
                        debug!(skipped = n, "log observer lagged behind the bus");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
    }
}
