//! # Registry events.
//!
//! The [`EventKind`] enum classifies the three lifecycle transitions a
//! capability can go through; [`ServiceEvent`] carries the kind plus a
//! [`CapabilitySnapshot`](crate::CapabilitySnapshot) taken at mutation time.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically, assigned while the dispatch lock is held. For a single
//! capability type, listeners observe events in `seq` order — which equals
//! publish order. No ordering is guaranteed across unrelated types.

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::registry::CapabilitySnapshot;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of capability lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A capability was published (or already existed at subscribe time —
    /// listeners receive a synthetic `Registered` for pre-existing matches).
    Registered,

    /// A capability's properties were replaced atomically.
    ///
    /// The snapshot carries the **new** properties; snapshots taken earlier
    /// keep the old ones.
    Modified,

    /// A capability is about to be removed.
    ///
    /// Delivered while the entry is still present in the registry, so
    /// listeners can still `find` it; removal completes once all listeners
    /// have run.
    Unregistering,
}

/// A capability lifecycle event with its point-in-time snapshot.
#[derive(Clone, Debug)]
pub struct ServiceEvent {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Snapshot of the capability as of the triggering mutation.
    pub capability: CapabilitySnapshot,
}

impl ServiceEvent {
    /// Creates a new event of the given kind with the next sequence number.
    pub(crate) fn new(kind: EventKind, capability: CapabilitySnapshot) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            capability,
        }
    }
}
