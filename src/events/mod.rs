//! Registry events: data model, synchronous dispatch, and the observer bus.
//!
//! ## Contents
//! - [`EventKind`], [`ServiceEvent`]: event classification and payload
//! - [`Consumer`]: the synchronous listener SPI (trackers, the scheduler watcher)
//! - [`Bus`]: broadcast mirror of all events for passive observers
//! - [`LogObserver`]: ready-made observer logging events via `tracing`
//!
//! ## Quick reference
//! - **Publishers**: `ServiceRegistry` (all mutations).
//! - **Synchronous consumers**: `DependencyTracker`, `RunnableWatcher`,
//!   user listeners — ordered, pre-removal delivery.
//! - **Asynchronous observers**: anything draining `Bus::subscribe()` —
//!   fire-and-forget with lag semantics.

mod bus;
mod dispatch;
mod event;
mod log;

pub use bus::Bus;
pub use dispatch::Consumer;
pub use event::{EventKind, ServiceEvent};
pub use log::LogObserver;

pub(crate) use dispatch::deliver;
