//! # Synchronous listener dispatch with panic isolation.
//!
//! Provides the [`Consumer`] trait — the crate's listener SPI — and the
//! delivery helper used by the registry during fan-out.
//!
//! ## Rules
//! - Delivery is synchronous with respect to the registry mutation that
//!   triggered it: `unpublish` does not complete until every interested
//!   consumer has observed `Unregistering`.
//! - The registry's store lock is **not** held while consumer code runs;
//!   consumers may call `find`, `publish`, or `unpublish` re-entrantly from
//!   their own thread.
//! - A panic inside one consumer is caught and logged; remaining consumers
//!   still receive the event and the mutation is never unwound.

use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::warn;

use crate::events::event::ServiceEvent;

/// Listener SPI for capability lifecycle events.
///
/// Consumers are registered per capability type via
/// [`ServiceRegistry::add_listener`](crate::ServiceRegistry::add_listener)
/// and invoked synchronously during registry mutations.
///
/// ### Implementation requirements
/// - `on_event` may block briefly but must not wait on registry mutations
///   performed by other threads (the dispatch path is serialized).
/// - Panics are caught by the dispatcher; prefer handling errors internally.
pub trait Consumer: Send + Sync + 'static {
    /// Processes a single event.
    ///
    /// Called in registry-mutation order for the capability types this
    /// consumer subscribed to.
    fn on_event(&self, event: &ServiceEvent);

    /// Returns the consumer name used in fan-out failure logs.
    ///
    /// The default uses `type_name::<Self>()`, which can be verbose —
    /// override it when possible.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Invokes one consumer, catching and logging panics.
///
/// A failing consumer never prevents delivery to the remaining consumers or
/// unwinds the registry mutation in progress.
pub(crate) fn deliver(consumer: &dyn Consumer, event: &ServiceEvent) {
    if let Err(panic_err) = catch_unwind(AssertUnwindSafe(|| consumer.on_event(event))) {
        warn!(
            consumer = consumer.name(),
            seq = event.seq,
            kind = ?event.kind,
            "listener failure during event fan-out: {panic_err:?}"
        );
    }
}
