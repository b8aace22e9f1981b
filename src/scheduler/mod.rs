//! # Scheduled execution of runnable capabilities.
//!
//! The scheduler subsystem has four parts:
//!
//! - [`Runnable`] / [`RunnableFn`] — the async task body contract.
//! - [`Schedule`] — when a task fires, derived from capability properties.
//! - [`Scheduler`] — named tasks, one timer actor each.
//! - [`RunnableWatcher`] — registry listener that turns published
//!   [`RunnableService`] capabilities into scheduled tasks.

mod options;
mod runnable;
#[allow(clippy::module_inception)]
mod scheduler;
mod timer;
mod watcher;

pub use options::Schedule;
pub use runnable::{Runnable, RunnableFn, RunnableRef, RunnableService, RUNNABLE_CAPABILITY};
pub use scheduler::Scheduler;
pub use watcher::RunnableWatcher;
