//! # Registry watcher that schedules published runnables.
//!
//! [`RunnableWatcher`] bridges the capability registry and the scheduler:
//! any capability published under [`RUNNABLE_CAPABILITY`] whose properties
//! carry timing information becomes a scheduled task, keyed by the
//! capability's `id` property.
//!
//! ```text
//! ServiceRegistry ── events ──► RunnableWatcher ──► Scheduler
//!     Registered                                      schedule(id, ..)
//!     Modified                                        reschedule(id, ..)
//!     Unregistering                                   unschedule(id)
//! ```
//!
//! ## Rules
//! - Malformed timing properties drop the capability with a warning; the
//!   registration itself is unaffected.
//! - A published service that is not a [`RunnableService`] is skipped with
//!   a warning.
//! - Property updates replace the timing only; the bound runnable stays.

use std::sync::Arc;

use crate::events::{Consumer, EventKind, ServiceEvent};
use crate::registry::{CapabilitySnapshot, ListenerHandle, ServiceRegistry};

use super::options::Schedule;
use super::runnable::{RunnableService, RUNNABLE_CAPABILITY};
use super::scheduler::Scheduler;

pub struct RunnableWatcher {
    scheduler: Scheduler,
}

impl RunnableWatcher {
    pub fn new(scheduler: Scheduler) -> Self {
        Self { scheduler }
    }

    /// Subscribes a watcher to `registry` for runnable capabilities.
    ///
    /// Capabilities already published are picked up through event replay, so
    /// attach order does not matter.
    pub fn attach(registry: &ServiceRegistry, scheduler: Scheduler) -> ListenerHandle {
        registry.add_listener(
            RUNNABLE_CAPABILITY,
            None,
            Arc::new(RunnableWatcher::new(scheduler)),
        )
    }

    fn schedule(&self, id: &str, capability: &CapabilitySnapshot) {
        let schedule = match Schedule::from_properties(capability.properties()) {
            Ok(schedule) => schedule,
            Err(err) => {
                tracing::warn!(
                    task = %id,
                    error = %err,
                    "runnable capability has unusable timing properties, skipping"
                );
                return;
            }
        };
        let Some(service) = capability.service_as::<RunnableService>() else {
            tracing::warn!(task = %id, "runnable capability is not a RunnableService, skipping");
            return;
        };
        self.scheduler.schedule(id, service.runnable().clone(), schedule);
        tracing::debug!(task = %id, ?schedule, "runnable scheduled");
    }

    fn modified(&self, id: &str, capability: &CapabilitySnapshot) {
        if !self.scheduler.contains(id) {
            // timing properties may have been added after publication
            self.schedule(id, capability);
            return;
        }
        match Schedule::from_properties(capability.properties()) {
            Ok(schedule) => {
                if let Err(err) = self.scheduler.reschedule(id, schedule) {
                    tracing::warn!(task = %id, error = %err, "reschedule failed");
                }
            }
            Err(err) => {
                tracing::warn!(
                    task = %id,
                    error = %err,
                    "updated timing properties are unusable, keeping previous schedule"
                );
            }
        }
    }
}

impl Consumer for RunnableWatcher {
    fn on_event(&self, event: &ServiceEvent) {
        let capability = &event.capability;
        let Some(id) = capability.id() else {
            return;
        };
        match event.kind {
            EventKind::Registered => self.schedule(id, capability),
            EventKind::Modified => self.modified(id, capability),
            EventKind::Unregistering => {
                self.scheduler.unschedule(id);
            }
        }
    }

    fn name(&self) -> &'static str {
        "runnable-watcher"
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::config::Config;
    use crate::error::TaskError;
    use crate::registry::{Properties, PropertyValue, ServiceObject, KEY_ID, KEY_PERIOD};
    use crate::scheduler::runnable::{RunnableFn, RunnableRef};

    fn counting_service() -> (ServiceObject, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let probe = count.clone();
        let runnable: RunnableRef = RunnableFn::arc(move |_ctx: CancellationToken| {
            let probe = probe.clone();
            async move {
                probe.fetch_add(1, Ordering::SeqCst);
                Ok::<_, TaskError>(())
            }
        });
        (RunnableService::new(runnable), count)
    }

    fn props(id: &str, period: &str) -> Properties {
        let mut props = Properties::new();
        props.insert(KEY_ID.into(), PropertyValue::from(id));
        props.insert(KEY_PERIOD.into(), PropertyValue::from(period));
        props
    }

    #[tokio::test(start_paused = true)]
    async fn test_published_runnable_gets_scheduled() {
        let config = Config::default();
        let registry = ServiceRegistry::new(&config);
        let scheduler = Scheduler::new(&config);
        let _listener = RunnableWatcher::attach(&registry, scheduler.clone());

        let (service, count) = counting_service();
        registry
            .publish(&[RUNNABLE_CAPABILITY], props("flush", "100ms"), service)
            .unwrap();
        assert!(scheduler.contains("flush"));

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);

        scheduler.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_published_runnable_is_replayed() {
        let config = Config::default();
        let registry = ServiceRegistry::new(&config);
        let scheduler = Scheduler::new(&config);

        let (service, _count) = counting_service();
        registry
            .publish(&[RUNNABLE_CAPABILITY], props("early", "manual"), service)
            .unwrap();

        let _listener = RunnableWatcher::attach(&registry, scheduler.clone());
        assert!(scheduler.contains("early"));

        scheduler.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_property_update_reschedules() {
        let config = Config::default();
        let registry = ServiceRegistry::new(&config);
        let scheduler = Scheduler::new(&config);
        let _listener = RunnableWatcher::attach(&registry, scheduler.clone());

        let (service, count) = counting_service();
        let handle = registry
            .publish(&[RUNNABLE_CAPABILITY], props("tick", "1h"), service)
            .unwrap();

        handle.update_properties(props("tick", "100ms")).unwrap();
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);

        scheduler.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_unpublish_unschedules() {
        let config = Config::default();
        let registry = ServiceRegistry::new(&config);
        let scheduler = Scheduler::new(&config);
        let _listener = RunnableWatcher::attach(&registry, scheduler.clone());

        let (service, count) = counting_service();
        let handle = registry
            .publish(&[RUNNABLE_CAPABILITY], props("tick", "100ms"), service)
            .unwrap();
        assert!(scheduler.contains("tick"));

        registry.unpublish(&handle);
        assert!(!scheduler.contains("tick"));

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bad_timing_properties_are_skipped() {
        let config = Config::default();
        let registry = ServiceRegistry::new(&config);
        let scheduler = Scheduler::new(&config);
        let _listener = RunnableWatcher::attach(&registry, scheduler.clone());

        let (service, _count) = counting_service();
        registry
            .publish(&[RUNNABLE_CAPABILITY], props("broken", "0 * * * *"), service)
            .unwrap();
        assert!(!scheduler.contains("broken"));
        assert!(scheduler.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_runnable_service_is_skipped() {
        let config = Config::default();
        let registry = ServiceRegistry::new(&config);
        let scheduler = Scheduler::new(&config);
        let _listener = RunnableWatcher::attach(&registry, scheduler.clone());

        let service: ServiceObject = Arc::new(42_u32);
        registry
            .publish(&[RUNNABLE_CAPABILITY], props("odd", "1s"), service)
            .unwrap();
        assert!(!scheduler.contains("odd"));
    }
}
