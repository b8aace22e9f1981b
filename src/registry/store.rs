//! # ServiceRegistry: ranked capability store with ordered event fan-out.
//!
//! The registry is the single owner of capability storage. Providers publish
//! service instances under one or more capability type names; consumers query
//! with [`find`](ServiceRegistry::find) or subscribe with
//! [`add_listener`](ServiceRegistry::add_listener).
//!
//! ## Architecture
//! ```text
//! Provider ── publish(types, props, service) ──► ServiceRegistry
//!                                                  │ store (RwLock)
//!                                                  │ dispatch (ReentrantMutex)
//!                                                  ▼
//!                          Registered / Modified / Unregistering
//!                                  │                     │
//!                          Consumer::on_event      Bus (broadcast)
//!                          (sync, ordered)         (passive observers)
//! ```
//!
//! ## Rules
//! - Registration ids are monotonic; `find` orders by descending ranking,
//!   then ascending registration id (earliest registered wins ties).
//! - The dispatch lock is taken **before** the store mutation and released
//!   after fan-out, so listeners observe events for a capability type in
//!   mutation order. It is reentrant: a listener may publish or unpublish
//!   from its own thread without deadlocking.
//! - The store lock is never held while listener code runs.
//! - `Unregistering` is delivered while the entry is still present; removal
//!   happens after all listeners have run.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, ReentrantMutex, RwLock};
use tracing::debug;

use crate::config::Config;
use crate::error::RegistryError;
use crate::events::{deliver, Bus, Consumer, EventKind, ServiceEvent};
use crate::registry::capability::{CapabilitySnapshot, ServiceObject};
use crate::registry::filter::Filter;
use crate::registry::properties::{id_of, ranking_of, Properties, PropertyValue, KEY_RANKING};

/// Canonical stored capability. Only the registry mutates it, under the
/// store lock; everything handed out is a snapshot.
struct Entry {
    registration_id: u64,
    types: Arc<[String]>,
    properties: Arc<Properties>,
    ranking: i32,
    service: ServiceObject,
}

impl Entry {
    fn snapshot(&self) -> CapabilitySnapshot {
        CapabilitySnapshot::new(
            self.registration_id,
            Arc::clone(&self.types),
            Arc::clone(&self.properties),
            self.ranking,
            Arc::clone(&self.service),
        )
    }
}

struct ListenerEntry {
    listener_id: u64,
    capability_type: String,
    filter: Option<Filter>,
    consumer: Arc<dyn Consumer>,
}

impl ListenerEntry {
    fn matches(&self, capability: &CapabilitySnapshot) -> bool {
        capability.has_type(&self.capability_type)
            && self
                .filter
                .as_ref()
                .map_or(true, |f| f.matches(capability.properties()))
    }
}

/// Handle identifying a registered listener.
///
/// Pass it back to [`ServiceRegistry::remove_listener`] to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerHandle {
    listener_id: u64,
}

struct RegistryInner {
    entries: RwLock<HashMap<u64, Entry>>,
    listeners: Mutex<Vec<ListenerEntry>>,
    /// Serializes mutations + fan-out. Reentrant so listeners can mutate the
    /// registry from their own thread during delivery.
    dispatch: ReentrantMutex<()>,
    next_registration: AtomicU64,
    next_listener: AtomicU64,
    default_ranking: i32,
    bus: Bus,
}

/// Registration handle returned by [`ServiceRegistry::publish`].
///
/// Owns the capability's lifecycle: [`revoke`](RegistrationHandle::revoke)
/// removes the capability (idempotent), and
/// [`update_properties`](RegistrationHandle::update_properties) replaces its
/// property map atomically. Dropping the handle does **not** unpublish.
#[derive(Debug)]
pub struct RegistrationHandle {
    inner: Weak<RegistryInner>,
    registration_id: u64,
    revoked: AtomicBool,
}

impl RegistrationHandle {
    /// Returns the registration id assigned at publish time.
    pub fn registration_id(&self) -> u64 {
        self.registration_id
    }

    /// Removes the capability from the registry.
    ///
    /// Fires `Unregistering` synchronously to all current listeners before
    /// the entry disappears. Calling `revoke` a second time is a no-op.
    pub fn revoke(&self) {
        if self.revoked.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(inner) = self.inner.upgrade() {
            inner.unpublish(self.registration_id);
        }
    }

    /// Replaces the capability's properties atomically and fires `Modified`.
    ///
    /// Ranking is recomputed when the `ranking` property changed; already
    /// bound trackers re-evaluate on the `Modified` event.
    ///
    /// # Errors
    /// [`RegistryError::InvalidRegistration`] when the handle was revoked,
    /// the registry is gone, or the new map lacks a string `id` property.
    pub fn update_properties(&self, properties: Properties) -> Result<(), RegistryError> {
        if self.revoked.load(Ordering::SeqCst) {
            return Err(RegistryError::InvalidRegistration {
                reason: "registration already revoked".into(),
            });
        }
        let inner = self
            .inner
            .upgrade()
            .ok_or_else(|| RegistryError::InvalidRegistration {
                reason: "registry dropped".into(),
            })?;
        inner.update_properties(self.registration_id, properties)
    }
}

/// Ranked capability store with dynamic listeners.
///
/// Cheap to clone; clones share the same underlying store. There is no
/// process-wide singleton — construct one and pass it to all participants.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use capvisor::{Config, Properties, PropertyValue, ServiceRegistry};
///
/// let registry = ServiceRegistry::new(&Config::default());
///
/// let mut props = Properties::new();
/// props.insert("id".into(), PropertyValue::from("greeter"));
/// let handle = registry
///     .publish(&["greeting"], props, Arc::new("hello".to_string()))
///     .unwrap();
///
/// let found = registry.find("greeting", None);
/// assert_eq!(found.len(), 1);
/// assert_eq!(*found[0].service_as::<String>().unwrap(), "hello");
///
/// handle.revoke();
/// assert!(registry.find("greeting", None).is_empty());
/// ```
#[derive(Clone)]
pub struct ServiceRegistry {
    inner: Arc<RegistryInner>,
}

impl ServiceRegistry {
    /// Creates an empty registry.
    pub fn new(cfg: &Config) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                entries: RwLock::new(HashMap::new()),
                listeners: Mutex::new(Vec::new()),
                dispatch: ReentrantMutex::new(()),
                next_registration: AtomicU64::new(1),
                next_listener: AtomicU64::new(1),
                default_ranking: cfg.default_ranking,
                bus: Bus::new(cfg.bus_capacity),
            }),
        }
    }

    /// Publishes a service instance under the given capability types.
    ///
    /// Assigns a monotonically increasing registration id and fires
    /// `Registered` to all interested listeners before returning.
    ///
    /// # Errors
    /// [`RegistryError::InvalidRegistration`] when `types` is empty or the
    /// property map lacks a string `id`.
    pub fn publish(
        &self,
        types: &[&str],
        mut properties: Properties,
        service: ServiceObject,
    ) -> Result<RegistrationHandle, RegistryError> {
        if types.is_empty() {
            return Err(RegistryError::InvalidRegistration {
                reason: "empty capability types".into(),
            });
        }
        if id_of(&properties).is_none() {
            return Err(RegistryError::InvalidRegistration {
                reason: "missing string `id` property".into(),
            });
        }
        let ranking = ranking_of(&properties, self.inner.default_ranking);
        properties.insert(KEY_RANKING.into(), PropertyValue::Int(i64::from(ranking)));

        let inner = &self.inner;
        let _dispatch = inner.dispatch.lock();

        let registration_id = inner.next_registration.fetch_add(1, Ordering::SeqCst);
        let entry = Entry {
            registration_id,
            types: Arc::from(types.iter().map(|t| t.to_string()).collect::<Vec<_>>()),
            properties: Arc::new(properties),
            ranking,
            service,
        };
        let snapshot = entry.snapshot();
        inner.entries.write().insert(registration_id, entry);

        debug!(registration_id, types = ?snapshot.types(), ranking, "capability published");
        inner.fan_out(ServiceEvent::new(EventKind::Registered, snapshot));

        Ok(RegistrationHandle {
            inner: Arc::downgrade(inner),
            registration_id,
            revoked: AtomicBool::new(false),
        })
    }

    /// Removes a capability via its handle. Equivalent to
    /// [`RegistrationHandle::revoke`]; idempotent.
    pub fn unpublish(&self, handle: &RegistrationHandle) {
        handle.revoke();
    }

    /// Returns snapshots of all capabilities of the given type, ordered by
    /// descending ranking, then ascending registration id.
    ///
    /// An unknown capability type yields an empty vec, not an error. The
    /// optional filter scopes visibility the way framework find-hooks do.
    pub fn find(&self, capability_type: &str, filter: Option<&Filter>) -> Vec<CapabilitySnapshot> {
        let entries = self.inner.entries.read();
        let mut matches: Vec<CapabilitySnapshot> = entries
            .values()
            .filter(|e| e.types.iter().any(|t| t == capability_type))
            .filter(|e| filter.map_or(true, |f| f.matches(&e.properties)))
            .map(Entry::snapshot)
            .collect();
        matches.sort_by(|a, b| {
            b.ranking()
                .cmp(&a.ranking())
                .then(a.registration_id().cmp(&b.registration_id()))
        });
        matches
    }

    /// Subscribes a consumer to events for one capability type.
    ///
    /// Synthetic `Registered` events for pre-existing matches are delivered
    /// to the new consumer before this call returns, in registration order,
    /// so there is no race window between subscribe and publish.
    pub fn add_listener(
        &self,
        capability_type: &str,
        filter: Option<Filter>,
        consumer: Arc<dyn Consumer>,
    ) -> ListenerHandle {
        let inner = &self.inner;
        let _dispatch = inner.dispatch.lock();

        let listener_id = inner.next_listener.fetch_add(1, Ordering::SeqCst);
        let entry = ListenerEntry {
            listener_id,
            capability_type: capability_type.to_string(),
            filter,
            consumer: Arc::clone(&consumer),
        };

        // Snapshot existing matches before the listener can see live events.
        let mut existing: Vec<CapabilitySnapshot> = {
            let entries = inner.entries.read();
            entries
                .values()
                .filter(|e| entry.matches(&e.snapshot()))
                .map(Entry::snapshot)
                .collect()
        };
        existing.sort_by_key(CapabilitySnapshot::registration_id);

        inner.listeners.lock().push(entry);

        // Replays are per-listener catch-up, not registry mutations; they are
        // never mirrored on the bus.
        for snapshot in existing {
            let ev = ServiceEvent::new(EventKind::Registered, snapshot);
            deliver(consumer.as_ref(), &ev);
        }

        ListenerHandle { listener_id }
    }

    /// Unsubscribes a previously added consumer. Unknown handles are a no-op.
    pub fn remove_listener(&self, handle: ListenerHandle) {
        let _dispatch = self.inner.dispatch.lock();
        self.inner
            .listeners
            .lock()
            .retain(|l| l.listener_id != handle.listener_id);
    }

    /// Returns the observer bus mirroring all registry events.
    pub fn bus(&self) -> &Bus {
        &self.inner.bus
    }

    /// Number of live capabilities.
    pub fn len(&self) -> usize {
        self.inner.entries.read().len()
    }

    /// True when no capabilities are published.
    pub fn is_empty(&self) -> bool {
        self.inner.entries.read().is_empty()
    }

    /// Sorted registration ids of live capabilities, for diagnostics.
    pub fn capability_ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.inner.entries.read().keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

impl RegistryInner {
    fn unpublish(&self, registration_id: u64) {
        let _dispatch = self.dispatch.lock();

        let snapshot = match self.entries.read().get(&registration_id) {
            Some(entry) => entry.snapshot(),
            None => return,
        };

        // Pre-delivery: listeners run while the entry is still findable.
        debug!(registration_id, "capability unregistering");
        self.fan_out(ServiceEvent::new(EventKind::Unregistering, snapshot));

        self.entries.write().remove(&registration_id);
    }

    fn update_properties(
        &self,
        registration_id: u64,
        mut properties: Properties,
    ) -> Result<(), RegistryError> {
        if id_of(&properties).is_none() {
            return Err(RegistryError::InvalidRegistration {
                reason: "missing string `id` property".into(),
            });
        }
        let ranking = ranking_of(&properties, self.default_ranking);
        properties.insert(KEY_RANKING.into(), PropertyValue::Int(i64::from(ranking)));

        let _dispatch = self.dispatch.lock();

        let snapshot = {
            let mut entries = self.entries.write();
            let entry = entries.get_mut(&registration_id).ok_or_else(|| {
                RegistryError::InvalidRegistration {
                    reason: "capability no longer registered".into(),
                }
            })?;
            entry.properties = Arc::new(properties);
            entry.ranking = ranking;
            entry.snapshot()
        };

        self.fan_out(ServiceEvent::new(EventKind::Modified, snapshot));
        Ok(())
    }

    /// Delivers one event to every matching listener, then mirrors it on the
    /// bus. Caller holds the dispatch lock; the store lock must already be
    /// released.
    fn fan_out(&self, event: ServiceEvent) {
        let interested: Vec<Arc<dyn Consumer>> = {
            let listeners = self.listeners.lock();
            listeners
                .iter()
                .filter(|l| l.matches(&event.capability))
                .map(|l| Arc::clone(&l.consumer))
                .collect()
        };
        for consumer in interested {
            deliver(consumer.as_ref(), &event);
        }
        self.bus.publish(event);
    }
}
