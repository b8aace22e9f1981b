//! # DependencyTracker: per-component dependency resolution.
//!
//! One tracker owns one [`Component`]. It subscribes to registry events for
//! every capability type the component depends on, re-resolves the dependency
//! set on each event, and drives the component through its lifecycle states.
//!
//! ## State machine
//! ```text
//! Unsatisfied ──(all required deps have ≥1 match)──► Valid
//!      ▲                                               │
//!      │          (a required dep lost its last match) │
//!      └────── Invalidating ◄───────────────────────────┘
//!              (unbind ALL deps, not just the failed one)
//! ```
//!
//! ## Rules
//! - Bind/unbind sequences are serialized per component (one mutex per
//!   tracker, never a global lock).
//! - The tracker re-queries the registry on every event instead of trusting
//!   cached capability objects; it remembers only what it has bound.
//! - For `Single` dependencies a better-ranked arrival hot-swaps the binding
//!   (unbind old, bind new) without leaving `Valid`.
//! - During `Unregistering` the dying capability is still present in the
//!   store; resolution explicitly excludes it.
//! - Re-satisfaction from `Unsatisfied` rebinds every dependency in
//!   declaration order.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::debug;

use crate::events::{Consumer, EventKind, ServiceEvent};
use crate::registry::{CapabilitySnapshot, ListenerHandle, ServiceRegistry};
use crate::tracker::component::{Component, ComponentState};
use crate::tracker::spec::{Cardinality, DependencySpec, Multiplicity};

struct TrackerState {
    state: ComponentState,
    /// Bound snapshots, parallel to the dependency declarations.
    bound: Vec<Vec<CapabilitySnapshot>>,
}

struct TrackerInner {
    registry: ServiceRegistry,
    component: Arc<dyn Component>,
    /// Declaration order, fixed at start.
    deps: Vec<DependencySpec>,
    state: Mutex<TrackerState>,
    listeners: Mutex<Vec<ListenerHandle>>,
}

/// Forwards registry events to the owning tracker.
///
/// Holds a weak reference so a dropped tracker does not keep delivering.
struct TrackerListener {
    inner: Weak<TrackerInner>,
}

impl Consumer for TrackerListener {
    fn on_event(&self, event: &ServiceEvent) {
        if let Some(inner) = self.inner.upgrade() {
            let exclude = match event.kind {
                EventKind::Unregistering => Some(event.capability.registration_id()),
                _ => None,
            };
            inner.reevaluate(exclude);
        }
    }

    fn name(&self) -> &'static str {
        "dependency-tracker"
    }
}

/// Tracks one component's dependencies against a registry.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use capvisor::{
///     Component, ComponentState, Config, DependencySpec, DependencyTracker,
///     Properties, PropertyValue, ServiceRegistry,
/// };
///
/// struct Consumer;
/// impl Component for Consumer {
///     fn dependencies(&self) -> Vec<DependencySpec> {
///         vec![DependencySpec::required("db", "db")]
///     }
///     fn bind(&self, _d: &DependencySpec, _c: &capvisor::CapabilitySnapshot) {}
///     fn unbind(&self, _d: &DependencySpec, _c: &capvisor::CapabilitySnapshot) {}
/// }
///
/// let registry = ServiceRegistry::new(&Config::default());
/// let tracker = DependencyTracker::new(registry.clone(), Arc::new(Consumer));
/// tracker.start();
/// assert_eq!(tracker.state(), ComponentState::Unsatisfied);
///
/// let mut props = Properties::new();
/// props.insert("id".into(), PropertyValue::from("pg"));
/// let _h = registry.publish(&["db"], props, Arc::new(())).unwrap();
/// assert_eq!(tracker.state(), ComponentState::Valid);
/// ```
pub struct DependencyTracker {
    inner: Arc<TrackerInner>,
}

impl DependencyTracker {
    /// Creates a tracker for the given component. Call
    /// [`start`](DependencyTracker::start) to begin resolution.
    pub fn new(registry: ServiceRegistry, component: Arc<dyn Component>) -> Self {
        let deps = component.dependencies();
        let bound = deps.iter().map(|_| Vec::new()).collect();
        Self {
            inner: Arc::new(TrackerInner {
                registry,
                component,
                deps,
                state: Mutex::new(TrackerState {
                    state: ComponentState::Unsatisfied,
                    bound,
                }),
                listeners: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Subscribes to the component's capability types and performs the
    /// initial resolution. Idempotent: a second call is a no-op.
    ///
    /// Listeners are registered per distinct capability type without a
    /// property filter — a `Modified` event that makes a bound capability
    /// stop matching must still reach the tracker.
    pub fn start(&self) {
        {
            let mut listeners = self.inner.listeners.lock();
            if !listeners.is_empty() {
                return;
            }
            let mut types: Vec<&str> = self
                .inner
                .deps
                .iter()
                .map(DependencySpec::capability_type)
                .collect();
            types.sort_unstable();
            types.dedup();

            for capability_type in types {
                let consumer = Arc::new(TrackerListener {
                    inner: Arc::downgrade(&self.inner),
                });
                // synthetic Registered events run the initial resolution
                let handle = self
                    .inner
                    .registry
                    .add_listener(capability_type, None, consumer);
                listeners.push(handle);
            }
        }
        // no pre-existing matches means no synthetic events; a component
        // without required dependencies still has to become valid
        self.inner.reevaluate(None);
    }

    /// Unsubscribes and unbinds everything; the component returns to
    /// `Unsatisfied`.
    pub fn stop(&self) {
        let handles: Vec<ListenerHandle> = self.inner.listeners.lock().drain(..).collect();
        for handle in handles {
            self.inner.registry.remove_listener(handle);
        }
        let mut st = self.inner.state.lock();
        if st.state == ComponentState::Valid {
            self.inner.teardown(&mut st);
        }
    }

    /// Returns the component's current lifecycle state.
    pub fn state(&self) -> ComponentState {
        self.inner.state.lock().state
    }

    /// Returns the snapshots currently bound for the named dependency.
    pub fn bound_for(&self, dependency_name: &str) -> Vec<CapabilitySnapshot> {
        let st = self.inner.state.lock();
        self.inner
            .deps
            .iter()
            .position(|d| d.name() == dependency_name)
            .map(|i| st.bound[i].clone())
            .unwrap_or_default()
    }
}

impl TrackerInner {
    /// Re-resolves every dependency and applies the state machine. Holding
    /// the state mutex for the whole pass serializes bind/unbind sequences
    /// per component.
    fn reevaluate(&self, exclude: Option<u64>) {
        let mut st = self.state.lock();

        let matches: Vec<Vec<CapabilitySnapshot>> = self
            .deps
            .iter()
            .map(|dep| {
                self.registry
                    .find(dep.capability_type(), dep.filter())
                    .into_iter()
                    .filter(|c| Some(c.registration_id()) != exclude)
                    .collect()
            })
            .collect();

        let satisfied = self.deps.iter().zip(&matches).all(|(dep, m)| {
            dep.cardinality() == Cardinality::Optional || !m.is_empty()
        });

        match (st.state, satisfied) {
            (ComponentState::Unsatisfied, true) => self.activate(&mut st, &matches),
            (ComponentState::Valid, false) => self.teardown(&mut st),
            (ComponentState::Valid, true) => self.reconcile(&mut st, &matches),
            _ => {}
        }
    }

    /// `Unsatisfied -> Valid`: bind every dependency in declaration order.
    fn activate(&self, st: &mut TrackerState, matches: &[Vec<CapabilitySnapshot>]) {
        for (i, dep) in self.deps.iter().enumerate() {
            let selected: &[CapabilitySnapshot] = match dep.multiplicity() {
                Multiplicity::Single => match matches[i].first() {
                    Some(first) => std::slice::from_ref(first),
                    None => &[],
                },
                Multiplicity::Aggregate => &matches[i],
            };
            for capability in selected {
                self.component.bind(dep, capability);
                st.bound[i].push(capability.clone());
            }
        }
        st.state = ComponentState::Valid;
        debug!("component valid");
    }

    /// `Valid -> Invalidating -> Unsatisfied`: unbind **all** dependencies in
    /// reverse declaration order so the component never observes a partially
    /// bound state.
    fn teardown(&self, st: &mut TrackerState) {
        st.state = ComponentState::Invalidating;
        for i in (0..self.deps.len()).rev() {
            let bound: Vec<CapabilitySnapshot> = st.bound[i].drain(..).collect();
            for capability in bound.into_iter().rev() {
                self.component.unbind(&self.deps[i], &capability);
            }
        }
        st.state = ComponentState::Unsatisfied;
        debug!("component unsatisfied");
    }

    /// Still `Valid`: apply incremental changes per dependency.
    fn reconcile(&self, st: &mut TrackerState, matches: &[Vec<CapabilitySnapshot>]) {
        for (i, dep) in self.deps.iter().enumerate() {
            match dep.multiplicity() {
                Multiplicity::Single => {
                    let desired = matches[i].first();
                    let current = st.bound[i].first().cloned();
                    match (current, desired) {
                        (None, Some(cap)) => {
                            self.component.bind(dep, cap);
                            st.bound[i].push(cap.clone());
                        }
                        (Some(old), None) => {
                            st.bound[i].clear();
                            self.component.unbind(dep, &old);
                        }
                        (Some(old), Some(new))
                            if old.registration_id() != new.registration_id() =>
                        {
                            // hot swap, no validity transition
                            st.bound[i].clear();
                            self.component.unbind(dep, &old);
                            self.component.bind(dep, new);
                            st.bound[i].push(new.clone());
                        }
                        _ => {}
                    }
                }
                Multiplicity::Aggregate => {
                    let match_ids: Vec<u64> =
                        matches[i].iter().map(CapabilitySnapshot::registration_id).collect();
                    let bound_ids: Vec<u64> =
                        st.bound[i].iter().map(CapabilitySnapshot::registration_id).collect();

                    let removed: Vec<CapabilitySnapshot> = st.bound[i]
                        .iter()
                        .filter(|c| !match_ids.contains(&c.registration_id()))
                        .cloned()
                        .collect();
                    st.bound[i].retain(|c| match_ids.contains(&c.registration_id()));
                    for capability in removed {
                        self.component.unbind(dep, &capability);
                    }

                    for capability in &matches[i] {
                        if !bound_ids.contains(&capability.registration_id()) {
                            self.component.bind(dep, capability);
                            st.bound[i].push(capability.clone());
                        }
                    }
                }
            }
        }
    }
}
