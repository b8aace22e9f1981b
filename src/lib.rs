//! # capvisor
//!
//! **Capvisor** is a dynamic capability registry for Rust.
//!
//! It provides primitives to publish typed service objects with searchable
//! properties, track dependencies between components as capabilities come
//! and go, and run published runnables on schedules. The crate is designed
//! as a building block for modular, plugin-style applications.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!  │  capability  │   │  capability  │   │  capability  │
//!  │ (publisher 1)│   │ (publisher 2)│   │ (publisher 3)│
//!  └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!         ▼                  ▼                  ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  ServiceRegistry                                            │
//! │  - entries (id → capability, properties, ranking)           │
//! │  - listeners (per-type, optional filter)                    │
//! │  - dispatch lock (total event order, re-entrant)            │
//! │  - Bus (broadcast mirror of every event)                    │
//! └──────┬──────────────────────┬──────────────────────┬────────┘
//!        │ Registered           │ Modified             │ Unregistering
//!        ▼                      ▼                      ▼
//! ┌───────────────────┐ ┌───────────────────┐ ┌───────────────────┐
//! │ DependencyTracker │ │ RunnableWatcher   │ │ your Consumer     │
//! │  bind/unbind on   │ │  schedule/        │ │                   │
//! │  Component        │ │  reschedule/      │ │                   │
//! │                   │ │  unschedule       │ │                   │
//! └───────────────────┘ └─────────┬─────────┘ └───────────────────┘
//!                                 ▼
//!                       ┌───────────────────┐
//!                       │ Scheduler         │
//!                       │  TimerActor per   │
//!                       │  task id          │
//!                       └───────────────────┘
//! ```
//!
//! ### Component lifecycle
//! ```text
//! DependencyTracker::start()
//!
//! Unsatisfied ──(all required deps matched)──► bind() per dep,
//!                                              declaration order
//!             ◄──(a bound required dep lost)── Valid
//!        ▲                                       │
//!        │                              Invalidating: unbind() ALL
//!        └───────────────────────────── bound deps, reverse order
//! ```
//!
//! ## Features
//! | Area             | Description                                                       | Key types / traits                        |
//! |------------------|-------------------------------------------------------------------|-------------------------------------------|
//! | **Registry**     | Publish/find typed capabilities with properties and ranking.      | [`ServiceRegistry`], [`CapabilitySnapshot`]|
//! | **Filters**      | LDAP-style property filters for lookups and dependencies.         | [`Filter`]                                 |
//! | **Events**       | Synchronous per-type listeners plus an async broadcast bus.       | [`Consumer`], [`ServiceEvent`], [`Bus`]    |
//! | **Tracking**     | Declarative dependencies with bind/unbind callbacks.              | [`Component`], [`DependencyTracker`]       |
//! | **Scheduling**   | Periodic/one-shot/manual execution of published runnables.        | [`Scheduler`], [`Runnable`], [`Schedule`]  |
//! | **Errors**       | Typed errors with stable log labels.                              | [`RegistryError`], [`ScheduleError`]       |
//! | **Configuration**| Centralize runtime settings.                                      | [`Config`]                                 |
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use capvisor::{
//!     CapabilitySnapshot, Component, ComponentState, Config, DependencySpec,
//!     DependencyTracker, Properties, PropertyValue, ServiceRegistry,
//! };
//!
//! struct Gateway;
//!
//! impl Component for Gateway {
//!     fn dependencies(&self) -> Vec<DependencySpec> {
//!         vec![DependencySpec::required("store", "storage")]
//!     }
//!     fn bind(&self, dep: &DependencySpec, capability: &CapabilitySnapshot) {
//!         println!("bound {} -> {:?}", dep.name(), capability.id());
//!     }
//!     fn unbind(&self, dep: &DependencySpec, _capability: &CapabilitySnapshot) {
//!         println!("unbound {}", dep.name());
//!     }
//! }
//!
//! let registry = ServiceRegistry::new(&Config::default());
//!
//! let tracker = DependencyTracker::new(registry.clone(), Arc::new(Gateway));
//! tracker.start();
//! assert_eq!(tracker.state(), ComponentState::Unsatisfied);
//!
//! let mut props = Properties::new();
//! props.insert("id".into(), PropertyValue::from("memdb"));
//! let handle = registry
//!     .publish(&["storage"], props, Arc::new(()))
//!     .unwrap();
//! assert_eq!(tracker.state(), ComponentState::Valid);
//!
//! registry.unpublish(&handle);
//! assert_eq!(tracker.state(), ComponentState::Unsatisfied);
//! ```
mod config;
mod error;
mod events;
mod registry;
mod scheduler;
mod tracker;

// ---- Public re-exports ----

pub use config::Config;
pub use error::{RegistryError, RuntimeError, ScheduleError, TaskError};
pub use events::{Bus, Consumer, EventKind, LogObserver, ServiceEvent};
pub use registry::{
    CapabilitySnapshot, Filter, ListenerHandle, Properties, PropertyValue, RegistrationHandle,
    ServiceObject, ServiceRegistry, KEY_AT, KEY_ID, KEY_PERIOD, KEY_RANKING,
};
pub use scheduler::{
    Runnable, RunnableFn, RunnableRef, RunnableService, RunnableWatcher, Schedule, Scheduler,
    RUNNABLE_CAPABILITY,
};
pub use tracker::{
    Cardinality, Component, ComponentState, DependencySpec, DependencyTracker, Multiplicity,
};
