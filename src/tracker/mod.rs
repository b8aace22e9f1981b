//! Dependency tracking: declarations, the component SPI, and the tracker.
//!
//! Internal modules:
//! - [`spec`]: dependency declarations (cardinality, multiplicity, filters);
//! - [`component`]: the user-facing [`Component`] trait and lifecycle states;
//! - [`tracker`]: the per-component resolution state machine.

mod component;
mod spec;
#[allow(clippy::module_inception)]
mod tracker;

pub use component::{Component, ComponentState};
pub use spec::{Cardinality, DependencySpec, Multiplicity};
pub use tracker::DependencyTracker;
