//! # Component SPI and lifecycle states.
//!
//! A [`Component`] declares its dependencies once and receives `bind`/`unbind`
//! callbacks as the tracker resolves them against the registry.
//!
//! ## Rules
//! - Exactly one `bind` fires per newly selected match per dependency;
//!   exactly one `unbind` fires when a bound match is removed or superseded.
//! - Callbacks for one component never run concurrently (serialized by the
//!   tracker); different components may be called back in parallel.
//! - Callbacks must not publish or unpublish capabilities of a type the same
//!   component depends on — the tracker's per-component lock is not reentrant.

use crate::registry::CapabilitySnapshot;
use crate::tracker::spec::DependencySpec;

/// Lifecycle state of a tracked component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentState {
    /// At least one required dependency has no match; nothing is bound.
    Unsatisfied,
    /// Every required dependency has a bound match.
    Valid,
    /// A required dependency lost its last match; unbind callbacks for all
    /// dependencies are running. Transient — observable only from another
    /// thread while the teardown is in progress.
    Invalidating,
}

/// User-implemented component with declared dependencies.
///
/// # Example
/// ```
/// use capvisor::{CapabilitySnapshot, Component, DependencySpec};
///
/// struct CacheUser;
///
/// impl Component for CacheUser {
///     fn dependencies(&self) -> Vec<DependencySpec> {
///         vec![DependencySpec::required("cache", "cache")]
///     }
///
///     fn bind(&self, dep: &DependencySpec, capability: &CapabilitySnapshot) {
///         let _ = (dep, capability); // stash the service object
///     }
///
///     fn unbind(&self, dep: &DependencySpec, capability: &CapabilitySnapshot) {
///         let _ = (dep, capability); // drop the stashed object
///     }
/// }
/// ```
pub trait Component: Send + Sync + 'static {
    /// Returns the dependency declarations, in declaration order.
    ///
    /// Called once when the tracker starts; later changes are not observed.
    fn dependencies(&self) -> Vec<DependencySpec>;

    /// A match was selected for `dep`.
    fn bind(&self, dep: &DependencySpec, capability: &CapabilitySnapshot);

    /// A previously bound match was removed or superseded.
    fn unbind(&self, dep: &DependencySpec, capability: &CapabilitySnapshot);
}
