//! # Capability snapshots.
//!
//! A [`CapabilitySnapshot`] is a point-in-time copy of a published capability:
//! registration id, capability types, a frozen property map, ranking, and the
//! shared service object. Snapshots are handed to listeners and returned from
//! [`find`](crate::ServiceRegistry::find); they are never mutated after
//! creation — a later `update_properties` produces a *new* snapshot and
//! leaves old ones untouched.
//!
//! ## Rules
//! - The registry owns the canonical entry; snapshots are cheap clones
//!   (`Arc`-backed types and properties).
//! - Consumers must re-query the registry across event boundaries instead of
//!   caching snapshots as a source of truth.

use std::any::Any;
use std::sync::Arc;

use crate::registry::properties::{id_of, Properties};

/// Shared, type-erased service instance owned by a provider.
///
/// Consumers recover the concrete type with
/// [`CapabilitySnapshot::service_as`].
pub type ServiceObject = Arc<dyn Any + Send + Sync>;

/// Point-in-time copy of a published capability.
#[derive(Clone)]
pub struct CapabilitySnapshot {
    registration_id: u64,
    types: Arc<[String]>,
    properties: Arc<Properties>,
    ranking: i32,
    service: ServiceObject,
}

impl CapabilitySnapshot {
    pub(crate) fn new(
        registration_id: u64,
        types: Arc<[String]>,
        properties: Arc<Properties>,
        ranking: i32,
        service: ServiceObject,
    ) -> Self {
        Self {
            registration_id,
            types,
            properties,
            ranking,
            service,
        }
    }

    /// Returns the monotonically increasing registration id.
    pub fn registration_id(&self) -> u64 {
        self.registration_id
    }

    /// Returns the capability type names this capability was published under.
    pub fn types(&self) -> &[String] {
        &self.types
    }

    /// Returns true if the capability was published under the given type.
    pub fn has_type(&self, capability_type: &str) -> bool {
        self.types.iter().any(|t| t == capability_type)
    }

    /// Returns the property map as of snapshot time.
    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    /// Returns the `id` property, if present.
    pub fn id(&self) -> Option<&str> {
        id_of(&self.properties)
    }

    /// Returns the ranking as of snapshot time.
    pub fn ranking(&self) -> i32 {
        self.ranking
    }

    /// Returns the type-erased service object.
    pub fn service(&self) -> &ServiceObject {
        &self.service
    }

    /// Downcasts the service object to a concrete type.
    ///
    /// Returns `None` when the published instance is of a different type.
    pub fn service_as<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.service).downcast::<T>().ok()
    }
}

impl std::fmt::Debug for CapabilitySnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilitySnapshot")
            .field("registration_id", &self.registration_id)
            .field("types", &self.types)
            .field("ranking", &self.ranking)
            .field("properties", &self.properties)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::properties::PropertyValue;

    fn snapshot(service: ServiceObject) -> CapabilitySnapshot {
        let mut props = Properties::new();
        props.insert("id".into(), PropertyValue::from("c1"));
        CapabilitySnapshot::new(
            1,
            Arc::from(vec!["cache".to_string()]),
            Arc::new(props),
            0,
            service,
        )
    }

    #[test]
    fn test_downcast_roundtrip() {
        let snap = snapshot(Arc::new(42_u32));
        assert_eq!(*snap.service_as::<u32>().unwrap(), 42);
        assert!(snap.service_as::<String>().is_none());
    }

    #[test]
    fn test_type_membership() {
        let snap = snapshot(Arc::new(()));
        assert!(snap.has_type("cache"));
        assert!(!snap.has_type("jdbc"));
        assert_eq!(snap.id(), Some("c1"));
    }
}
