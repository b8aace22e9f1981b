//! # Dependency declarations.
//!
//! A [`DependencySpec`] names one capability requirement of a component:
//! which capability type it needs, an optional property [`Filter`], whether
//! the component can live without it ([`Cardinality`]), and whether it binds
//! one or all matches ([`Multiplicity`]).
//!
//! ## Example
//! ```
//! use capvisor::{Cardinality, DependencySpec, Multiplicity};
//!
//! let storage = DependencySpec::required("storage", "db")
//!     .with_filter_str("(kind=jdbc)")
//!     .unwrap();
//! assert_eq!(storage.cardinality(), Cardinality::Required);
//!
//! let caches = DependencySpec::optional("caches", "cache").aggregate();
//! assert_eq!(caches.multiplicity(), Multiplicity::Aggregate);
//! ```

use crate::error::RegistryError;
use crate::registry::Filter;

/// Whether the component can become valid without this dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// The component stays unsatisfied until at least one match exists.
    Required,
    /// The dependency binds when available but never gates validity.
    Optional,
}

/// How many matches the dependency binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Multiplicity {
    /// Exactly one match is selected: highest ranking, ties broken by lowest
    /// registration id. A better-ranked arrival triggers a hot swap.
    Single,
    /// Every matching capability is bound; adds and removes are delivered
    /// incrementally.
    Aggregate,
}

/// One declared dependency of a component.
#[derive(Debug, Clone)]
pub struct DependencySpec {
    name: String,
    capability_type: String,
    filter: Option<Filter>,
    cardinality: Cardinality,
    multiplicity: Multiplicity,
}

impl DependencySpec {
    /// Declares a required, single-match dependency.
    pub fn required(name: impl Into<String>, capability_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            capability_type: capability_type.into(),
            filter: None,
            cardinality: Cardinality::Required,
            multiplicity: Multiplicity::Single,
        }
    }

    /// Declares an optional, single-match dependency.
    pub fn optional(name: impl Into<String>, capability_type: impl Into<String>) -> Self {
        Self {
            cardinality: Cardinality::Optional,
            ..Self::required(name, capability_type)
        }
    }

    /// Switches the dependency to aggregate multiplicity.
    pub fn aggregate(mut self) -> Self {
        self.multiplicity = Multiplicity::Aggregate;
        self
    }

    /// Attaches a pre-parsed property filter.
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Parses and attaches a property filter.
    ///
    /// # Errors
    /// [`RegistryError::DependencyUnsatisfiable`] when the text is malformed.
    pub fn with_filter_str(self, filter: &str) -> Result<Self, RegistryError> {
        Ok(self.with_filter(Filter::parse(filter)?))
    }

    /// Returns the declaration name (used in bind/unbind callbacks and logs).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the capability type this dependency tracks.
    pub fn capability_type(&self) -> &str {
        &self.capability_type
    }

    /// Returns the property filter, if any.
    pub fn filter(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }

    /// Returns the cardinality.
    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    /// Returns the multiplicity.
    pub fn multiplicity(&self) -> Multiplicity {
        self.multiplicity
    }
}
