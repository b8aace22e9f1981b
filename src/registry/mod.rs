//! Capability registry: storage, snapshots, properties, and filters.
//!
//! The registry is the single owner of capability storage. Everything else in
//! the crate — trackers, the scheduler, observers — works against the types
//! exported here.
//!
//! Internal modules:
//! - [`properties`]: string-keyed, variant-valued property maps;
//! - [`capability`]: point-in-time capability snapshots;
//! - [`filter`]: LDAP-style property predicates for `find`/listeners;
//! - [`store`]: the ranked store, registration handles, listener fan-out.

mod capability;
mod filter;
mod properties;
mod store;

pub use capability::{CapabilitySnapshot, ServiceObject};
pub use filter::Filter;
pub use properties::{Properties, PropertyValue, KEY_AT, KEY_ID, KEY_PERIOD, KEY_RANKING};
pub use store::{ListenerHandle, RegistrationHandle, ServiceRegistry};
