//! # Global runtime configuration.
//!
//! [`Config`] defines crate-wide defaults: observer bus capacity, the
//! scheduler's shutdown grace period, and the ranking assumed for
//! capabilities published without an explicit `ranking` property.
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use capvisor::Config;
//!
//! let mut cfg = Config::default();
//! cfg.grace = Duration::from_secs(10);
//! cfg.bus_capacity = 256;
//!
//! assert_eq!(cfg.default_ranking, 0);
//! ```

use std::time::Duration;

/// Global configuration for the registry and scheduler.
#[derive(Clone, Debug)]
pub struct Config {
    /// Capacity of the observer broadcast bus channel.
    pub bus_capacity: usize,
    /// Maximum time to wait for in-flight task bodies during scheduler shutdown.
    pub grace: Duration,
    /// Ranking assigned to capabilities published without a `ranking` property.
    pub default_ranking: i32,
}

impl Default for Config {
    /// Provides a default configuration:
    /// - `bus_capacity = 1024`
    /// - `grace = 30s`
    /// - `default_ranking = 0`
    fn default() -> Self {
        Self {
            bus_capacity: 1024,
            grace: Duration::from_secs(30),
            default_ranking: 0,
        }
    }
}
