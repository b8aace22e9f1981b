//! # Capability properties: string-keyed, variant-valued.
//!
//! Every published capability carries a [`Properties`] map. Matching never
//! depends on insertion order, so the map is a `BTreeMap` (stable iteration
//! for logs and tests). Values are explicit tagged variants — there is no
//! reflection-based property discovery.
//!
//! ## Well-known keys
//! - [`KEY_ID`]: mandatory at publish time; also the scheduler's task id
//! - [`KEY_RANKING`]: integer; higher ranks win during dependency selection
//! - [`KEY_PERIOD`] / [`KEY_AT`]: scheduler timing convention
//!
//! # Example
//! ```
//! use capvisor::{Properties, PropertyValue};
//!
//! let mut props = Properties::new();
//! props.insert("id".into(), PropertyValue::from("cache-flush"));
//! props.insert("ranking".into(), PropertyValue::from(5));
//!
//! assert_eq!(props.get("id").and_then(|v| v.as_str()), Some("cache-flush"));
//! assert_eq!(props.get("ranking").and_then(|v| v.as_int()), Some(5));
//! ```

use std::collections::BTreeMap;

/// Mandatory identity property; doubles as the scheduler task id.
pub const KEY_ID: &str = "id";
/// Integer ranking; higher values are preferred during selection.
pub const KEY_RANKING: &str = "ranking";
/// Scheduler convention: periodic interval (`5s`, `500ms`, integer millis, `now`).
pub const KEY_PERIOD: &str = "period";
/// Scheduler convention: absolute one-shot fire time (unix epoch millis).
pub const KEY_AT: &str = "at";

/// Property map attached to a capability.
pub type Properties = BTreeMap<String, PropertyValue>;

/// A single property value.
///
/// The variants are deliberately small: everything a filter can compare
/// against is a string, an integer, or a boolean.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PropertyValue {
    /// UTF-8 string value.
    Str(String),
    /// 64-bit signed integer value.
    Int(i64),
    /// Boolean value.
    Bool(bool),
}

impl PropertyValue {
    /// Returns the string value, if this is a `Str`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer value, if this is an `Int`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            PropertyValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the boolean value, if this is a `Bool`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl std::fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PropertyValue::Str(s) => f.write_str(s),
            PropertyValue::Int(n) => write!(f, "{n}"),
            PropertyValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::Str(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::Str(s)
    }
}

impl From<i64> for PropertyValue {
    fn from(n: i64) -> Self {
        PropertyValue::Int(n)
    }
}

impl From<i32> for PropertyValue {
    fn from(n: i32) -> Self {
        PropertyValue::Int(i64::from(n))
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Bool(b)
    }
}

/// Extracts the `id` property, if present and a string.
pub(crate) fn id_of(props: &Properties) -> Option<&str> {
    props.get(KEY_ID).and_then(PropertyValue::as_str)
}

/// Extracts the `ranking` property, clamped to `i32`, or `default` when absent.
pub(crate) fn ranking_of(props: &Properties, default: i32) -> i32 {
    match props.get(KEY_RANKING) {
        Some(PropertyValue::Int(n)) => (*n).clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32,
        _ => default,
    }
}
