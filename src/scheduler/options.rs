//! # Schedule options and timing-property parsing.
//!
//! [`Schedule`] covers the timing shapes the scheduler supports:
//! periodic intervals, absolute one-shot dates, immediate one-shots, and
//! manual (trigger-only) tasks. Richer cron expressions are rejected at
//! parse time with [`ScheduleError::Parse`].
//!
//! ## Property convention
//! - `period`: integer milliseconds, or a string with a unit suffix
//!   (`"500ms"`, `"5s"`, `"2m"`, `"1h"`), bare digits (milliseconds),
//!   `"now"` (immediate one-shot), or `"manual"` (trigger-only).
//! - `at`: unix epoch milliseconds (integer or digit string); used when
//!   `period` is absent.
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use capvisor::{Properties, PropertyValue, Schedule};
//!
//! let mut props = Properties::new();
//! props.insert("id".into(), PropertyValue::from("flush"));
//! props.insert("period".into(), PropertyValue::from("5s"));
//!
//! let schedule = Schedule::from_properties(&props).unwrap();
//! assert_eq!(schedule, Schedule::Every(Duration::from_secs(5)));
//! ```

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::ScheduleError;
use crate::registry::{Properties, PropertyValue, KEY_AT, KEY_PERIOD};

/// When a scheduled task fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Fires repeatedly at a fixed interval, first fire one interval from now.
    Every(Duration),
    /// Fires once at an absolute time; a time in the past fires immediately.
    At(SystemTime),
    /// Fires once, immediately.
    Now,
    /// Never fires on its own; only [`trigger`](crate::Scheduler::trigger)
    /// runs it.
    Manual,
}

impl Schedule {
    /// Derives a schedule from capability properties (`period`, then `at`).
    ///
    /// # Errors
    /// [`ScheduleError::Parse`] when both keys are absent or a value is
    /// malformed (including cron-style expressions, which are unsupported).
    pub fn from_properties(props: &Properties) -> Result<Schedule, ScheduleError> {
        if let Some(value) = props.get(KEY_PERIOD) {
            return Self::parse_period(value);
        }
        if let Some(value) = props.get(KEY_AT) {
            return Self::parse_at(value);
        }
        Err(ScheduleError::Parse {
            value: String::new(),
            reason: "neither `period` nor `at` property present".into(),
        })
    }

    fn parse_period(value: &PropertyValue) -> Result<Schedule, ScheduleError> {
        match value {
            PropertyValue::Int(ms) if *ms > 0 => Ok(Schedule::Every(millis(*ms as u64))),
            PropertyValue::Int(ms) => Err(parse_error(
                &ms.to_string(),
                "period must be a positive number of milliseconds",
            )),
            PropertyValue::Str(s) => match s.trim() {
                "now" => Ok(Schedule::Now),
                "manual" => Ok(Schedule::Manual),
                text => parse_duration(text).map(Schedule::Every),
            },
            PropertyValue::Bool(_) => Err(parse_error("bool", "period cannot be a boolean")),
        }
    }

    fn parse_at(value: &PropertyValue) -> Result<Schedule, ScheduleError> {
        let epoch_ms = match value {
            PropertyValue::Int(ms) if *ms >= 0 => *ms as u64,
            PropertyValue::Str(s) => s
                .trim()
                .parse::<u64>()
                .map_err(|_| parse_error(s, "`at` must be unix epoch milliseconds"))?,
            other => {
                return Err(parse_error(
                    &other.to_string(),
                    "`at` must be unix epoch milliseconds",
                ))
            }
        };
        Ok(Schedule::At(UNIX_EPOCH + millis(epoch_ms)))
    }
}

fn millis(ms: u64) -> Duration {
    Duration::from_millis(ms)
}

fn parse_error(value: &str, reason: &str) -> ScheduleError {
    ScheduleError::Parse {
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Parses `"500ms"`, `"5s"`, `"2m"`, `"1h"`, or bare digits (milliseconds).
fn parse_duration(text: &str) -> Result<Duration, ScheduleError> {
    let (digits, multiplier) = if let Some(n) = text.strip_suffix("ms") {
        (n, 1)
    } else if let Some(n) = text.strip_suffix('s') {
        (n, 1_000)
    } else if let Some(n) = text.strip_suffix('m') {
        (n, 60_000)
    } else if let Some(n) = text.strip_suffix('h') {
        (n, 3_600_000)
    } else {
        (text, 1)
    };

    let n: u64 = digits
        .trim()
        .parse()
        .map_err(|_| parse_error(text, "expected digits with an optional ms/s/m/h suffix"))?;
    if n == 0 {
        return Err(parse_error(text, "period must be positive"));
    }
    n.checked_mul(multiplier)
        .map(millis)
        .ok_or_else(|| parse_error(text, "period exceeds the representable range"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn period(value: PropertyValue) -> Result<Schedule, ScheduleError> {
        let mut props = Properties::new();
        props.insert(KEY_PERIOD.into(), value);
        Schedule::from_properties(&props)
    }

    #[test]
    fn test_period_variants() {
        assert_eq!(
            period(PropertyValue::Int(1000)).unwrap(),
            Schedule::Every(Duration::from_secs(1))
        );
        assert_eq!(
            period(PropertyValue::from("500ms")).unwrap(),
            Schedule::Every(Duration::from_millis(500))
        );
        assert_eq!(
            period(PropertyValue::from("5s")).unwrap(),
            Schedule::Every(Duration::from_secs(5))
        );
        assert_eq!(
            period(PropertyValue::from("2m")).unwrap(),
            Schedule::Every(Duration::from_secs(120))
        );
        assert_eq!(
            period(PropertyValue::from("1h")).unwrap(),
            Schedule::Every(Duration::from_secs(3600))
        );
        assert_eq!(
            period(PropertyValue::from("250")).unwrap(),
            Schedule::Every(Duration::from_millis(250))
        );
        assert_eq!(period(PropertyValue::from("now")).unwrap(), Schedule::Now);
        assert_eq!(
            period(PropertyValue::from("manual")).unwrap(),
            Schedule::Manual
        );
    }

    #[test]
    fn test_bad_periods_are_rejected() {
        for bad in [
            PropertyValue::Int(0),
            PropertyValue::Int(-5),
            PropertyValue::from("0s"),
            PropertyValue::from("fast"),
            PropertyValue::from("0 * * * *"), // cron is unsupported
            PropertyValue::from("6000000000000000h"), // would overflow as millis
            PropertyValue::Bool(true),
        ] {
            let err = period(bad).unwrap_err();
            assert_eq!(err.as_label(), "schedule_parse");
        }
    }

    #[test]
    fn test_at_property() {
        let mut props = Properties::new();
        props.insert(KEY_AT.into(), PropertyValue::Int(1_000));
        assert_eq!(
            Schedule::from_properties(&props).unwrap(),
            Schedule::At(UNIX_EPOCH + Duration::from_secs(1))
        );

        // period wins when both are present
        props.insert(KEY_PERIOD.into(), PropertyValue::from("1s"));
        assert_eq!(
            Schedule::from_properties(&props).unwrap(),
            Schedule::Every(Duration::from_secs(1))
        );
    }

    #[test]
    fn test_missing_timing_properties() {
        let err = Schedule::from_properties(&Properties::new()).unwrap_err();
        assert_eq!(err.as_label(), "schedule_parse");
    }
}
