//! Error types used by the registry, tracker, and scheduler.
//!
//! This module defines the error enums of the crate:
//!
//! - [`RegistryError`] — rejected registry operations (bad publish arguments,
//!   malformed dependency filters).
//! - [`ScheduleError`] — rejected scheduler operations (unparseable timing
//!   properties, unknown task ids).
//! - [`TaskError`] — errors raised by individual runnable executions.
//! - [`RuntimeError`] — errors raised by the runtime itself (shutdown overrun).
//!
//! All types provide `as_label()` helpers returning short stable snake_case
//! labels for logs/metrics.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by registry operations.
///
/// A rejected `publish`/`update_properties` call, or a dependency declaration
/// whose filter text cannot be parsed. Listener-side failures are never
/// surfaced through this type: they are caught during fan-out and logged.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Publish or property update was rejected due to invalid arguments.
    #[error("invalid registration: {reason}")]
    InvalidRegistration {
        /// What was wrong with the request.
        reason: String,
    },

    /// A dependency filter expression could not be parsed.
    #[error("unsatisfiable dependency filter {filter:?}: {reason}")]
    DependencyUnsatisfiable {
        /// The offending filter text.
        filter: String,
        /// Parse failure details.
        reason: String,
    },
}

impl RegistryError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RegistryError::InvalidRegistration { .. } => "invalid_registration",
            RegistryError::DependencyUnsatisfiable { .. } => "dependency_unsatisfiable",
        }
    }
}

/// # Errors produced by scheduler operations.
///
/// Parse failures drop the offending task (logged, not fatal); unknown ids
/// are reported to the caller of [`reschedule`](crate::Scheduler::reschedule).
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ScheduleError {
    /// A `period`/`at` property could not be parsed into a schedule.
    #[error("cannot parse schedule from {value:?}: {reason}")]
    Parse {
        /// The raw property value.
        value: String,
        /// Parse failure details.
        reason: String,
    },

    /// No task with the given id is currently scheduled.
    #[error("no scheduled task with id {id:?}")]
    UnknownTask {
        /// The requested task id.
        id: String,
    },
}

impl ScheduleError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ScheduleError::Parse { .. } => "schedule_parse",
            ScheduleError::UnknownTask { .. } => "schedule_unknown_task",
        }
    }
}

/// # Errors produced by runnable execution.
///
/// These represent failures of individual scheduled bodies. Some errors are
/// retryable in principle (`Fail`, `Timeout`), others are fatal; the scheduler
/// itself only logs them — the next periodic fire happens regardless.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum TaskError {
    /// Execution exceeded its timeout duration.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// Non-recoverable fatal error.
    #[error("fatal error: {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },

    /// Execution failed but may succeed on a later fire.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Execution was cancelled due to shutdown or unschedule.
    #[error("context cancelled")]
    Canceled,
}

impl TaskError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use capvisor::TaskError;
    ///
    /// let err = TaskError::Fail { error: "boom".into() };
    /// assert_eq!(err.as_label(), "task_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Timeout { .. } => "task_timeout",
            TaskError::Fatal { .. } => "task_fatal",
            TaskError::Fail { .. } => "task_failed",
            TaskError::Canceled => "task_canceled",
        }
    }
}

/// # Errors produced by the runtime itself.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Shutdown grace period was exceeded; some task bodies were still running.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Ids of tasks that did not finish in time.
        stuck: Vec<String>,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_are_stable() {
        let e = RegistryError::InvalidRegistration {
            reason: "empty capability types".into(),
        };
        assert_eq!(e.as_label(), "invalid_registration");

        let e = ScheduleError::UnknownTask { id: "t1".into() };
        assert_eq!(e.as_label(), "schedule_unknown_task");

        let e = RuntimeError::GraceExceeded {
            grace: Duration::from_secs(5),
            stuck: vec!["t1".into()],
        };
        assert_eq!(e.as_label(), "runtime_grace_exceeded");
    }

    #[test]
    fn test_display_includes_details() {
        let e = RegistryError::DependencyUnsatisfiable {
            filter: "(k=".into(),
            reason: "unbalanced parenthesis".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("(k="));
        assert!(msg.contains("unbalanced"));
    }
}
