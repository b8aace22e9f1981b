//! # Scheduler facade over per-task timer actors.
//!
//! [`Scheduler`] owns a map of task id to running [`TimerActor`] and keeps
//! the map consistent while tasks start, replace each other, finish, and
//! shut down:
//!
//! ```text
//! Scheduler ──► tasks: { id → TaskEntry { cmd, cancel, join, generation } }
//!                               │
//!                               └──► TimerActor (one tokio task per id)
//! ```
//!
//! ## Rules
//! - Scheduling an id that is already present replaces the old task
//!   atomically; observers never see the id absent in between.
//! - Each entry carries a generation so a finished actor's self-cleanup
//!   cannot remove its replacement.
//! - `reschedule` swaps the timing only; the bound runnable is untouched.
//! - `shutdown` cancels everything and waits up to the configured grace,
//!   reporting tasks that failed to stop.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::{RuntimeError, ScheduleError};

use super::options::Schedule;
use super::runnable::RunnableRef;
use super::timer::{TimerActor, TimerCmd};

struct TaskEntry {
    generation: u64,
    schedule: Schedule,
    cmd: UnboundedSender<TimerCmd>,
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

struct SchedulerInner {
    tasks: Mutex<HashMap<Arc<str>, TaskEntry>>,
    next_generation: AtomicU64,
    runtime: Handle,
    grace: Duration,
}

/// Runs named tasks on their schedules.
///
/// Cheap to clone; all clones share the same task map. Must be created
/// inside a tokio runtime, but scheduling calls may come from any thread.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
}

impl Scheduler {
    /// Creates a scheduler bound to the current tokio runtime.
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime context.
    pub fn new(config: &Config) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                tasks: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(1),
                runtime: Handle::current(),
                grace: config.grace,
            }),
        }
    }

    /// Starts `runnable` under `id` on the given schedule.
    ///
    /// An existing task with the same id is canceled and replaced in the
    /// same step. An in-flight run of the old task completes but is never
    /// rescheduled.
    pub fn schedule(&self, id: &str, runnable: RunnableRef, schedule: Schedule) {
        let id: Arc<str> = Arc::from(id);
        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();
        let (tx, rx) = unbounded_channel();
        let actor = TimerActor::new(id.clone(), runnable, schedule, rx, cancel.clone());

        let weak = Arc::downgrade(&self.inner);
        let cleanup_id = id.clone();

        let mut tasks = self.inner.tasks.lock();
        if let Some(old) = tasks.remove(&id) {
            old.cancel.cancel();
        }
        let join = self.inner.runtime.spawn(async move {
            actor.run().await;
            Self::cleanup(&weak, &cleanup_id, generation);
        });
        tasks.insert(
            id,
            TaskEntry {
                generation,
                schedule,
                cmd: tx,
                cancel,
                join,
            },
        );
    }

    /// Stops and removes the task. Returns `false` for an unknown id.
    pub fn unschedule(&self, id: &str) -> bool {
        match self.inner.tasks.lock().remove(id) {
            Some(entry) => {
                entry.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Runs the task's body once, immediately. Returns `false` for an
    /// unknown id. Periodic tasks keep their cadence.
    pub fn trigger(&self, id: &str) -> bool {
        let tasks = self.inner.tasks.lock();
        match tasks.get(id) {
            Some(entry) => entry.cmd.send(TimerCmd::Trigger).is_ok(),
            None => false,
        }
    }

    /// Replaces the task's timing without changing the bound runnable.
    ///
    /// # Errors
    /// [`ScheduleError::UnknownTask`] when no task runs under `id`.
    pub fn reschedule(&self, id: &str, schedule: Schedule) -> Result<(), ScheduleError> {
        let mut tasks = self.inner.tasks.lock();
        let entry = tasks.get_mut(id).ok_or_else(|| ScheduleError::UnknownTask {
            id: id.to_string(),
        })?;
        entry.schedule = schedule;
        entry
            .cmd
            .send(TimerCmd::Reschedule(schedule))
            .map_err(|_| ScheduleError::UnknownTask { id: id.to_string() })
    }

    /// Whether a task currently runs under `id`.
    pub fn contains(&self, id: &str) -> bool {
        self.inner.tasks.lock().contains_key(id)
    }

    /// Sorted ids of all currently scheduled tasks, for diagnostics.
    pub fn task_ids(&self) -> Vec<Arc<str>> {
        let mut ids: Vec<Arc<str>> = self.inner.tasks.lock().keys().cloned().collect();
        ids.sort_unstable();
        ids
    }

    /// Number of currently scheduled tasks.
    pub fn len(&self) -> usize {
        self.inner.tasks.lock().len()
    }

    /// True when no tasks are scheduled.
    pub fn is_empty(&self) -> bool {
        self.inner.tasks.lock().is_empty()
    }

    /// Cancels every task and waits up to the configured grace for the
    /// actors to exit.
    ///
    /// # Errors
    /// [`RuntimeError::GraceExceeded`] listing the tasks still running when
    /// the grace expired. Stuck actors are detached, not aborted.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        let drained: Vec<(Arc<str>, TaskEntry)> = {
            let mut tasks = self.inner.tasks.lock();
            tasks.drain().collect()
        };
        for (_, entry) in &drained {
            entry.cancel.cancel();
        }

        let deadline = Instant::now() + self.inner.grace;
        let mut stuck = Vec::new();
        for (id, entry) in drained {
            if timeout_at(deadline, entry.join).await.is_err() {
                stuck.push(id.to_string());
            }
        }

        if stuck.is_empty() {
            Ok(())
        } else {
            Err(RuntimeError::GraceExceeded {
                grace: self.inner.grace,
                stuck,
            })
        }
    }

    fn cleanup(inner: &Weak<SchedulerInner>, id: &Arc<str>, generation: u64) {
        if let Some(inner) = inner.upgrade() {
            let mut tasks = inner.tasks.lock();
            if tasks
                .get(id)
                .is_some_and(|entry| entry.generation == generation)
            {
                tasks.remove(id);
            }
        }
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("tasks", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::error::TaskError;
    use crate::scheduler::runnable::RunnableFn;

    fn counting_runnable() -> (RunnableRef, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let probe = count.clone();
        let runnable = RunnableFn::arc(move |_ctx: CancellationToken| {
            let probe = probe.clone();
            async move {
                probe.fetch_add(1, Ordering::SeqCst);
                Ok::<_, TaskError>(())
            }
        });
        (runnable, count)
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_task_fires() {
        let scheduler = Scheduler::new(&Config::default());
        let (runnable, count) = counting_runnable();
        scheduler.schedule("tick", runnable, Schedule::Every(Duration::from_millis(100)));

        tokio::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert!(scheduler.contains("tick"));

        scheduler.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_unschedule_stops_firing() {
        let scheduler = Scheduler::new(&Config::default());
        let (runnable, count) = counting_runnable();
        scheduler.schedule("tick", runnable, Schedule::Every(Duration::from_millis(100)));

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(scheduler.unschedule("tick"));
        assert!(!scheduler.contains("tick"));
        assert!(!scheduler.unschedule("tick"));

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unschedule_during_in_flight_execution() {
        let scheduler = Scheduler::new(&Config::default());
        let started = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicUsize::new(0));
        let (s, f) = (started.clone(), finished.clone());
        let slow = RunnableFn::arc(move |_ctx: CancellationToken| {
            let (s, f) = (s.clone(), f.clone());
            async move {
                s.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(300)).await;
                f.fetch_add(1, Ordering::SeqCst);
                Ok::<_, TaskError>(())
            }
        });
        scheduler.schedule("slow", slow, Schedule::Every(Duration::from_millis(100)));

        // first fire at t=100ms, body runs until t=400ms
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(started.load(Ordering::SeqCst), 1);
        assert!(scheduler.unschedule("slow"));

        // the in-flight body completes, but nothing fires again
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(finished.load(Ordering::SeqCst), 1);
        assert_eq!(started.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_trigger_runs_body_once() {
        let scheduler = Scheduler::new(&Config::default());
        let (runnable, count) = counting_runnable();
        scheduler.schedule("manual", runnable, Schedule::Manual);

        assert!(scheduler.trigger("manual"));
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        assert!(!scheduler.trigger("missing"));
        scheduler.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_id_replaces_task() {
        let scheduler = Scheduler::new(&Config::default());
        let (first, first_count) = counting_runnable();
        let (second, second_count) = counting_runnable();

        scheduler.schedule("tick", first, Schedule::Every(Duration::from_millis(100)));
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(first_count.load(Ordering::SeqCst), 1);

        scheduler.schedule("tick", second, Schedule::Every(Duration::from_millis(100)));
        assert_eq!(scheduler.len(), 1);

        // replacement ticks land at +100ms steps; sleep past the fifth tick
        // rather than exactly onto it
        tokio::time::sleep(Duration::from_millis(510)).await;
        assert_eq!(first_count.load(Ordering::SeqCst), 1);
        assert_eq!(second_count.load(Ordering::SeqCst), 5);

        scheduler.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_changes_cadence() {
        let scheduler = Scheduler::new(&Config::default());
        let (runnable, count) = counting_runnable();
        scheduler.schedule("tick", runnable, Schedule::Every(Duration::from_secs(60)));

        scheduler
            .reschedule("tick", Schedule::Every(Duration::from_millis(100)))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);

        let err = scheduler
            .reschedule("missing", Schedule::Now)
            .unwrap_err();
        assert_eq!(err.as_label(), "schedule_unknown_task");

        scheduler.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_shot_removes_itself() {
        let scheduler = Scheduler::new(&Config::default());
        let (runnable, count) = counting_runnable();
        scheduler.schedule("once", runnable, Schedule::Now);

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!scheduler.contains("once"));
        assert!(scheduler.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_reports_stuck_tasks() {
        let config = Config {
            grace: Duration::from_millis(200),
            ..Config::default()
        };
        let scheduler = Scheduler::new(&config);

        let stubborn = RunnableFn::arc(|_ctx: CancellationToken| async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok::<_, TaskError>(())
        });
        scheduler.schedule("stuck", stubborn, Schedule::Now);
        tokio::time::sleep(Duration::from_millis(1)).await;

        let err = scheduler.shutdown().await.unwrap_err();
        match err {
            RuntimeError::GraceExceeded { grace, stuck } => {
                assert_eq!(grace, Duration::from_millis(200));
                assert_eq!(stuck, vec!["stuck".to_string()]);
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_task_ids_are_sorted() {
        let scheduler = Scheduler::new(&Config::default());
        let (a, _) = counting_runnable();
        let (b, _) = counting_runnable();
        let (c, _) = counting_runnable();
        scheduler.schedule("c", c, Schedule::Manual);
        scheduler.schedule("a", a, Schedule::Manual);
        scheduler.schedule("b", b, Schedule::Manual);

        let ids: Vec<String> = scheduler
            .task_ids()
            .into_iter()
            .map(|id| id.to_string())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);

        scheduler.shutdown().await.unwrap();
    }
}
