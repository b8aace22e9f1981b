//! # Per-task timer actor.
//!
//! Each scheduled task gets one [`TimerActor`] running on its own tokio
//! task. The actor owns the timing state, a command channel, and a
//! cancellation token:
//!
//! ```text
//!            ┌──────────────────┐
//! commands ──► TimerActor       ├── fire() ──► Runnable::run(ctx)
//!            │  ├ tick (timing) │
//!            │  └ cancel token  │
//!            └──────────────────┘
//! ```
//!
//! ## Rules
//! - `Every` uses a fixed-cadence interval; an external trigger does not
//!   shift the next tick.
//! - `At` sleeps until the deadline, fires once, then exits.
//! - `Now` fires once immediately, then exits.
//! - `Manual` never ticks; only commands fire it.
//! - A fire observed after cancellation is dropped; a body already in
//!   flight runs to completion but is never rescheduled.
//! - A panicking body is caught and logged; the cadence continues.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{interval_at, sleep_until, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::options::Schedule;
use super::runnable::RunnableRef;

/// Commands accepted by a running timer actor.
#[derive(Debug)]
pub(crate) enum TimerCmd {
    /// Run the body once, outside the regular cadence.
    Trigger,
    /// Replace the timing without touching the bound runnable.
    Reschedule(Schedule),
}

pub(crate) struct TimerActor {
    id: Arc<str>,
    runnable: RunnableRef,
    schedule: Schedule,
    rx: UnboundedReceiver<TimerCmd>,
    cancel: CancellationToken,
}

impl TimerActor {
    pub(crate) fn new(
        id: Arc<str>,
        runnable: RunnableRef,
        schedule: Schedule,
        rx: UnboundedReceiver<TimerCmd>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            id,
            runnable,
            schedule,
            rx,
            cancel,
        }
    }

    /// Drives the task until its schedule completes or it is canceled.
    pub(crate) async fn run(mut self) {
        loop {
            match self.schedule {
                Schedule::Now => {
                    self.fire().await;
                    return;
                }
                Schedule::Every(period) => {
                    let mut tick = interval_at(Instant::now() + period, period);
                    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    loop {
                        tokio::select! {
                            _ = self.cancel.cancelled() => return,
                            _ = tick.tick() => self.fire().await,
                            cmd = self.rx.recv() => match cmd {
                                Some(TimerCmd::Trigger) => self.fire().await,
                                Some(TimerCmd::Reschedule(next)) => {
                                    self.schedule = next;
                                    break;
                                }
                                None => return,
                            },
                        }
                    }
                }
                Schedule::At(when) => {
                    let deadline = Instant::now()
                        + when
                            .duration_since(std::time::SystemTime::now())
                            .unwrap_or_default();
                    tokio::select! {
                        _ = self.cancel.cancelled() => return,
                        _ = sleep_until(deadline) => {
                            self.fire().await;
                            return;
                        }
                        cmd = self.rx.recv() => match cmd {
                            Some(TimerCmd::Trigger) => self.fire().await,
                            Some(TimerCmd::Reschedule(next)) => self.schedule = next,
                            None => return,
                        },
                    }
                }
                Schedule::Manual => {
                    tokio::select! {
                        _ = self.cancel.cancelled() => return,
                        cmd = self.rx.recv() => match cmd {
                            Some(TimerCmd::Trigger) => self.fire().await,
                            Some(TimerCmd::Reschedule(next)) => self.schedule = next,
                            None => return,
                        },
                    }
                }
            }
        }
    }

    async fn fire(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        let fut = self.runnable.run(self.cancel.child_token());
        match AssertUnwindSafe(fut).catch_unwind().await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::warn!(task = %self.id, error = %err, "scheduled task failed");
            }
            Err(_) => {
                tracing::warn!(task = %self.id, "scheduled task panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use tokio::sync::mpsc::unbounded_channel;

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
    async fn test_every_fires_on_cadence() {
        let (runnable, count) = counting_runnable();
        let (_tx, rx) = unbounded_channel();
        let cancel = CancellationToken::new();
        let actor = TimerActor::new(
            "tick".into(),
            runnable,
            Schedule::Every(Duration::from_millis(100)),
            rx,
            cancel.clone(),
        );
        let handle = tokio::spawn(actor.run());

        tokio::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_trigger_does_not_shift_cadence() {
        let (runnable, count) = counting_runnable();
        let (tx, rx) = unbounded_channel();
        let cancel = CancellationToken::new();
        let actor = TimerActor::new(
            "tick".into(),
            runnable,
            Schedule::Every(Duration::from_millis(100)),
            rx,
            cancel.clone(),
        );
        let handle = tokio::spawn(actor.run());

        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(TimerCmd::Trigger).unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        // the regular tick still lands at t=100ms
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_only_fires_on_trigger() {
        let (runnable, count) = counting_runnable();
        let (tx, rx) = unbounded_channel();
        let cancel = CancellationToken::new();
        let actor = TimerActor::new("m".into(), runnable, Schedule::Manual, rx, cancel.clone());
        let handle = tokio::spawn(actor.run());

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tx.send(TimerCmd::Trigger).unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_now_fires_once_and_exits() {
        let (runnable, count) = counting_runnable();
        let (_tx, rx) = unbounded_channel();
        let actor = TimerActor::new(
            "once".into(),
            runnable,
            Schedule::Now,
            rx,
            CancellationToken::new(),
        );
        actor.run().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_canceled_actor_never_fires() {
        let (runnable, count) = counting_runnable();
        let (_tx, rx) = unbounded_channel();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let actor = TimerActor::new("dead".into(), runnable, Schedule::Now, rx, cancel);
        actor.run().await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_body_keeps_cadence() {
        let (tx, rx) = unbounded_channel();
        let _ = tx;
        let count = Arc::new(AtomicUsize::new(0));
        let probe = count.clone();
        let runnable = RunnableFn::arc(move |_ctx: CancellationToken| {
            let probe = probe.clone();
            async move {
                if probe.fetch_add(1, Ordering::SeqCst) == 0 {
                    panic!("boom");
                }
                Ok::<_, TaskError>(())
            }
        });
        let cancel = CancellationToken::new();
        let actor = TimerActor::new(
            "flaky".into(),
            runnable,
            Schedule::Every(Duration::from_millis(100)),
            rx,
            cancel.clone(),
        );
        let handle = tokio::spawn(actor.run());

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);

        cancel.cancel();
        handle.await.unwrap();
    }
}
