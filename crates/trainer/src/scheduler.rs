//! Cancellable delayed tasks for scripted auto-play.
//!
//! Each task is keyed by the session epoch and ply it was armed for. The
//! job itself must still check that key against the session when it runs:
//! cancellation races with a timer that has already fired.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::lock;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimerKey {
    /// Bumped by the owning session on every reset.
    pub epoch: u64,
    pub ply: usize,
}

#[derive(Default)]
pub struct Scheduler {
    tasks: Mutex<HashMap<TimerKey, JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Run `job` after `delay`. A key that is already armed is left alone.
    ///
    /// Must be called from inside a Tokio runtime.
    pub fn schedule<F>(self: &Arc<Self>, key: TimerKey, delay: Duration, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut tasks = lock(&self.tasks);
        if tasks.get(&key).is_some_and(|h| !h.is_finished()) {
            return;
        }

        let scheduler = Arc::downgrade(self);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(scheduler) = scheduler.upgrade() {
                lock(&scheduler.tasks).remove(&key);
            }
            job();
        });
        debug!(?key, ?delay, "Timer armed");
        tasks.insert(key, handle);
    }

    /// Abort every pending task.
    pub fn cancel_all(&self) {
        let mut tasks = lock(&self.tasks);
        for (key, handle) in tasks.drain() {
            debug!(?key, "Timer cancelled");
            handle.abort();
        }
    }

    pub fn pending(&self) -> usize {
        lock(&self.tasks).values().filter(|h| !h.is_finished()).count()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn key(ply: usize) -> TimerKey {
        TimerKey { epoch: 1, ply }
    }

    #[tokio::test(start_paused = true)]
    async fn test_job_runs_after_delay() {
        let scheduler = Scheduler::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        scheduler.schedule(key(0), Duration::from_millis(500), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(499)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all_stops_jobs() {
        let scheduler = Scheduler::new();
        let hits = Arc::new(AtomicUsize::new(0));
        for ply in 0..3 {
            let counter = Arc::clone(&hits);
            scheduler.schedule(key(ply), Duration::from_millis(300), move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(scheduler.pending(), 3);
        scheduler.cancel_all();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_key_is_not_armed_twice() {
        let scheduler = Scheduler::new();
        let hits = Arc::new(AtomicUsize::new(0));
        for _ in 0..2 {
            let counter = Arc::clone(&hits);
            scheduler.schedule(key(4), Duration::from_millis(100), move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels() {
        let scheduler = Scheduler::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        scheduler.schedule(key(0), Duration::from_millis(100), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        drop(scheduler);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
