//! Background task management for periodic maintenance
//!
//! Sweeps and compactions run as recurring tokio tasks owned by the
//! component they maintain. The task only holds a `Weak` reference to its
//! target, stops once the target is dropped, and is aborted when the owning
//! [`PeriodicTask`] handle is dropped.

use parking_lot::Mutex;
use std::sync::Weak;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Handle to a recurring background task; aborts the task on drop
#[derive(Debug, Default)]
pub struct PeriodicTask {
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl PeriodicTask {
    /// Start running `tick` against `target` every `interval`.
    ///
    /// Returns an inert handle when the interval is zero (useful for tests) or
    /// when called outside a tokio runtime.
    pub fn spawn<T, F>(name: &'static str, interval: Duration, target: Weak<T>, tick: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&T) + Send + 'static,
    {
        if interval == Duration::ZERO {
            return Self::default();
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                tracing::warn!(task = name, "no tokio runtime; background task not started");
                return Self::default();
            }
        };

        let handle = runtime.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(target) = target.upgrade() else {
                    tracing::debug!(task = name, "target dropped; stopping background task");
                    break;
                };
                tick(&target);
            }
        });

        Self {
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Whether a background task is attached and still running
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stop the background task
    pub fn cancel(&self) {
        if let Some(handle) = self.handle.lock().take() {
            handle.abort();
        }
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_ticks_at_interval() {
        let counter = Arc::new(AtomicUsize::new(0));
        let task = PeriodicTask::spawn(
            "test",
            Duration::from_secs(10),
            Arc::downgrade(&counter),
            |c: &AtomicUsize| {
                c.fetch_add(1, Ordering::SeqCst);
            },
        );
        assert!(task.is_running());

        tokio::time::sleep(Duration::from_secs(35)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_when_target_dropped() {
        let counter = Arc::new(AtomicUsize::new(0));
        let task = PeriodicTask::spawn(
            "test",
            Duration::from_secs(1),
            Arc::downgrade(&counter),
            |c: &AtomicUsize| {
                c.fetch_add(1, Ordering::SeqCst);
            },
        );
        drop(counter);

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(!task.is_running());
    }

    #[tokio::test]
    async fn test_zero_interval_is_inert() {
        let target = Arc::new(());
        let task = PeriodicTask::spawn("test", Duration::ZERO, Arc::downgrade(&target), |_| {});
        assert!(!task.is_running());
    }

    #[test]
    fn test_outside_runtime_is_inert() {
        let target = Arc::new(());
        let task = PeriodicTask::spawn(
            "test",
            Duration::from_secs(1),
            Arc::downgrade(&target),
            |_| {},
        );
        assert!(!task.is_running());
    }
}
