//! Periodic housekeeping tasks owned by governance components
//!
//! A task holds only a [`Weak`] reference to its owner, so it never keeps the
//! component alive, and it stops as soon as the owner is dropped or its
//! [`CancellationToken`] is cancelled. Tokio does not wait for these tasks at
//! runtime shutdown.

use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Handle to an optional running cleanup task
#[derive(Debug, Default)]
pub struct CleanupHandle {
    token: Mutex<Option<CancellationToken>>,
}

impl CleanupHandle {
    /// Create an idle handle
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `tick` every `period` against `owner`, replacing any previous task
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<T, F>(&self, owner: &Arc<T>, period: Duration, name: &'static str, tick: F)
    where
        T: Send + Sync + 'static,
        F: Fn(&T) + Send + 'static,
    {
        let weak: Weak<T> = Arc::downgrade(owner);
        let token = CancellationToken::new();
        let child = token.clone();

        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // the first tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = child.cancelled() => break,
                    _ = ticker.tick() => {
                        let Some(owner) = weak.upgrade() else { break };
                        tick(&owner);
                    }
                }
            }
            tracing::debug!("{name} cleanup task stopped");
        });

        if let Some(previous) = self.replace(Some(token)) {
            previous.cancel();
        }
    }

    /// Cancel the running task, if any
    pub fn stop(&self) {
        if let Some(token) = self.replace(None) {
            token.cancel();
        }
    }

    /// True while a task is registered
    pub fn is_running(&self) -> bool {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|t| !t.is_cancelled())
    }

    fn replace(&self, next: Option<CancellationToken>) -> Option<CancellationToken> {
        let mut guard = self.token.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, next)
    }
}

impl Drop for CleanupHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counter {
        ticks: AtomicUsize,
    }

    #[tokio::test]
    async fn test_task_ticks_until_stopped() {
        let counter = Arc::new(Counter::default());
        let handle = CleanupHandle::new();

        handle.start(&counter, Duration::from_millis(10), "test", |c| {
            c.ticks.fetch_add(1, Ordering::SeqCst);
        });
        assert!(handle.is_running());

        tokio::time::sleep(Duration::from_millis(60)).await;
        handle.stop();
        assert!(!handle.is_running());

        let seen = counter.ticks.load(Ordering::SeqCst);
        assert!(seen >= 1, "expected at least one tick, saw {seen}");

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(counter.ticks.load(Ordering::SeqCst), seen);
    }

    #[tokio::test]
    async fn test_task_exits_when_owner_dropped() {
        let counter = Arc::new(Counter::default());
        let handle = CleanupHandle::new();
        handle.start(&counter, Duration::from_millis(5), "test", |c| {
            c.ticks.fetch_add(1, Ordering::SeqCst);
        });

        let weak = Arc::downgrade(&counter);
        drop(counter);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(weak.upgrade().is_none());
    }
}
