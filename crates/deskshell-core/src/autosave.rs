//! Debounced single-slot write scheduler.
//!
//! Each [`AutosaveScheduler::schedule`] call replaces the pending timer, so a
//! burst of mutations produces one persist once the burst has been quiet for
//! the configured delay. The persist action reads whatever state exists when
//! the timer fires.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::debug;

pub const DEFAULT_AUTOSAVE_DELAY: Duration = Duration::from_millis(500);

type PersistFn = Arc<dyn Fn() + Send + Sync>;

pub struct AutosaveScheduler {
    delay: Duration,
    persist: PersistFn,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl AutosaveScheduler {
    pub fn new<F>(delay: Duration, persist: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            delay,
            persist: Arc::new(persist),
            pending: Mutex::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Cancel any pending write and start a fresh timer.
    ///
    /// Outside a tokio runtime there is nothing to drive the timer, so the
    /// write happens immediately.
    pub fn schedule(&self) {
        let mut pending = self.slot();
        if let Some(previous) = pending.take() {
            previous.abort();
        }

        match Handle::try_current() {
            Ok(handle) => {
                let persist = Arc::clone(&self.persist);
                let delay = self.delay;
                *pending = Some(handle.spawn(async move {
                    tokio::time::sleep(delay).await;
                    persist();
                }));
            }
            Err(_) => {
                drop(pending);
                debug!("no async runtime available, persisting without debounce");
                (self.persist)();
            }
        }
    }

    /// Drop the pending write, if any.
    pub fn cancel(&self) {
        if let Some(pending) = self.slot().take() {
            pending.abort();
        }
    }

    /// Cancel the timer and persist right now.
    pub fn flush(&self) {
        self.cancel();
        (self.persist)();
    }

    pub fn is_pending(&self) -> bool {
        self.slot()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn slot(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for AutosaveScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutosaveScheduler")
            .field("delay", &self.delay)
            .field("pending", &self.is_pending())
            .finish()
    }
}
