//! Single-slot cancellable dismissal timer

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

/// One pending deferred action per notification.
///
/// Restarting supersedes the pending action: its task is aborted, and the
/// generation counter guarantees that a task which already woke up cannot apply
/// its stale expiry. State changes run while the generation lock is held, so a
/// `restart` and an expiry never interleave.
pub(crate) struct DismissTimer {
    generation: Arc<Mutex<u64>>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl DismissTimer {
    pub(crate) fn new() -> Self {
        Self {
            generation: Arc::new(Mutex::new(0)),
            pending: Mutex::new(None),
        }
    }

    /// Run `apply` now and `expire` after `delay`, superseding any pending expiry.
    pub(crate) fn restart<A, E>(&self, delay: Duration, apply: A, expire: E)
    where
        A: FnOnce(),
        E: FnOnce() + Send + 'static,
    {
        let armed = {
            let mut generation = self.generation.lock().unwrap_or_else(|e| e.into_inner());
            *generation += 1;
            apply();
            *generation
        };

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("No Tokio runtime available, notification will not auto-dismiss");
            self.abort_pending();
            return;
        };

        let generation = self.generation.clone();
        let handle = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let current = generation.lock().unwrap_or_else(|e| e.into_inner());
            if *current == armed {
                expire();
            }
        });

        let previous = self
            .pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    /// Drop the pending expiry and run `apply` in its place.
    pub(crate) fn cancel<A>(&self, apply: A)
    where
        A: FnOnce(),
    {
        {
            let mut generation = self.generation.lock().unwrap_or_else(|e| e.into_inner());
            *generation += 1;
            apply();
        }
        self.abort_pending();
    }

    /// Whether an expiry is still scheduled
    pub(crate) fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn abort_pending(&self) {
        if let Some(handle) = self.pending.lock().unwrap_or_else(|e| e.into_inner()).take() {
            handle.abort();
        }
    }
}

impl Drop for DismissTimer {
    fn drop(&mut self) {
        self.abort_pending();
    }
}
