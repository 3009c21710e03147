use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures_util::FutureExt;
use tokio::sync::Notify;
use tracing::{debug, error};

#[derive(Debug, Default)]
struct Shared {
    in_flight: AtomicUsize,
    /// Finished since the last [`BackgroundTasks::wait_all`] returned.
    finished: AtomicUsize,
    idle: Notify,
}

/// Decrements the in-flight count when its task ends, whether it completed, panicked or was
/// aborted by runtime shutdown.
struct InFlight(Arc<Shared>);

impl InFlight {
    fn enter(shared: &Arc<Shared>) -> Self {
        shared.in_flight.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(shared))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.finished.fetch_add(1, Ordering::SeqCst);
        if self.0.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

/// Fire-and-forget tasks that can still be joined on shutdown or in tests.
///
/// Tasks are detached on spawn and only counted here, so dropping a waiter never cancels them
/// and any number of callers can wait at once.
#[derive(Default)]
pub struct BackgroundTasks {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for BackgroundTasks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundTasks")
            .field("in_flight", &self.len())
            .finish()
    }
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns onto the current runtime. Must be called from within a tokio runtime.
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let guard = InFlight::enter(&self.shared);
        tokio::spawn(async move {
            let _guard = guard;
            if let Err(panic) = AssertUnwindSafe(task).catch_unwind().await {
                error!(reason = panic_message(&panic), "Background task panicked");
            }
        });
    }

    /// Tasks spawned and not yet finished.
    pub fn len(&self) -> usize {
        self.shared.in_flight.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Waits until no tracked task is running, including ones spawned while waiting. Panicked
    /// tasks are logged by the task itself. Returns how many tasks finished since the previous
    /// wait returned.
    pub async fn wait_all(&self) -> usize {
        loop {
            let idle = self.shared.idle.notified();
            tokio::pin!(idle);
            // Register before checking so a wakeup between the check and the await is kept.
            idle.as_mut().enable();
            if self.shared.in_flight.load(Ordering::SeqCst) == 0 {
                break;
            }
            idle.await;
        }

        let joined = self.shared.finished.swap(0, Ordering::SeqCst);
        debug!(joined, "Background tasks drained");
        joined
    }
}

fn panic_message(panic: &Box<dyn Any + Send>) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
