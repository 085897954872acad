//! Trailing-edge debouncer
//!
//! Wraps one async operation and a quiet window. Every `schedule` replaces
//! the pending argument and restarts the timer; the operation runs once, with
//! the most recent argument, after the window passes without another call.
//!
//! `cancel` drops the pending call. `flush` takes it out of the timer and
//! hands back the operation's future so the caller decides whether to await
//! it or run it in the background.
//!
//! Once the timer fires the operation runs as its own task, so cancelling or
//! rescheduling afterwards never aborts an operation that already started.
//!
//! Must be used from within a tokio runtime.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tokio::task::JoinHandle;
use tracing::debug;

type Operation<T> = Arc<dyn Fn(T) -> BoxFuture<'static, ()> + Send + Sync>;

/// Pending argument plus a generation counter so stale timers can tell
/// they were superseded
struct Slot<T> {
    generation: u64,
    pending: Option<T>,
}

pub struct Debouncer<T> {
    window: Duration,
    operation: Operation<T>,
    slot: Arc<Mutex<Slot<T>>>,
    timer: Option<JoinHandle<()>>,
}

fn lock<T>(slot: &Mutex<Slot<T>>) -> MutexGuard<'_, Slot<T>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<T: Send + 'static> Debouncer<T> {
    /// Create a debouncer around `operation` with the given quiet window
    pub fn new<F, Fut>(window: Duration, operation: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let operation: Operation<T> = Arc::new(move |arg| operation(arg).boxed());
        Self {
            window,
            operation,
            slot: Arc::new(Mutex::new(Slot {
                generation: 0,
                pending: None,
            })),
            timer: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Replace the pending argument and restart the quiet window
    pub fn schedule(&mut self, arg: T) {
        self.abort_timer();

        let generation = {
            let mut slot = lock(&self.slot);
            slot.generation = slot.generation.wrapping_add(1);
            slot.pending = Some(arg);
            slot.generation
        };

        let slot = Arc::clone(&self.slot);
        let operation = Arc::clone(&self.operation);
        let window = self.window;

        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(window).await;

            let ready = {
                let mut slot = lock(&slot);
                if slot.generation != generation {
                    return;
                }
                slot.pending.take()
            };

            if let Some(arg) = ready {
                debug!("Debounce window elapsed, running operation");
                tokio::spawn(operation(arg));
            }
        }));
    }

    /// Drop the pending call, if any. Returns whether something was pending.
    pub fn cancel(&mut self) -> bool {
        self.take_pending().is_some()
    }

    /// Take the pending call out of the timer and return its future
    ///
    /// Returns `None` when nothing is pending (including when the timer
    /// already fired).
    pub fn flush(&mut self) -> Option<BoxFuture<'static, ()>> {
        self.take_pending().map(|arg| (self.operation)(arg))
    }

    /// Whether a call is waiting for its quiet window
    pub fn is_pending(&self) -> bool {
        lock(&self.slot).pending.is_some()
    }

    fn take_pending(&mut self) -> Option<T> {
        self.abort_timer();
        let mut slot = lock(&self.slot);
        slot.generation = slot.generation.wrapping_add(1);
        slot.pending.take()
    }

    fn abort_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const WINDOW: Duration = Duration::from_millis(500);

    fn recording() -> (Debouncer<String>, Arc<Mutex<Vec<String>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&calls);
        let debouncer = Debouncer::new(WINDOW, move |arg: String| {
            let sink = Arc::clone(&sink);
            async move {
                sink.lock().unwrap().push(arg);
            }
        });
        (debouncer, calls)
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_after_quiet_window() {
        let (mut debouncer, calls) = recording();

        debouncer.schedule("one".to_string());
        assert!(debouncer.is_pending());

        tokio::time::sleep(WINDOW / 2).await;
        assert!(calls.lock().unwrap().is_empty());

        tokio::time::sleep(WINDOW).await;
        assert_eq!(*calls.lock().unwrap(), vec!["one"]);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_calls_coalesce_to_last() {
        let (mut debouncer, calls) = recording();

        for i in 0..5 {
            debouncer.schedule(format!("edit {}", i));
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(calls.lock().unwrap().is_empty());

        tokio::time::sleep(WINDOW * 2).await;
        assert_eq!(*calls.lock().unwrap(), vec!["edit 4"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_resets_on_each_schedule() {
        let (mut debouncer, calls) = recording();

        debouncer.schedule("a".to_string());
        tokio::time::sleep(Duration::from_millis(400)).await;
        debouncer.schedule("b".to_string());
        tokio::time::sleep(Duration::from_millis(400)).await;

        // 800ms since the first call, but only 400ms since the last
        assert!(calls.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(*calls.lock().unwrap(), vec!["b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_drops_pending() {
        let (mut debouncer, calls) = recording();

        debouncer.schedule("never".to_string());
        assert!(debouncer.cancel());
        assert!(!debouncer.cancel());

        tokio::time::sleep(WINDOW * 3).await;
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_runs_immediately_once() {
        let (mut debouncer, calls) = recording();

        debouncer.schedule("now".to_string());
        let flushed = debouncer.flush().expect("pending call");
        flushed.await;
        assert_eq!(*calls.lock().unwrap(), vec!["now"]);

        // The timer must not run it a second time
        tokio::time::sleep(WINDOW * 3).await;
        assert_eq!(calls.lock().unwrap().len(), 1);
        assert!(debouncer.flush().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_after_fire_is_noop() {
        let (mut debouncer, calls) = recording();

        debouncer.schedule("fired".to_string());
        tokio::time::sleep(WINDOW * 2).await;
        assert!(debouncer.flush().is_none());
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_does_not_abort_running_operation() {
        let started = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicUsize::new(0));
        let (s, f) = (Arc::clone(&started), Arc::clone(&finished));

        let mut debouncer = Debouncer::new(WINDOW, move |_: ()| {
            let (s, f) = (Arc::clone(&s), Arc::clone(&f));
            async move {
                s.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(2)).await;
                f.fetch_add(1, Ordering::SeqCst);
            }
        });

        debouncer.schedule(());
        tokio::time::sleep(WINDOW + Duration::from_millis(10)).await;
        assert_eq!(started.load(Ordering::SeqCst), 1);

        // New call while the first operation is still sleeping
        debouncer.schedule(());
        debouncer.cancel();

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(finished.load(Ordering::SeqCst), 1);
        assert_eq!(started.load(Ordering::SeqCst), 1);
    }
}
