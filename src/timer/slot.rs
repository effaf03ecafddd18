use std::{
    future::Future,
    sync::{Arc, Mutex},
    time::Duration,
};

use anyhow::{Context, Result};
use log::trace;
use tokio::{runtime::Handle, task::JoinHandle, time};

use crate::utils::sync::lock;

/// Handle to the runtime that executes delayed callbacks.
#[derive(Clone)]
pub struct Scheduler {
    handle: Handle,
}

impl Scheduler {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Scheduler bound to the tokio runtime of the calling thread.
    pub fn current() -> Result<Self> {
        let handle = Handle::try_current().context("navhud needs a tokio runtime for its timers")?;
        Ok(Self::new(handle))
    }

    /// Run a long-lived background task on the scheduler's runtime.
    pub fn spawn<F>(&self, future: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handle.spawn(future)
    }

    pub fn slot(&self, name: &'static str) -> TimerSlot {
        TimerSlot {
            name,
            handle: self.handle.clone(),
            pending: Arc::new(Mutex::new(PendingTask::default())),
        }
    }
}

#[derive(Default)]
struct PendingTask {
    generation: u64,
    task: Option<JoinHandle<()>>,
}

/// One pending delayed callback per purpose.
///
/// Arming replaces whatever was pending; a replaced callback never runs, even
/// if its sleep already completed.
#[derive(Clone)]
pub struct TimerSlot {
    name: &'static str,
    handle: Handle,
    pending: Arc<Mutex<PendingTask>>,
}

impl TimerSlot {
    pub fn arm<F>(&self, delay: Duration, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut pending = lock(&self.pending);
        if let Some(task) = pending.task.take() {
            task.abort();
        }
        pending.generation = pending.generation.wrapping_add(1);
        let generation = pending.generation;
        let slot = Arc::clone(&self.pending);
        let name = self.name;

        trace!("timer '{}' armed for {}ms", name, delay.as_millis());

        pending.task = Some(self.handle.spawn(async move {
            time::sleep(delay).await;
            {
                let mut pending = lock(&slot);
                if pending.generation != generation {
                    return;
                }
                pending.task = None;
            }
            trace!("timer '{}' fired", name);
            callback();
        }));
    }

    pub fn cancel(&self) {
        let mut pending = lock(&self.pending);
        pending.generation = pending.generation.wrapping_add(1);
        if let Some(task) = pending.task.take() {
            task.abort();
            trace!("timer '{}' cancelled", self.name);
        }
    }

    pub fn is_pending(&self) -> bool {
        lock(&self.pending).task.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_rearm_replaces_pending_callback() {
        let slot = Scheduler::current().unwrap().slot("test");
        let fired = Arc::new(AtomicUsize::new(0));

        for _ in 0..5 {
            let fired = Arc::clone(&fired);
            slot.arm(Duration::from_millis(100), move || {
                fired.fetch_add(1, Ordering::SeqCst);
            });
            time::sleep(Duration::from_millis(50)).await;
        }
        assert!(slot.is_pending());
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        time::sleep(Duration::from_millis(100)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!slot.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_callback() {
        let slot = Scheduler::current().unwrap().slot("test");
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        slot.arm(Duration::from_millis(10), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        slot.cancel();
        time::sleep(Duration::from_millis(50)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_callback_may_rearm_its_own_slot() {
        let slot = Scheduler::current().unwrap().slot("test");
        let fired = Arc::new(AtomicUsize::new(0));

        let inner_slot = slot.clone();
        let counter = Arc::clone(&fired);
        slot.arm(Duration::from_millis(10), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            let counter = Arc::clone(&counter);
            inner_slot.arm(Duration::from_millis(10), move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        });

        time::sleep(Duration::from_millis(50)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }
}
