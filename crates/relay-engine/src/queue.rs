//! Critical task queue for asynchronous-but-durable side effects (§4.6 step
//! 9, §5).
//!
//! Suspension decisions and post-stream settlement must not be aborted just
//! because the client connection that triggered them went away: each is
//! spawned onto the Tokio runtime as a detached task whose `JoinHandle` this
//! queue retains, so [`CriticalTaskQueue::drain`] can await every
//! outstanding one before the process shuts down — the same
//! non-cancellable-critical-subcontext shape the teacher gives its own
//! background maintenance tasks.
use std::future::Future;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

#[derive(Default)]
pub struct CriticalTaskQueue {
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl CriticalTaskQueue {
    pub fn new() -> Self {
        Self {
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Spawns `task` detached from the caller's task, retaining its handle
    /// so it can still be drained at shutdown.
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(task);
        let mut handles = self.handles.lock();
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
    }

    /// Number of tasks not yet observed to have finished.
    pub fn pending(&self) -> usize {
        let mut handles = self.handles.lock();
        handles.retain(|h| !h.is_finished());
        handles.len()
    }

    /// Awaits every outstanding task. Intended for graceful shutdown.
    pub async fn drain(&self) {
        let handles = std::mem::take(&mut *self.handles.lock());
        for handle in handles {
            let _ = handle.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn drain_waits_for_every_spawned_task() {
        let queue = CriticalTaskQueue::new();
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..5 {
            let counter = Arc::clone(&counter);
            queue.spawn(async move {
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }

        queue.drain().await;
        assert_eq!(counter.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn pending_reflects_unfinished_tasks() {
        let queue = CriticalTaskQueue::new();
        queue.spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        });
        assert_eq!(queue.pending(), 1);
        queue.drain().await;
        assert_eq!(queue.pending(), 0);
    }
}
