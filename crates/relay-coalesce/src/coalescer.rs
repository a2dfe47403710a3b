//! Keyed single-flight deduplication (§5): guards expensive read-through
//! populations (e.g. anonymous model listing) so concurrent identical
//! requests share one execution instead of thundering the backing store.

use crate::error::CoalesceError;
use hashbrown::HashMap;
use parking_lot::Mutex;
use std::future::Future;
use tokio::sync::broadcast;

#[cfg(feature = "metrics")]
use metrics::counter;
#[cfg(feature = "tracing")]
use tracing::debug;

struct InFlight<T, E> {
    senders: Mutex<HashMap<String, broadcast::Sender<Result<T, E>>>>,
}

impl<T: Clone, E: Clone> InFlight<T, E> {
    fn new() -> Self {
        Self {
            senders: Mutex::new(HashMap::new()),
        }
    }

    fn try_join(&self, key: &str) -> Option<broadcast::Receiver<Result<T, E>>> {
        let mut senders = self.senders.lock();
        if let Some(tx) = senders.get(key) {
            Some(tx.subscribe())
        } else {
            let (tx, _rx) = broadcast::channel(1);
            senders.insert(key.to_string(), tx);
            None
        }
    }

    fn complete(&self, key: &str, result: Result<T, E>) {
        if let Some(tx) = self.senders.lock().remove(key) {
            let _ = tx.send(result);
        }
    }

    fn cancel(&self, key: &str) {
        self.senders.lock().remove(key);
    }
}

/// A keyed single-flight guard. One instance is shared across every caller
/// that wants to deduplicate on the same keyspace (e.g. one `Coalescer` for
/// anonymous model listing, independent of the per-token ledger locks).
pub struct Coalescer<T, E> {
    in_flight: InFlight<T, E>,
}

impl<T, E> Coalescer<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self {
            in_flight: InFlight::new(),
        }
    }

    /// Runs `f` for `key` unless another caller is already in flight for the
    /// same key, in which case this call waits for that leader's result and
    /// clones it rather than re-running `f`.
    pub async fn run<F, Fut>(&self, key: &str, f: F) -> Result<T, CoalesceError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(mut receiver) = self.in_flight.try_join(key) {
            #[cfg(feature = "tracing")]
            debug!(key, "joined in-flight request as a follower");
            #[cfg(feature = "metrics")]
            counter!("coalesce_requests_total", "role" => "follower").increment(1);

            return match receiver.recv().await {
                Ok(result) => result.map_err(CoalesceError::Leader),
                Err(broadcast::error::RecvError::Closed) => Err(CoalesceError::LeaderCancelled),
                Err(broadcast::error::RecvError::Lagged(_)) => Err(CoalesceError::RecvLagged),
            };
        }

        #[cfg(feature = "tracing")]
        debug!(key, "executing as leader");
        #[cfg(feature = "metrics")]
        counter!("coalesce_requests_total", "role" => "leader").increment(1);

        let result = f().await;
        let broadcast_result = match &result {
            Ok(value) => Ok(value.clone()),
            Err(e) => Err(e.clone()),
        };
        self.in_flight.complete(key, broadcast_result);

        result.map_err(CoalesceError::Leader)
    }

    /// Drops any in-flight leader registration for `key` without notifying
    /// followers (used when a leader is aborted rather than completing).
    pub fn cancel(&self, key: &str) {
        self.in_flight.cancel(key);
    }
}

impl<T, E> Default for Coalescer<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn concurrent_callers_for_same_key_share_one_execution() {
        let coalescer = Arc::new(Coalescer::<u32, String>::new());
        let executions = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let coalescer = Arc::clone(&coalescer);
            let executions = Arc::clone(&executions);
            handles.push(tokio::spawn(async move {
                coalescer
                    .run("models:anon", || async {
                        executions.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok::<u32, String>(42)
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), 42);
        }
        assert_eq!(executions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn distinct_keys_run_independently() {
        let coalescer = Coalescer::<u32, String>::new();
        let a = coalescer.run("a", || async { Ok::<u32, String>(1) }).await;
        let b = coalescer.run("b", || async { Ok::<u32, String>(2) }).await;
        assert_eq!(a.unwrap(), 1);
        assert_eq!(b.unwrap(), 2);
    }
}
