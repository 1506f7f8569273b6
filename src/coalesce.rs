//! Per-key request coalescing (single flight).
//!
//! A [`Coalescer`] maps a key to the shared future of the backing fetch that
//! is currently running for it. The first caller for a key installs the
//! future; concurrent callers for the same key attach to it and receive a
//! clone of the same outcome, success or error. The entry is cleared once the
//! fetch settles, so the next miss starts a fresh fetch.
//!
//! Keys are plain strings composed by the caller (`token`,
//! `environment_id`, `environment_id:segment_id`). FIFO order among waiters
//! is not guaranteed.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};

use crate::Result;
use crate::telemetry;

type InFlight<V> = Shared<BoxFuture<'static, Result<V>>>;

/// Single-flight map from key to in-flight fetch.
pub struct Coalescer<V> {
    kind: &'static str,
    in_flight: Mutex<HashMap<String, InFlight<V>>>,
}

impl<V> Coalescer<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create a coalescer. `kind` labels the coalescing metric.
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Run `fetch` for `key` unless a fetch for `key` is already in flight,
    /// in which case wait for that one instead.
    ///
    /// `fetch` is only invoked by the caller that installs the entry. The
    /// returned future must own everything it needs: if the installing
    /// caller is dropped, the remaining waiters keep driving it.
    pub async fn run<F, Fut>(&self, key: &str, fetch: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let shared = {
            let mut in_flight = self.lock();
            match in_flight.get(key) {
                Some(existing) => {
                    metrics::counter!(telemetry::COALESCED_REQUESTS_TOTAL, "type" => self.kind)
                        .increment(1);
                    existing.clone()
                }
                None => {
                    let fut = fetch().boxed().shared();
                    in_flight.insert(key.to_string(), fut.clone());
                    fut
                }
            }
        };

        let outcome = shared.clone().await;

        // Only clear our own entry; a newer fetch may already own the key.
        let mut in_flight = self.lock();
        if in_flight
            .get(key)
            .is_some_and(|current| current.ptr_eq(&shared))
        {
            in_flight.remove(key);
        }
        outcome
    }

    /// Number of keys with a fetch currently in flight.
    pub fn in_flight(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, InFlight<V>>> {
        // A panic while holding the lock cannot leave the map inconsistent.
        self.in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::GatewayError;

    #[tokio::test]
    async fn entry_is_cleared_after_completion() {
        let coalescer: Coalescer<u32> = Coalescer::new("test");
        let value = coalescer.run("k", || async { Ok(7) }).await;
        assert_eq!(value, Ok(7));
        assert_eq!(coalescer.in_flight(), 0);
    }

    #[tokio::test]
    async fn sequential_calls_fetch_again() {
        let coalescer: Coalescer<u32> = Coalescer::new("test");
        let calls = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let calls = calls.clone();
            coalescer
                .run("k", move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(1)
                })
                .await
                .unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn concurrent_waiters_share_error() {
        let coalescer: Arc<Coalescer<u32>> = Arc::new(Coalescer::new("test"));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..5 {
            let coalescer = coalescer.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                coalescer
                    .run("k", move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Err(GatewayError::Internal)
                    })
                    .await
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap(), Err(GatewayError::Internal));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
