//! Collapsing of concurrent identical requests.
//!
//! [`RequestDeduplicator`] keeps one in-flight future per caller-chosen key.
//! A second caller arriving with the same key while the first is still
//! running joins the existing future instead of starting the operation
//! again, and both observe the same outcome (success or failure).
//!
//! Entries are released as soon as the shared future settles, so a later
//! call with the same key starts fresh. Each entry carries a registration
//! id; a settling future only releases the entry it registered, never a
//! newer one installed under the same key after a [`clear`](RequestDeduplicator::clear).
//!
//! The operation is driven by a spawned tokio task, so it runs to completion
//! and releases its key even when every caller stops waiting. Callers must
//! therefore be inside a tokio runtime.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use tracing::debug;

use crate::HeimdallError;
use crate::telemetry;

type SharedOutcome<T, E> = Shared<BoxFuture<'static, Result<T, E>>>;
type InFlightMap<T, E> = Arc<Mutex<HashMap<String, InFlight<T, E>>>>;

struct InFlight<T, E> {
    id: u64,
    future: SharedOutcome<T, E>,
}

/// Registry of in-flight operations keyed by a deduplication key.
///
/// `T` and `E` must be `Clone` because every waiter receives its own copy
/// of the shared outcome.
///
/// ```rust
/// # use heimdall::dedup::RequestDeduplicator;
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> heimdall::Result<()> {
/// let dedup: RequestDeduplicator<u32> = RequestDeduplicator::new();
/// let (a, b) = tokio::join!(
///     dedup.deduplicate("user:42", || async { Ok(42) }),
///     dedup.deduplicate("user:42", || async { Ok(0) }),
/// );
/// assert_eq!(a?, 42);
/// assert_eq!(b?, 42);
/// # Ok(())
/// # }
/// ```
pub struct RequestDeduplicator<T, E = HeimdallError> {
    inflight: InFlightMap<T, E>,
    next_id: AtomicU64,
}

impl<T, E> RequestDeduplicator<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            inflight: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(0),
        }
    }

    /// Run `operation` under `key`, or join the run already in flight.
    ///
    /// `operation` is only invoked when no entry exists for `key`. It is
    /// called while the registry lock is held, so it must not call back
    /// into this deduplicator before returning its future.
    pub async fn deduplicate<F, Fut>(&self, key: impl Into<String>, operation: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let key = key.into();
        let shared = {
            let mut inflight = lock(&self.inflight);
            match inflight.get(&key) {
                Some(entry) => {
                    debug!(key = %key, "joining in-flight request");
                    metrics::counter!(telemetry::DEDUP_JOINS_TOTAL).increment(1);
                    entry.future.clone()
                }
                None => {
                    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                    let future = self.register(key.clone(), id, operation());
                    inflight.insert(
                        key,
                        InFlight {
                            id,
                            future: future.clone(),
                        },
                    );
                    // Completion no longer depends on a caller polling.
                    tokio::spawn(future.clone());
                    future
                }
            }
        };
        shared.await
    }

    /// Whether an operation is currently in flight for `key`.
    pub fn is_pending(&self, key: &str) -> bool {
        lock(&self.inflight).contains_key(key)
    }

    /// Drop the entry for `key`, or every entry when `key` is `None`.
    ///
    /// Futures already handed out keep running and still resolve to their
    /// original outcome; only the registration is forgotten.
    pub fn clear(&self, key: Option<&str>) {
        let mut inflight = lock(&self.inflight);
        match key {
            Some(key) => {
                inflight.remove(key);
            }
            None => inflight.clear(),
        }
    }

    /// Number of operations currently in flight.
    pub fn pending_count(&self) -> usize {
        lock(&self.inflight).len()
    }

    /// Wrap `fut` so that settling it releases its own registration.
    fn register<Fut>(&self, key: String, id: u64, fut: Fut) -> SharedOutcome<T, E>
    where
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let registry = Arc::clone(&self.inflight);
        async move {
            let outcome = fut.await;
            let mut inflight = lock(&registry);
            if inflight.get(&key).is_some_and(|entry| entry.id == id) {
                inflight.remove(&key);
            }
            outcome
        }
        .boxed()
        .shared()
    }
}

impl<T, E> Default for RequestDeduplicator<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

// The map is only mutated with simple inserts/removes, so a poisoned lock
// still holds a consistent map.
fn lock<T, E>(map: &InFlightMap<T, E>) -> MutexGuard<'_, HashMap<String, InFlight<T, E>>> {
    map.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn entry_released_after_success() {
        let dedup: RequestDeduplicator<&'static str> = RequestDeduplicator::new();
        let value = dedup.deduplicate("k", || async { Ok("done") }).await;
        assert_eq!(value.unwrap(), "done");
        assert!(!dedup.is_pending("k"));
        assert_eq!(dedup.pending_count(), 0);
    }

    #[tokio::test]
    async fn stale_completion_does_not_release_newer_entry() {
        let dedup: Arc<RequestDeduplicator<u8>> = Arc::new(RequestDeduplicator::new());
        let (tx_old, rx_old) = tokio::sync::oneshot::channel::<()>();
        let (_tx_new, rx_new) = tokio::sync::oneshot::channel::<()>();

        let d = Arc::clone(&dedup);
        let old = tokio::spawn(async move {
            d.deduplicate("k", || async move {
                let _ = rx_old.await;
                Ok(1)
            })
            .await
        });
        while !dedup.is_pending("k") {
            tokio::task::yield_now().await;
        }

        dedup.clear(Some("k"));
        assert!(!dedup.is_pending("k"));

        let d = Arc::clone(&dedup);
        let _newer = tokio::spawn(async move {
            d.deduplicate("k", || async move {
                let _ = rx_new.await;
                Ok(2)
            })
            .await
        });
        while !dedup.is_pending("k") {
            tokio::task::yield_now().await;
        }

        tx_old.send(()).unwrap();
        assert_eq!(old.await.unwrap().unwrap(), 1);
        assert!(dedup.is_pending("k"), "newer registration must survive");
    }
}
