//! Request coalescing keyed by grid cell
//!
//! Concurrent callers for one key share a single unit of work. The map only
//! holds weak handles, so the work is dropped (and its upstream calls
//! cancelled) once every caller has gone away.

use futures_util::future::{BoxFuture, FutureExt, Shared, WeakShared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::types::CacheKey;

type SharedWork<T> = Shared<BoxFuture<'static, T>>;
type InFlightMap<T> = Arc<Mutex<HashMap<CacheKey, InFlight<T>>>>;

struct InFlight<T> {
    generation: u64,
    work: WeakShared<BoxFuture<'static, T>>,
}

/// Removes its own map entry when the work settles or is dropped.
struct InFlightGuard<T> {
    inflight: InFlightMap<T>,
    key: CacheKey,
    generation: u64,
}

impl<T> Drop for InFlightGuard<T> {
    fn drop(&mut self) {
        let mut inflight = self.inflight.lock();
        let owned = inflight
            .get(&self.key)
            .is_some_and(|entry| entry.generation == self.generation);
        if owned {
            inflight.remove(&self.key);
        }
    }
}

pub struct RequestCoalescer<T> {
    inflight: InFlightMap<T>,
    next_generation: AtomicU64,
}

impl<T> Default for RequestCoalescer<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RequestCoalescer<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            inflight: Arc::new(Mutex::new(HashMap::new())),
            next_generation: AtomicU64::new(0),
        }
    }

    /// Awaits the in-flight work for `key`, starting it with `work` if none is running.
    pub async fn resolve<F, Fut>(&self, key: &CacheKey, work: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        self.join_or_start(key, work).await
    }

    fn join_or_start<F, Fut>(&self, key: &CacheKey, work: F) -> SharedWork<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let mut inflight = self.inflight.lock();
        if let Some(existing) = inflight.get(key).and_then(|entry| entry.work.upgrade()) {
            return existing;
        }

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let guard = InFlightGuard {
            inflight: Arc::clone(&self.inflight),
            key: key.clone(),
            generation,
        };
        let fut = work();
        let shared = async move {
            let _guard = guard;
            fut.await
        }
        .boxed()
        .shared();

        if let Some(weak) = shared.downgrade() {
            inflight.insert(
                key.clone(),
                InFlight {
                    generation,
                    work: weak,
                },
            );
        }
        shared
    }

    /// Number of keys with live work.
    pub fn in_flight(&self) -> usize {
        // upgraded handles are dropped after the lock is released: dropping the
        // last one runs the guard, which takes the lock again
        let live: Vec<SharedWork<T>> = self
            .inflight
            .lock()
            .values()
            .filter_map(|entry| entry.work.upgrade())
            .collect();
        live.len()
    }
}
