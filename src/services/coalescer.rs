//! Request coalescing for notification fetches.
//!
//! At most one fetch per key is in flight. Callers that arrive while it runs
//! receive a clone of the same shared future, so they all observe the single
//! value it produces. The fetch itself runs on a spawned task: callers that
//! stop waiting do not cancel it, and its settlement effects still land.

use crate::domain::ports::TaskSpawner;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};
use tracing::debug;

/// Handle on an in-flight fetch, awaitable by any number of callers
pub type SharedFetch<V> = Shared<BoxFuture<'static, V>>;

struct InFlight<V> {
    ticket: u64,
    result: SharedFetch<V>,
}

pub struct RequestCoalescer<K, V> {
    name: &'static str,
    in_flight: Arc<Mutex<HashMap<K, InFlight<V>>>>,
    next_ticket: AtomicU64,
    spawner: Arc<dyn TaskSpawner>,
}

impl<K, V> RequestCoalescer<K, V>
where
    K: Hash + Eq + Clone + Debug + Send + 'static,
    V: Clone + Default + Send + Sync + 'static,
{
    pub fn new(name: &'static str, spawner: Arc<dyn TaskSpawner>) -> Self {
        Self {
            name,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            next_ticket: AtomicU64::new(0),
            spawner,
        }
    }

    /// Join the fetch in flight for `key`, or start one with `fetch`.
    ///
    /// Lookup and registration happen under one lock, so two callers can
    /// never both start a fetch for the same key. The table entry is removed
    /// once `fetch` completes, before waiters are released.
    pub async fn join_or_start<F, Fut>(&self, key: K, fetch: F) -> SharedFetch<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V> + Send + 'static,
    {
        let mut in_flight = self.in_flight.lock().await;

        if let Some(pending) = in_flight.get(&key) {
            metrics::counter!("fieldesk_coalesced_total", "coalescer" => self.name).increment(1);
            debug!(coalescer = self.name, ?key, "Joining in-flight fetch");
            return pending.result.clone();
        }

        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        let table = Arc::clone(&self.in_flight);
        let task_key = key.clone();
        let work = fetch();

        debug!(coalescer = self.name, ?key, ticket, "Starting fetch");
        self.spawner.spawn(
            async move {
                let value = work.await;

                {
                    let mut table = table.lock().await;
                    // A reset may have replaced the entry with a newer fetch
                    if table.get(&task_key).map_or(false, |p| p.ticket == ticket) {
                        table.remove(&task_key);
                    }
                }

                let _ = tx.send(value);
            }
            .boxed(),
        );

        // Sender only drops unsent if the runtime tears the task down
        let result = rx.map(|received| received.unwrap_or_default()).boxed().shared();
        in_flight.insert(
            key,
            InFlight {
                ticket,
                result: result.clone(),
            },
        );

        result
    }

    /// Number of keys with a fetch in flight
    pub async fn in_flight_len(&self) -> usize {
        self.in_flight.lock().await.len()
    }

    /// Forget every in-flight fetch. Running fetches still complete for
    /// callers already holding them; new callers start fresh ones.
    pub async fn clear(&self) {
        self.in_flight.lock().await.clear();
    }
}
