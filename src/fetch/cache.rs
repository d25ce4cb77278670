use std::{collections::HashMap, sync::Arc};

use futures::{
    FutureExt,
    future::{BoxFuture, Shared},
};
use parking_lot::Mutex;
use serde_json::Value;
use tracing::instrument;

use super::{FetchError, Transport};
use crate::domain::CacheKey;

type FetchResult = Result<Arc<Value>, FetchError>;
type SharedFetch = Shared<BoxFuture<'static, FetchResult>>;

/// A per-session response cache keyed by exact request path.
///
/// - At most one request per key is in flight; concurrent callers for the
///   same key await the same request.
/// - Settled responses, failures included, are served from memory until the
///   key is invalidated.
/// - Requests run on their own task, so a caller that stops waiting does not
///   cancel the request for others.
///
/// Cloning is cheap and clones share the same entries.
#[derive(Debug)]
pub struct FetchCache<T> {
    transport: Arc<T>,
    entries: Arc<Mutex<Entries>>,
}

impl<T> Clone for FetchCache<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            entries: Arc::clone(&self.entries),
        }
    }
}

#[derive(Default)]
struct Entries {
    settled: HashMap<CacheKey, FetchResult>,
    in_flight: HashMap<CacheKey, InFlight>,
    next_generation: u64,
}

struct InFlight {
    generation: u64,
    fetch: SharedFetch,
}

impl std::fmt::Debug for Entries {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entries")
            .field("settled", &self.settled.len())
            .field("in_flight", &self.in_flight.len())
            .finish()
    }
}

impl<T: Transport> FetchCache<T> {
    /// Creates an empty cache over `transport`.
    pub fn new(transport: T) -> Self {
        Self {
            transport: Arc::new(transport),
            entries: Arc::default(),
        }
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns the response for `key`, fetching it if necessary.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns the [`FetchError`] of the request, which is also cached.
    #[instrument(level = "debug", skip_all, fields(%key))]
    pub async fn get(&self, key: &CacheKey) -> FetchResult {
        let fetch = {
            let mut entries = self.entries.lock();
            if let Some(result) = entries.settled.get(key) {
                tracing::debug!("cache hit");
                return result.clone();
            }
            if let Some(in_flight) = entries.in_flight.get(key) {
                tracing::debug!("joining in-flight request");
                in_flight.fetch.clone()
            } else {
                let generation = entries.next_generation;
                entries.next_generation += 1;
                let fetch = self.start(key.clone(), generation);
                entries.in_flight.insert(
                    key.clone(),
                    InFlight {
                        generation,
                        fetch: fetch.clone(),
                    },
                );
                fetch
            }
        };

        fetch.await
    }

    fn start(&self, key: CacheKey, generation: u64) -> SharedFetch {
        let transport = Arc::clone(&self.transport);
        let entries = Arc::clone(&self.entries);
        let endpoint = key.to_string();

        let task = tokio::spawn(async move {
            let result = transport.get(&key).await.map(Arc::new);
            if let Err(error) = &result {
                tracing::debug!(%key, %error, "request failed");
            }

            let mut entries = entries.lock();
            // An invalidation while in flight makes this response stale.
            if entries
                .in_flight
                .get(&key)
                .is_some_and(|in_flight| in_flight.generation == generation)
            {
                entries.in_flight.remove(&key);
                entries.settled.insert(key, result.clone());
            } else {
                tracing::debug!(%key, "discarding superseded response");
            }
            result
        });

        async move {
            task.await.unwrap_or_else(|e| {
                Err(FetchError::Network {
                    endpoint,
                    message: e.to_string(),
                })
            })
        }
        .boxed()
        .shared()
    }
}

impl<T> FetchCache<T> {
    /// The settled response for `key`, without fetching.
    pub fn peek(&self, key: &CacheKey) -> Option<FetchResult> {
        self.entries.lock().settled.get(key).cloned()
    }

    /// Whether a request for `key` is currently in flight.
    pub fn is_in_flight(&self, key: &CacheKey) -> bool {
        self.entries.lock().in_flight.contains_key(key)
    }

    /// Settled successful responses whose key starts with `prefix`.
    pub fn settled_with_prefix(&self, prefix: &str) -> Vec<Arc<Value>> {
        self.entries
            .lock()
            .settled
            .iter()
            .filter(|(key, _)| key.as_str().starts_with(prefix))
            .filter_map(|(_, result)| result.as_ref().ok().cloned())
            .collect()
    }

    /// Forgets `key` so the next [`get`](Self::get) fetches again.
    ///
    /// A request already in flight for `key` still completes for its
    /// waiters but its response is not stored.
    pub fn invalidate(&self, key: &CacheKey) {
        let mut entries = self.entries.lock();
        entries.settled.remove(key);
        entries.in_flight.remove(key);
    }

    /// Forgets every key.
    pub fn clear(&self) {
        let mut entries = self.entries.lock();
        entries.settled.clear();
        entries.in_flight.clear();
    }
}
