//! Stale-while-revalidate loading with per-key request coalescing.
//!
//! `ResourceLoader::load` serves the cached copy of a resource right away
//! and starts a background fetch for it, unless one is already running for
//! the same key, in which case the caller attaches to that fetch. Every
//! attached caller sees the same outcome. A successful fetch overwrites the
//! cache; a failed one leaves it alone and callers holding a cached copy
//! keep it.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::Stream;
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::{CacheStore, FetchState};
use crate::api::ApiError;

/// Default upper bound on a single fetch, matching the HTTP client timeout.
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Cached entries older than this are ignored. `None` never expires.
    pub max_age: Option<Duration>,
    /// Fetches still pending after this fail with `ApiError::Timeout`.
    pub fetch_timeout: Option<Duration>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            max_age: None,
            fetch_timeout: Some(Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS)),
        }
    }
}

type Outcome<T> = Result<T, Arc<ApiError>>;

struct Inner<T> {
    store: CacheStore,
    config: LoaderConfig,
    in_flight: Mutex<HashMap<String, broadcast::Sender<Outcome<T>>>>,
}

impl<T> Inner<T> {
    fn in_flight(&self) -> MutexGuard<'_, HashMap<String, broadcast::Sender<Outcome<T>>>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Unregisters a fetch when dropped, including when the fetch task panics.
struct InFlightGuard<T> {
    inner: Arc<Inner<T>>,
    key: String,
}

impl<T> Drop for InFlightGuard<T> {
    fn drop(&mut self) {
        self.inner.in_flight().remove(&self.key);
        debug!(key = %self.key, "Fetch unregistered");
    }
}

/// Loader for one resource type. Clone is cheap; clones share the
/// in-flight registry.
pub struct ResourceLoader<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for ResourceLoader<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> ResourceLoader<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    pub fn new(store: CacheStore, config: LoaderConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                config,
                in_flight: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn store(&self) -> &CacheStore {
        &self.inner.store
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.inner.config
    }

    /// Cached value for `key`, unless missing, malformed, empty or too old.
    fn cached_value(&self, key: &str) -> Option<T> {
        let entry = self.inner.store.get::<T>(key)?;
        if let Some(max_age) = self.inner.config.max_age {
            if entry.is_older_than(max_age) {
                debug!(key, age = %entry.age_display(), "Cache entry expired");
                return None;
            }
        }
        debug!(key, age = %entry.age_display(), "Cache hit");
        Some(entry.value)
    }

    /// Start observing `key`.
    ///
    /// The first emission of the returned subscription is available without
    /// waiting: `Ready(cached)` on a cache hit, `Loading` otherwise. The
    /// second and last one is the settled outcome of the shared fetch.
    ///
    /// `fetch` is only invoked when no fetch for `key` is already running.
    /// Must be called from within a Tokio runtime.
    pub fn load<F, Fut>(&self, key: &str, fetch: F) -> Subscription<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        let cached = self.cached_value(key);

        // Check and register under one lock acquisition, no await in between.
        let (outcome, owner) = {
            let mut in_flight = self.inner.in_flight();
            match in_flight.get(key) {
                Some(tx) => {
                    debug!(key, "Attaching to in-flight fetch");
                    (tx.subscribe(), None)
                }
                None => {
                    let (tx, rx) = broadcast::channel(1);
                    in_flight.insert(key.to_string(), tx.clone());
                    (rx, Some(tx))
                }
            }
        };

        if let Some(tx) = owner {
            // Guard first: a `fetch` that panics before handing back its
            // future must not leave the key registered.
            let guard = InFlightGuard {
                inner: Arc::clone(&self.inner),
                key: key.to_string(),
            };
            let fetch = fetch();
            self.spawn_fetch(guard, tx, fetch);
        }

        Subscription::new(key.to_string(), cached, outcome)
    }

    fn spawn_fetch<Fut>(
        &self,
        guard: InFlightGuard<T>,
        tx: broadcast::Sender<Outcome<T>>,
        fetch: Fut,
    ) where
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        tokio::spawn(async move {
            let inner = Arc::clone(&guard.inner);
            let key = guard.key.clone();
            info!(key = %key, "Fetching resource");

            let result = match inner.config.fetch_timeout {
                Some(limit) => match tokio::time::timeout(limit, fetch).await {
                    Ok(result) => result,
                    Err(_) => Err(ApiError::Timeout(limit)),
                },
                None => fetch.await,
            };

            let outcome = match result {
                Ok(value) => {
                    if let Err(e) = inner.store.set(&key, &value) {
                        warn!(key = %key, error = %e, "Failed to cache fetched value");
                    }
                    info!(key = %key, "Fetch settled");
                    Ok(value)
                }
                Err(e) => {
                    warn!(key = %key, error = %e, transient = e.is_transient(), "Fetch failed");
                    Err(Arc::new(e))
                }
            };

            // Unregister before broadcasting so a late caller either attached
            // already or starts a fresh fetch.
            drop(guard);
            if tx.send(outcome).is_err() {
                debug!(key = %key, "Fetch settled with no remaining subscribers");
            }
        });
    }

    /// Drop the cached entry for `key`. A running fetch is not cancelled and
    /// will repopulate the entry if it succeeds.
    pub fn invalidate(&self, key: &str) -> Result<(), super::CacheError> {
        info!(key, "Invalidating cache entry");
        self.inner.store.remove(key)
    }

    pub fn is_in_flight(&self, key: &str) -> bool {
        self.inner.in_flight().contains_key(key)
    }

    pub fn in_flight_count(&self) -> usize {
        self.inner.in_flight().len()
    }
}

/// The emissions of one `load` call, in order.
pub struct Subscription<T> {
    key: String,
    initial: Option<FetchState<T>>,
    fallback: Option<T>,
    outcome: Option<broadcast::Receiver<Outcome<T>>>,
    served_stale: bool,
}

impl<T: Clone> Subscription<T> {
    fn new(key: String, cached: Option<T>, outcome: broadcast::Receiver<Outcome<T>>) -> Self {
        let initial = match &cached {
            Some(value) => FetchState::Ready(value.clone()),
            None => FetchState::Loading,
        };
        Self {
            key,
            initial: Some(initial),
            fallback: cached,
            outcome: Some(outcome),
            served_stale: false,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// The cached value this subscription started from, if any.
    pub fn cached(&self) -> Option<&T> {
        self.fallback.as_ref()
    }

    /// True once the fetch failed and the cached value was re-emitted in
    /// place of the error.
    pub fn served_stale(&self) -> bool {
        self.served_stale
    }

    /// Take the first emission without waiting. `None` once taken.
    pub fn take_initial(&mut self) -> Option<FetchState<T>> {
        self.initial.take()
    }

    /// Next emission, or `None` after the settled outcome was returned.
    pub async fn next(&mut self) -> Option<FetchState<T>> {
        if let Some(initial) = self.initial.take() {
            return Some(initial);
        }

        let mut rx = self.outcome.take()?;
        let outcome = match rx.recv().await {
            Ok(outcome) => outcome,
            // Sender dropped without sending: the fetch task died
            Err(_) => Err(Arc::new(ApiError::Interrupted)),
        };
        Some(self.settle_outcome(outcome))
    }

    fn settle_outcome(&mut self, outcome: Outcome<T>) -> FetchState<T> {
        match outcome {
            Ok(value) => FetchState::Ready(value),
            Err(e) => match self.fallback.take() {
                Some(stale) => {
                    warn!(key = %self.key, error = %e, "Serving cached value after failed fetch");
                    self.served_stale = true;
                    FetchState::Ready(stale)
                }
                None => FetchState::Error(e),
            },
        }
    }

    /// Drain the subscription and return its terminal state.
    pub async fn settle(mut self) -> FetchState<T> {
        let mut last = FetchState::Idle;
        while let Some(state) = self.next().await {
            last = state;
        }
        last
    }

    pub fn into_stream(self) -> impl Stream<Item = FetchState<T>> {
        futures::stream::unfold(self, |mut sub| async move {
            let state = sub.next().await?;
            Some((state, sub))
        })
    }
}
