use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use super::{FetchState, ResourceLoader};
use crate::api::ApiError;

type FetchFn<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, ApiError>> + Send + Sync>;

/// A resource bound to a rendering consumer.
///
/// Holds the latest `FetchState` for its key and republishes every emission
/// of the loader. Dropping the binding stops delivery; the shared fetch
/// keeps running and still updates the cache.
pub struct Binding<T> {
    loader: ResourceLoader<T>,
    key: String,
    fetch: FetchFn<T>,
    tx: Arc<watch::Sender<FetchState<T>>>,
    rx: watch::Receiver<FetchState<T>>,
    stale: Arc<AtomicBool>,
    forwarder: Option<JoinHandle<()>>,
}

impl<T> Binding<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Bind `key` and start loading it. Must be called from within a Tokio runtime.
    pub fn bind<F, Fut>(loader: ResourceLoader<T>, key: impl Into<String>, fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        let (tx, rx) = watch::channel(FetchState::Idle);
        let mut binding = Self {
            loader,
            key: key.into(),
            fetch: Arc::new(move || fetch().boxed()),
            tx: Arc::new(tx),
            rx,
            stale: Arc::new(AtomicBool::new(false)),
            forwarder: None,
        };
        binding.reload();
        binding
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Load again. The only way out of a terminal `Error`; nothing retries
    /// on its own.
    pub fn reload(&mut self) {
        if let Some(forwarder) = self.forwarder.take() {
            forwarder.abort();
        }

        self.stale.store(false, Ordering::SeqCst);

        let fetch = Arc::clone(&self.fetch);
        let mut subscription = self.loader.load(&self.key, move || fetch());

        // The first emission never waits, so publish it before returning
        if let Some(initial) = subscription.take_initial() {
            self.tx.send_replace(initial);
            self.rx.borrow_and_update();
        }

        let tx = Arc::clone(&self.tx);
        let stale = Arc::clone(&self.stale);
        let key = self.key.clone();
        self.forwarder = Some(tokio::spawn(async move {
            while let Some(state) = subscription.next().await {
                // Flag before publishing so observers of the state see it
                if subscription.served_stale() {
                    stale.store(true, Ordering::SeqCst);
                }
                if tx.send(state).is_err() {
                    debug!(key = %key, "Binding dropped, stopping delivery");
                    break;
                }
            }
        }));
    }

    pub fn state(&self) -> FetchState<T> {
        self.rx.borrow().clone()
    }

    pub fn value(&self) -> Option<T> {
        self.rx.borrow().value().cloned()
    }

    pub fn is_loading(&self) -> bool {
        self.rx.borrow().is_loading()
    }

    pub fn error(&self) -> Option<Arc<ApiError>> {
        self.rx.borrow().error().cloned()
    }

    /// True when the last refresh failed and the cached value is still shown.
    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::SeqCst)
    }

    /// How long ago the cached copy of this resource was stored, if there is one.
    pub fn cache_age(&self) -> Option<String> {
        self.loader
            .store()
            .get::<T>(&self.key)
            .map(|entry| entry.age_display())
    }

    /// Wait for the next published state. Returns the new state.
    pub async fn changed(&mut self) -> FetchState<T> {
        // The sender lives as long as `self`, so this only fails if it was
        // replaced, which never happens.
        let _ = self.rx.changed().await;
        self.rx.borrow_and_update().clone()
    }

    /// Wait until the current load has delivered its last emission.
    pub async fn settled(&mut self) -> FetchState<T> {
        if let Some(forwarder) = self.forwarder.take() {
            if let Err(e) = forwarder.await {
                debug!(key = %self.key, error = %e, "Binding forwarder ended abnormally");
            }
        }
        self.state()
    }
}

impl<T> Drop for Binding<T> {
    fn drop(&mut self) {
        if let Some(forwarder) = self.forwarder.take() {
            forwarder.abort();
        }
    }
}
