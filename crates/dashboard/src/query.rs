//! Asynchronous read bindings with `{data, loading, error}` state.
//!
//! An [`AsyncQuery`] binds a fetch operation to a dependency value and
//! re-runs it whenever that value changes. There is no caching across calls,
//! no de-duplication and no retry. Completions from superseded or cancelled
//! fetches are discarded.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};

use domain::services::{Notifier, Toast};
use persistence::StoreError;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Boxed future returned by fetch operations and callbacks.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

type Fetcher<T, D> = Arc<dyn Fn(D) -> BoxFuture<'static, Result<T, StoreError>> + Send + Sync>;

/// Observable state of a query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryState<T> {
    pub data: Option<T>,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> Default for QueryState<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
        }
    }
}

struct Inner<T, D> {
    state: QueryState<T>,
    deps: Option<D>,
    generation: u64,
    token: CancellationToken,
}

struct Shared<T, D> {
    inner: Mutex<Inner<T, D>>,
    fetch: Fetcher<T, D>,
    notifier: Arc<dyn Notifier>,
    changes: watch::Sender<u64>,
}

impl<T, D> Drop for Shared<T, D> {
    fn drop(&mut self) {
        let inner = self.inner.get_mut().unwrap_or_else(|e| e.into_inner());
        inner.token.cancel();
    }
}

/// A fetch operation bound to a dependency value.
///
/// Clones share state. Dropping the last clone cancels any fetch in flight.
pub struct AsyncQuery<T, D> {
    shared: Arc<Shared<T, D>>,
}

impl<T, D> Clone for AsyncQuery<T, D> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T, D> AsyncQuery<T, D>
where
    T: Clone + Send + Sync + 'static,
    D: Clone + PartialEq + Send + Sync + 'static,
{
    pub fn new<F, Fut>(notifier: Arc<dyn Notifier>, fetch: F) -> Self
    where
        F: Fn(D) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, StoreError>> + Send + 'static,
    {
        let fetch: Fetcher<T, D> =
            Arc::new(move |deps| -> BoxFuture<'static, Result<T, StoreError>> {
                Box::pin(fetch(deps))
            });
        let (changes, _) = watch::channel(0);
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    state: QueryState::default(),
                    deps: None,
                    generation: 0,
                    token: CancellationToken::new(),
                }),
                fetch,
                notifier,
                changes,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T, D>> {
        self.shared
            .inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    fn publish(&self) {
        self.shared.changes.send_modify(|version| *version += 1);
    }

    /// Runs the fetch when `deps` differs from the last value seen, or on the
    /// first call.
    pub async fn sync(&self, deps: D) {
        {
            let mut inner = self.lock();
            if inner.deps.as_ref() == Some(&deps) {
                return;
            }
            inner.deps = Some(deps.clone());
        }
        self.run(deps).await;
    }

    /// Repeats the fetch with the current dependency value.
    pub async fn refetch(&self) {
        let deps = self.lock().deps.clone();
        match deps {
            Some(deps) => self.run(deps).await,
            None => tracing::debug!("Refetch requested before first sync"),
        }
    }

    /// Abandons any fetch in flight. Its result will not be applied.
    ///
    /// The next [`AsyncQuery::sync`] fetches again even with unchanged deps.
    pub fn cancel(&self) {
        {
            let mut inner = self.lock();
            inner.token.cancel();
            inner.token = CancellationToken::new();
            inner.generation += 1;
            inner.deps = None;
            inner.state.loading = false;
        }
        self.publish();
    }

    pub fn snapshot(&self) -> QueryState<T> {
        self.lock().state.clone()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.shared.changes.subscribe()
    }

    async fn run(&self, deps: D) {
        let (generation, token) = {
            let mut inner = self.lock();
            inner.generation += 1;
            inner.state.loading = true;
            inner.state.error = None;
            (inner.generation, inner.token.clone())
        };
        self.publish();

        let fetch = Arc::clone(&self.shared.fetch);
        let result = tokio::select! {
            _ = token.cancelled() => {
                tracing::debug!(generation, "Fetch cancelled");
                return;
            }
            result = fetch(deps) => result,
        };

        let failure = {
            let mut inner = self.lock();
            if inner.generation != generation {
                tracing::trace!(generation, current = inner.generation, "Discarding stale fetch");
                return;
            }
            inner.state.loading = false;
            match result {
                Ok(data) => {
                    inner.state.data = Some(data);
                    None
                }
                Err(e) => {
                    let message = e.to_string();
                    inner.state.error = Some(message.clone());
                    Some(message)
                }
            }
        };
        self.publish();

        if let Some(message) = failure {
            self.shared.notifier.notify(Toast::error("Error", message));
        }
    }
}
