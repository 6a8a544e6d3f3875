//! In-memory cache of the book collection.
//!
//! Reads never wait: they return the last successfully fetched collection
//! while a refetch runs in the background. At most one refetch is in flight;
//! concurrent invalidations share it. An invalidation that arrives after the
//! running request was sent makes that refetch fetch once more before it
//! resolves, so its result never predates the invalidation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use futures::future::{self, BoxFuture, FutureExt, Shared};
use tokio::sync::watch;

use crate::{
    error::{AppError, AppResult},
    models::Book,
    repository::BookRepository,
};

/// Handle on an in-flight refetch; clones resolve together
pub type Refetch = Shared<BoxFuture<'static, AppResult<()>>>;

#[derive(Debug, Clone, Default)]
pub struct CacheState {
    pub books: Arc<Vec<Book>>,
    /// At least one fetch has succeeded
    pub loaded: bool,
    pub fetching: bool,
    /// Failure of the most recent fetch, cleared by the next success
    pub error: Option<AppError>,
    pub fetched_at: Option<Instant>,
}

impl CacheState {
    /// Nothing to show yet because the first fetch is still running
    pub fn is_loading(&self) -> bool {
        !self.loaded && self.fetching
    }
}

#[derive(Clone)]
pub struct CollectionCache {
    inner: Arc<Inner>,
}

struct Inner {
    repository: Arc<dyn BookRepository>,
    stale_time: Duration,
    state: watch::Sender<CacheState>,
    flight: Mutex<Flight>,
    closed: AtomicBool,
}

#[derive(Default)]
struct Flight {
    pending: Option<Refetch>,
    /// Bumped by every invalidation
    generation: u64,
}

impl CollectionCache {
    pub fn new(repository: Arc<dyn BookRepository>, stale_time: Duration) -> Self {
        let (state, _) = watch::channel(CacheState::default());
        Self {
            inner: Arc::new(Inner {
                repository,
                stale_time,
                state,
                flight: Mutex::new(Flight::default()),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Last known-good collection, empty before the first successful fetch
    pub fn get(&self) -> Arc<Vec<Book>> {
        self.inner.state.borrow().books.clone()
    }

    pub fn state(&self) -> CacheState {
        self.inner.state.borrow().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().is_loading()
    }

    /// Receiver notified on every cache change
    pub fn subscribe(&self) -> watch::Receiver<CacheState> {
        self.inner.state.subscribe()
    }

    /// Mark the collection stale and refetch it.
    ///
    /// The refetch runs on its own task whether or not the returned handle is
    /// awaited. Calling this while a refetch is pending returns that refetch,
    /// which fetches again if its request was already sent.
    pub fn invalidate(&self) -> Refetch {
        if self.inner.closed.load(Ordering::Acquire) {
            return future::ready(Ok(())).boxed().shared();
        }

        let mut flight = self.inner.lock_flight();
        flight.generation += 1;
        if let Some(pending) = flight.pending.as_ref() {
            tracing::debug!("Collection refetch already in flight, joining it");
            return pending.clone();
        }

        self.inner.state.send_modify(|state| state.fetching = true);
        let inner = Arc::clone(&self.inner);
        let refetch = async move { inner.refetch().await }.boxed().shared();
        flight.pending = Some(refetch.clone());
        drop(flight);

        tokio::spawn(refetch.clone());
        refetch
    }

    /// Fetch when nothing was loaded yet or the last fetch is older than the stale time
    pub async fn ensure_fresh(&self) -> AppResult<()> {
        if self.is_stale() {
            self.invalidate().await
        } else {
            Ok(())
        }
    }

    pub fn stale_time(&self) -> Duration {
        self.inner.stale_time
    }

    pub fn is_stale(&self) -> bool {
        match self.inner.state.borrow().fetched_at {
            Some(at) => at.elapsed() >= self.inner.stale_time,
            None => true,
        }
    }

    /// Wait for the in-flight refetch, if any
    pub async fn settled(&self) {
        let pending = self.inner.lock_flight().pending.clone();
        if let Some(refetch) = pending {
            let _ = refetch.await;
        }
    }

    /// Detach the cache from its view; later fetch results are discarded
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
        tracing::debug!("Collection cache closed");
    }
}

impl Inner {
    fn lock_flight(&self) -> MutexGuard<'_, Flight> {
        self.flight.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn refetch(self: Arc<Self>) -> AppResult<()> {
        let (result, _flight) = loop {
            let generation = self.lock_flight().generation;
            tracing::debug!("Refetching book collection");
            let result = self.repository.list_all().await;

            let mut flight = self.lock_flight();
            if flight.generation == generation {
                flight.pending = None;
                break (result, flight);
            }
            tracing::debug!("Collection invalidated during refetch, fetching again");
        };

        if self.closed.load(Ordering::Acquire) {
            tracing::debug!("Collection cache closed, ignoring refetch result");
            return result.map(|_| ());
        }

        match result {
            Ok(books) => {
                tracing::info!("Loaded {} books", books.len());
                self.state.send_modify(|state| {
                    state.books = Arc::new(books);
                    state.loaded = true;
                    state.fetching = false;
                    state.error = None;
                    state.fetched_at = Some(Instant::now());
                });
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Failed to load books: {}", e);
                self.state.send_modify(|state| {
                    state.fetching = false;
                    state.error = Some(e.clone());
                });
                Err(e)
            }
        }
    }
}
