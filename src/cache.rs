//! Time-bounded snapshots of remote state.

use std::future::Future;
use std::time::Duration;

use crate::errors::Error;
use crate::runtime::{Instant, Mutex};

type Result<T> = std::result::Result<T, Error>;

/// Shared behavior of remote-backed objects (lights, groups).
pub trait CachedEntity {
    type Snapshot: Clone;

    /// Returns the cached snapshot, refetching it when it is at least the TTL
    /// old or when `force` is set.
    fn refresh(&self, force: bool) -> impl Future<Output = Result<Self::Snapshot>> + Send;

    /// Marks the snapshot as expired without any I/O, so the next read is live.
    fn force_refresh(&self) -> impl Future<Output = ()> + Send;
}

/// A snapshot and the time it was fetched.
#[derive(Debug, Clone)]
pub(crate) struct CacheEnvelope<T> {
    snapshot: T,
    fetched_at: Option<Instant>,
    ttl: Duration,
}

impl<T: Clone> CacheEnvelope<T> {
    /// Wraps a snapshot fetched just now.
    pub fn fresh(snapshot: T, ttl: Duration) -> Self {
        CacheEnvelope {
            snapshot,
            fetched_at: Some(Instant::now()),
            ttl,
        }
    }

    pub fn is_stale(&self) -> bool {
        self.fetched_at.is_none_or(|at| at.elapsed() >= self.ttl)
    }

    pub fn invalidate(&mut self) {
        self.fetched_at = None;
    }

    /// Replaces the whole snapshot.
    pub fn store(&mut self, snapshot: T) {
        self.snapshot = snapshot;
        self.fetched_at = Some(Instant::now());
    }

    pub fn snapshot(&self) -> &T {
        &self.snapshot
    }
}

/// Returns the envelope's snapshot, calling `fetch` first if it is stale.
///
/// At most one fetch happens per call; a failed fetch leaves the envelope stale.
pub(crate) async fn read_through<T, F, Fut>(cache: &Mutex<CacheEnvelope<T>>, fetch: F) -> Result<T>
where
    T: Clone,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut envelope = cache.lock().await;
    if envelope.is_stale() {
        let snapshot = fetch().await?;
        envelope.store(snapshot);
    }
    Ok(envelope.snapshot().clone())
}
