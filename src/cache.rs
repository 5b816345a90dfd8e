//! Keyed request cache: in-flight deduplication, time-boxed result caching,
//! and optional stale-while-revalidate.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::task::JoinHandle;

use crate::entry::{CachedValue, Entry, Freshness, SharedFetch};
use crate::error::FetchError;
use crate::options::CacheOptions;
use crate::stats::{CacheStats, StatsSummary};

type RefreshErrorHook<E> = Arc<dyn Fn(&str, &E) + Send + Sync>;
type EntryMap<T, E> = DashMap<String, Entry<T, E>>;

/// Deduplicating TTL cache keyed by string.
///
/// One instance backs one wrapped fetcher (see
/// [`CachedFetcher`](crate::CachedFetcher)); instances never share entries.
/// Concurrent calls for the same key share a single underlying fetch via a
/// [`Shared`](futures::future::Shared) future that is installed before any
/// await point, so no caller can observe a cache-miss window and start a
/// duplicate.
///
/// A background sweep task, spawned on construction when a tokio runtime is
/// available, periodically evicts entries that have aged out and have no
/// outstanding fetch. The task is aborted when the cache is dropped.
pub struct RequestCache<T, E> {
    entries: Arc<EntryMap<T, E>>,
    options: CacheOptions,
    stats: Arc<CacheStats>,
    on_refresh_error: Option<RefreshErrorHook<E>>,
    sweeper: Option<JoinHandle<()>>,
}

/// How a single call will be served, decided atomically under the entry lock.
enum Action<T, E> {
    /// Fresh value, returned without any fetch.
    Hit(T),
    /// Stale value returned immediately; `Some` carries a newly installed
    /// background refresh to drive.
    StaleHit(T, Option<SharedFetch<T, E>>),
    /// Await a fetch another caller already started.
    Join(SharedFetch<T, E>),
    /// Await the fetch this call installed.
    Fetch(SharedFetch<T, E>),
}

impl<T, E> RequestCache<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: fmt::Display + Send + Sync + 'static,
{
    /// Creates a cache with the given options.
    ///
    /// When called inside a tokio runtime, this also starts the periodic
    /// sweep task; outside a runtime (or with a zero `sweep_interval`) the
    /// sweep is skipped and over-age entries are evicted lazily on access.
    pub fn new(options: CacheOptions) -> Self {
        let entries = Arc::new(DashMap::new());
        let sweeper = spawn_sweeper(&entries, &options);
        Self {
            entries,
            options,
            stats: Arc::new(CacheStats::default()),
            on_refresh_error: None,
            sweeper,
        }
    }

    /// Installs a callback invoked with the cache key and error whenever a
    /// background refresh fails. Failures are logged at `warn` either way;
    /// they are never surfaced to callers, who already received stale data.
    pub fn with_refresh_error_hook<H>(mut self, hook: H) -> Self
    where
        H: Fn(&str, &E) + Send + Sync + 'static,
    {
        self.on_refresh_error = Some(Arc::new(hook));
        self
    }

    /// Returns the value for `key`, fetching it with `fetch` only when no
    /// usable cached value or in-flight fetch exists.
    ///
    /// - A fresh value is returned without invoking `fetch`.
    /// - Under stale-while-revalidate, a stale value is returned immediately
    ///   and at most one background refresh is started for the key.
    /// - If a fetch for the key is already in flight, this call awaits it
    ///   instead of starting another.
    /// - Otherwise any over-age value is evicted, `fetch` is invoked, and its
    ///   result is cached. A failed fetch removes the entry so the next call
    ///   retries cleanly, and the error is delivered to every caller that
    ///   joined the fetch.
    pub async fn get_or_fetch<F>(&self, key: String, fetch: F) -> Result<T, FetchError<E>>
    where
        F: FnOnce() -> BoxFuture<'static, Result<T, E>>,
    {
        let action = {
            let mut guard = self.entries.entry(key.clone()).or_default();
            let slot = &mut *guard;
            let usable = slot
                .value
                .as_ref()
                .map(|cached| (cached.freshness(&self.options), cached.value.clone()));
            match usable {
                Some((Freshness::Fresh, value)) => Action::Hit(value),
                Some((Freshness::Stale, value)) => {
                    if slot.in_flight.is_some() {
                        // A refresh is already running for this key.
                        Action::StaleHit(value, None)
                    } else {
                        let shared = self.make_shared(&key, fetch());
                        slot.in_flight = Some(shared.clone());
                        Action::StaleHit(value, Some(shared))
                    }
                }
                // No value, or one past the retention bound.
                _ => {
                    if let Some(shared) = &slot.in_flight {
                        Action::Join(shared.clone())
                    } else {
                        // Evict anything past the retention bound before
                        // fetching anew.
                        slot.value = None;
                        let shared = self.make_shared(&key, fetch());
                        slot.in_flight = Some(shared.clone());
                        Action::Fetch(shared)
                    }
                }
            }
            // Guard drops here; nothing is held across an await.
        };

        match action {
            Action::Hit(value) => {
                self.stats.record_fresh_hit();
                tracing::trace!(key = %key, "fresh cache hit");
                Ok(value)
            }
            Action::StaleHit(value, refresh) => {
                self.stats.record_stale_hit();
                tracing::trace!(key = %key, "serving stale value");
                if let Some(shared) = refresh {
                    self.spawn_refresh(key, shared);
                }
                Ok(value)
            }
            Action::Join(shared) => {
                self.stats.record_coalesced();
                tracing::trace!(key = %key, "joining in-flight fetch");
                shared.await.map_err(FetchError::new)
            }
            Action::Fetch(shared) => {
                self.stats.record_miss();
                tracing::debug!(key = %key, "cache miss, fetching");
                shared.await.map_err(FetchError::new)
            }
        }
    }

    /// Wraps a fetch future so that settling it also settles the cache entry:
    /// success stores the value and clears the in-flight marker; failure
    /// clears the marker and removes the entry unless a stale value remains.
    ///
    /// The returned future is shared by every caller for the key and only
    /// runs its settle logic once, no matter how many callers await it.
    fn make_shared(
        &self,
        key: &str,
        fut: BoxFuture<'static, Result<T, E>>,
    ) -> SharedFetch<T, E> {
        let entries = Arc::clone(&self.entries);
        let key = key.to_string();
        async move {
            match fut.await {
                Ok(value) => {
                    if let Some(mut slot) = entries.get_mut(&key) {
                        slot.value = Some(CachedValue::new(value.clone()));
                        slot.in_flight = None;
                    }
                    Ok(value)
                }
                Err(err) => {
                    let keep_entry = match entries.get_mut(&key) {
                        Some(mut slot) => {
                            slot.in_flight = None;
                            slot.value.is_some()
                        }
                        None => true,
                    };
                    if !keep_entry {
                        entries.remove_if(&key, |_, slot| {
                            slot.value.is_none() && slot.in_flight.is_none()
                        });
                    }
                    Err(Arc::new(err))
                }
            }
        }
        .boxed()
        .shared()
    }

    /// Drives a background refresh to completion so it makes progress even
    /// with no caller awaiting it. A failed refresh leaves the stale value in
    /// place and is reported through the warn log and the optional hook.
    fn spawn_refresh(&self, key: String, shared: SharedFetch<T, E>) {
        self.stats.record_refresh();
        let stats = Arc::clone(&self.stats);
        let hook = self.on_refresh_error.clone();
        tokio::spawn(async move {
            if let Err(err) = shared.await {
                stats.record_refresh_failure();
                tracing::warn!(
                    key = %key,
                    error = %err,
                    "background refresh failed, keeping stale value"
                );
                if let Some(hook) = hook {
                    hook(&key, &err);
                }
            }
        });
    }

    /// Removes the entry for `key`, if any.
    pub fn invalidate(&self, key: &str) {
        self.entries.remove(key);
    }

    /// Removes all entries.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of entries currently held, including in-flight ones.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of the outcome counters.
    pub fn stats(&self) -> StatsSummary {
        self.stats.summary()
    }
}

impl<T, E> fmt::Debug for RequestCache<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestCache")
            .field("options", &self.options)
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl<T, E> Drop for RequestCache<T, E> {
    fn drop(&mut self) {
        if let Some(sweeper) = self.sweeper.take() {
            sweeper.abort();
        }
    }
}

/// Starts the recurring eviction task, if a runtime is available.
fn spawn_sweeper<T, E>(
    entries: &Arc<EntryMap<T, E>>,
    options: &CacheOptions,
) -> Option<JoinHandle<()>>
where
    T: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    if options.sweep_interval.is_zero() {
        return None;
    }
    let handle = tokio::runtime::Handle::try_current().ok()?;
    let entries = Arc::clone(entries);
    let options = options.clone();
    Some(handle.spawn(async move {
        let mut ticker = tokio::time::interval(options.sweep_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let before = entries.len();
            entries.retain(|_, entry| !entry.is_evictable(&options));
            let evicted = before.saturating_sub(entries.len());
            if evicted > 0 {
                tracing::debug!(evicted, "swept expired cache entries");
            }
        }
    }))
}
