//! Caching wrapper around a single async fetcher function.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Serialize;

use crate::cache::RequestCache;
use crate::error::FetchError;
use crate::key::default_cache_key;
use crate::options::CacheOptions;
use crate::stats::StatsSummary;

type Fetcher<A, T, E> = Arc<dyn Fn(A) -> BoxFuture<'static, Result<T, E>> + Send + Sync>;
type KeyFn<A> = Arc<dyn Fn(&A) -> String + Send + Sync>;

/// A fetcher function wrapped with deduplication, TTL caching, and optional
/// stale-while-revalidate.
///
/// Each instance owns its cache; two wrapped fetchers never share entries.
/// The fetcher itself stays an opaque collaborator: the wrapper has no idea
/// whether it performs HTTP, reads a database, or computes locally, and it
/// never retries on the caller's behalf.
pub struct CachedFetcher<A, T, E> {
    fetcher: Fetcher<A, T, E>,
    key_fn: KeyFn<A>,
    cache: RequestCache<T, E>,
}

impl<A, T, E> CachedFetcher<A, T, E>
where
    T: Clone + Send + Sync + 'static,
    E: fmt::Display + Send + Sync + 'static,
{
    /// Wraps `fetcher` with default options and default key derivation
    /// (JSON serialization of the arguments).
    pub fn new<F, Fut>(fetcher: F) -> Self
    where
        A: Serialize + fmt::Debug + 'static,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        Self::with_options(fetcher, CacheOptions::default())
    }

    /// Wraps `fetcher` with the given options and default key derivation.
    pub fn with_options<F, Fut>(fetcher: F, options: CacheOptions) -> Self
    where
        A: Serialize + fmt::Debug + 'static,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        Self::with_key_fn(fetcher, default_cache_key, options)
    }

    /// Wraps `fetcher` with an explicit key function.
    ///
    /// Use this when the arguments have multiple logical shapes and need
    /// semantically meaningful keys (e.g. prefixed by resource type), or when
    /// they are not serializable.
    pub fn with_key_fn<F, Fut, K>(fetcher: F, key_fn: K, options: CacheOptions) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        K: Fn(&A) -> String + Send + Sync + 'static,
    {
        Self {
            fetcher: Arc::new(move |args| fetcher(args).boxed()),
            key_fn: Arc::new(key_fn),
            cache: RequestCache::new(options),
        }
    }

    /// Installs a callback observing background-refresh failures; see
    /// [`RequestCache::with_refresh_error_hook`].
    pub fn on_refresh_error<H>(mut self, hook: H) -> Self
    where
        H: Fn(&str, &E) + Send + Sync + 'static,
    {
        self.cache = self.cache.with_refresh_error_hook(hook);
        self
    }

    /// Calls the wrapped fetcher through the cache.
    ///
    /// Resolves or rejects exactly as the fetcher would, except that cache
    /// and stale hits resolve without invoking it, and concurrent calls with
    /// the same derived key share one underlying invocation.
    pub async fn call(&self, args: A) -> Result<T, FetchError<E>> {
        let key = (self.key_fn)(&args);
        let fetcher = Arc::clone(&self.fetcher);
        // The fetcher only runs if the cache decides to fetch.
        self.cache.get_or_fetch(key, move || fetcher(args)).await
    }

    /// Drops the cached entry for the given arguments, if any.
    pub fn invalidate(&self, args: &A) {
        self.cache.invalidate(&(self.key_fn)(args));
    }

    /// Drops all cached entries.
    pub fn clear(&self) {
        self.cache.clear();
    }

    /// Snapshot of the cache's outcome counters.
    pub fn stats(&self) -> StatsSummary {
        self.cache.stats()
    }
}

impl<A, T, E> fmt::Debug for CachedFetcher<A, T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedFetcher")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn test_options() -> CacheOptions {
        CacheOptions::default()
            .with_expire_duration(Duration::from_secs(60))
            .with_sweep_interval(Duration::ZERO)
    }

    fn counting(counter: &Arc<AtomicUsize>) -> impl Fn(String) -> BoxFuture<'static, Result<String, String>> {
        let counter = Arc::clone(counter);
        move |zip: String| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(format!("providers near {zip}"))
            }
            .boxed()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn repeat_arguments_use_the_cache() {
        let calls = Arc::new(AtomicUsize::new(0));
        let fetcher = CachedFetcher::with_options(counting(&calls), test_options());

        let first = fetcher.call("94103".to_string()).await.unwrap();
        let second = fetcher.call("94103".to_string()).await.unwrap();
        assert_eq!(first, "providers near 94103");
        assert_eq!(second, first);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn distinct_arguments_fetch_separately() {
        let calls = Arc::new(AtomicUsize::new(0));
        let fetcher = CachedFetcher::with_options(counting(&calls), test_options());

        fetcher.call("94103".to_string()).await.unwrap();
        fetcher.call("10001".to_string()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn custom_key_fn_controls_collisions() {
        let calls = Arc::new(AtomicUsize::new(0));
        // Key only on the zip prefix: nearby zips intentionally share entries.
        let fetcher = CachedFetcher::with_key_fn(
            counting(&calls),
            |zip: &String| format!("area:{}", &zip[..3]),
            test_options(),
        );

        let first = fetcher.call("94103".to_string()).await.unwrap();
        let second = fetcher.call("94110".to_string()).await.unwrap();
        assert_eq!(second, first);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn instances_never_share_state() {
        let calls = Arc::new(AtomicUsize::new(0));
        let a = CachedFetcher::with_options(counting(&calls), test_options());
        let b = CachedFetcher::with_options(counting(&calls), test_options());

        a.call("94103".to_string()).await.unwrap();
        b.call("94103".to_string()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn invalidate_forces_refetch() {
        let calls = Arc::new(AtomicUsize::new(0));
        let fetcher = CachedFetcher::with_options(counting(&calls), test_options());

        let args = "94103".to_string();
        fetcher.call(args.clone()).await.unwrap();
        fetcher.invalidate(&args);
        fetcher.call(args).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stats_are_per_instance() {
        let calls = Arc::new(AtomicUsize::new(0));
        let fetcher = CachedFetcher::with_options(counting(&calls), test_options());

        fetcher.call("94103".to_string()).await.unwrap();
        fetcher.call("94103".to_string()).await.unwrap();

        let stats = fetcher.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.fresh_hits, 1);
    }
}
