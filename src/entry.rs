//! Internal per-key cache state.

use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, Shared};
use tokio::time::Instant;

use crate::options::CacheOptions;

/// A deduplicated fetch that every concurrent caller for one key awaits.
///
/// The error side is `Arc`-wrapped so the shared future's output is `Clone`.
pub(crate) type SharedFetch<T, E> = Shared<BoxFuture<'static, Result<T, Arc<E>>>>;

/// A successfully resolved value and the time it was stored.
#[derive(Debug, Clone)]
pub(crate) struct CachedValue<T> {
    pub(crate) value: T,
    pub(crate) stored_at: Instant,
}

impl<T> CachedValue<T> {
    pub(crate) fn new(value: T) -> Self {
        Self {
            value,
            stored_at: Instant::now(),
        }
    }

    pub(crate) fn age(&self) -> Duration {
        self.stored_at.elapsed()
    }

    /// Classifies this value against the configured freshness windows.
    pub(crate) fn freshness(&self, options: &CacheOptions) -> Freshness {
        let age = self.age();
        if age < options.expire_duration {
            Freshness::Fresh
        } else if options.stale_while_revalidate && age < options.retention_bound() {
            Freshness::Stale
        } else {
            Freshness::Expired
        }
    }
}

/// How usable a cached value still is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Freshness {
    /// Younger than `expire_duration`; servable without any fetch.
    Fresh,
    /// Past `expire_duration` but within the stale threshold; servable while
    /// a background refresh runs. Only occurs under stale-while-revalidate.
    Stale,
    /// Too old to serve; must be evicted before the next fetch.
    Expired,
}

/// One cache slot: the last resolved value (if any) and the in-flight fetch
/// for the key (if one is outstanding).
///
/// The dedup invariant lives here: while `in_flight` is `Some`, no new fetch
/// is started for the key.
pub(crate) struct Entry<T, E> {
    pub(crate) value: Option<CachedValue<T>>,
    pub(crate) in_flight: Option<SharedFetch<T, E>>,
}

impl<T, E> Default for Entry<T, E> {
    fn default() -> Self {
        Self {
            value: None,
            in_flight: None,
        }
    }
}

impl<T, E> Entry<T, E> {
    /// Whether the sweep may remove this entry: nothing outstanding and no
    /// value young enough to serve again.
    pub(crate) fn is_evictable(&self, options: &CacheOptions) -> bool {
        if self.in_flight.is_some() {
            return false;
        }
        match &self.value {
            Some(cached) => cached.age() >= options.retention_bound(),
            None => true,
        }
    }
}
