//! Atomic counters tracking cache outcomes.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters recording how calls through the cache were served.
///
/// All counters are relaxed; they are observability aids, not synchronization.
#[derive(Debug, Default)]
pub struct CacheStats {
    pub(crate) fresh_hits: AtomicU64,
    pub(crate) stale_hits: AtomicU64,
    pub(crate) coalesced: AtomicU64,
    pub(crate) misses: AtomicU64,
    pub(crate) refreshes: AtomicU64,
    pub(crate) refresh_failures: AtomicU64,
}

impl CacheStats {
    pub(crate) fn record_fresh_hit(&self) {
        self.fresh_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_stale_hit(&self) {
        self.stale_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_coalesced(&self) {
        self.coalesced.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_refresh(&self) {
        self.refreshes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_refresh_failure(&self) {
        self.refresh_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot the current counters.
    pub fn summary(&self) -> StatsSummary {
        StatsSummary {
            fresh_hits: self.fresh_hits.load(Ordering::Relaxed),
            stale_hits: self.stale_hits.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            refreshes: self.refreshes.load(Ordering::Relaxed),
            refresh_failures: self.refresh_failures.load(Ordering::Relaxed),
        }
    }
}

/// Immutable snapshot of [`CacheStats`] counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsSummary {
    /// Calls served from a value younger than the freshness window.
    pub fresh_hits: u64,
    /// Calls served a stale value while a refresh ran in the background.
    pub stale_hits: u64,
    /// Calls that joined an already in-flight fetch instead of starting one.
    pub coalesced: u64,
    /// Calls that started a new fetch.
    pub misses: u64,
    /// Background refreshes started under stale-while-revalidate.
    pub refreshes: u64,
    /// Background refreshes that failed (absorbed, never caller-visible).
    pub refresh_failures: u64,
}
