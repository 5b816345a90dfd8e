//! Construction-time configuration for a cache instance.

use std::time::Duration;

/// Default freshness window for cached results.
const DEFAULT_EXPIRE: Duration = Duration::from_secs(5 * 60);

/// Default interval between background sweep passes.
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Configuration for a [`RequestCache`](crate::RequestCache) or
/// [`CachedFetcher`](crate::CachedFetcher). All fields are fixed at
/// construction time; there is no runtime mutation.
#[derive(Debug, Clone)]
pub struct CacheOptions {
    /// How long a resolved result is considered fully fresh.
    pub expire_duration: Duration,
    /// When enabled, expired-but-not-too-old results are served immediately
    /// while a background refresh updates the cache.
    pub stale_while_revalidate: bool,
    /// Outer bound past which data is too old to serve even as stale.
    /// Defaults to `expire_duration`; only meaningful when
    /// `stale_while_revalidate` is enabled.
    pub stale_threshold: Option<Duration>,
    /// How often the background sweep evicts over-age entries.
    pub sweep_interval: Duration,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            expire_duration: DEFAULT_EXPIRE,
            stale_while_revalidate: false,
            stale_threshold: None,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl CacheOptions {
    /// Sets the freshness window for cached results.
    pub fn with_expire_duration(mut self, expire_duration: Duration) -> Self {
        self.expire_duration = expire_duration;
        self
    }

    /// Enables or disables stale-while-revalidate.
    pub fn with_stale_while_revalidate(mut self, enabled: bool) -> Self {
        self.stale_while_revalidate = enabled;
        self
    }

    /// Sets the outer bound past which data is no longer servable as stale.
    pub fn with_stale_threshold(mut self, stale_threshold: Duration) -> Self {
        self.stale_threshold = Some(stale_threshold);
        self
    }

    /// Sets the interval between background sweep passes.
    pub fn with_sweep_interval(mut self, sweep_interval: Duration) -> Self {
        self.sweep_interval = sweep_interval;
        self
    }

    /// Reads options from `REQUEST_CACHE_*` environment variables, falling
    /// back to the defaults for anything unset or unparsable.
    ///
    /// Recognized variables: `REQUEST_CACHE_EXPIRE_MS`,
    /// `REQUEST_CACHE_STALE_MS`, `REQUEST_CACHE_SWEEP_MS`,
    /// `REQUEST_CACHE_SWR` (`1`/`true` to enable).
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            expire_duration: Duration::from_millis(env_u64(
                "REQUEST_CACHE_EXPIRE_MS",
                defaults.expire_duration.as_millis() as u64,
            )),
            stale_while_revalidate: env_bool("REQUEST_CACHE_SWR", false),
            stale_threshold: std::env::var("REQUEST_CACHE_STALE_MS")
                .ok()
                .and_then(|val| val.parse::<u64>().ok())
                .map(Duration::from_millis),
            sweep_interval: Duration::from_millis(env_u64(
                "REQUEST_CACHE_SWEEP_MS",
                defaults.sweep_interval.as_millis() as u64,
            )),
        }
    }

    /// The age past which an entry is no longer servable at all.
    ///
    /// Without stale-while-revalidate this is `expire_duration`. With it,
    /// this is `stale_threshold`, clamped to never fall below
    /// `expire_duration`.
    pub(crate) fn retention_bound(&self) -> Duration {
        if self.stale_while_revalidate {
            self.stale_threshold
                .unwrap_or(self.expire_duration)
                .max(self.expire_duration)
        } else {
            self.expire_duration
        }
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|val| val.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|val| matches!(val.as_str(), "1" | "true" | "TRUE"))
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let opts = CacheOptions::default();
        assert_eq!(opts.expire_duration, Duration::from_secs(300));
        assert!(!opts.stale_while_revalidate);
        assert_eq!(opts.stale_threshold, None);
        assert_eq!(opts.sweep_interval, Duration::from_secs(60));
    }

    #[test]
    fn retention_without_swr_ignores_threshold() {
        let opts = CacheOptions::default()
            .with_expire_duration(Duration::from_secs(10))
            .with_stale_threshold(Duration::from_secs(60));
        assert_eq!(opts.retention_bound(), Duration::from_secs(10));
    }

    #[test]
    fn retention_with_swr_uses_threshold() {
        let opts = CacheOptions::default()
            .with_expire_duration(Duration::from_secs(10))
            .with_stale_while_revalidate(true)
            .with_stale_threshold(Duration::from_secs(60));
        assert_eq!(opts.retention_bound(), Duration::from_secs(60));
    }

    #[test]
    fn retention_clamps_threshold_to_expire() {
        // A threshold below the freshness window would make fresh data
        // unservable; clamp it up instead.
        let opts = CacheOptions::default()
            .with_expire_duration(Duration::from_secs(60))
            .with_stale_while_revalidate(true)
            .with_stale_threshold(Duration::from_secs(10));
        assert_eq!(opts.retention_bound(), Duration::from_secs(60));
    }

    #[test]
    fn retention_with_swr_defaults_to_expire() {
        let opts = CacheOptions::default()
            .with_expire_duration(Duration::from_secs(30))
            .with_stale_while_revalidate(true);
        assert_eq!(opts.retention_bound(), Duration::from_secs(30));
    }
}
