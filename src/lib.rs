//! Deduplicating TTL cache for async fetchers, with optional
//! stale-while-revalidate.
//!
//! Wraps any async function returning `Result<T, E>` so that:
//!
//! - concurrent calls with the same arguments share one underlying
//!   invocation (in-flight deduplication);
//! - completed results are reused for a configurable duration without
//!   re-invoking the fetcher;
//! - optionally, expired-but-not-too-old results are returned immediately
//!   while a background refresh updates the cache (stale-while-revalidate).
//!
//! The wrapped function is an opaque collaborator, typically an HTTP call;
//! the cache has no awareness of endpoints or payloads, defines no retry
//! policy, and keeps no state beyond its in-memory entry map.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use request_cache::{CacheOptions, CachedFetcher};
//!
//! async fn fetch_providers(zip: String) -> Result<String, reqwest::Error> {
//!     reqwest::get(format!("https://api.example.com/providers?zip={zip}"))
//!         .await?
//!         .text()
//!         .await
//! }
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let providers = CachedFetcher::with_options(
//!     fetch_providers,
//!     CacheOptions::default().with_expire_duration(Duration::from_secs(60)),
//! );
//!
//! // Repeats within the freshness window skip the network entirely, and
//! // concurrent calls for the same zip share a single request.
//! let body = providers.call("94103".to_string()).await?;
//! # let _ = body;
//! # Ok(())
//! # }
//! ```

pub mod cache;
mod entry;
pub mod error;
pub mod fetcher;
pub mod key;
pub mod options;
pub mod stats;

pub use cache::RequestCache;
pub use error::FetchError;
pub use fetcher::CachedFetcher;
pub use key::default_cache_key;
pub use options::CacheOptions;
pub use stats::{CacheStats, StatsSummary};
