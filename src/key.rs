//! Default cache-key derivation from call arguments.

use std::fmt::Debug;

use serde::Serialize;

/// Derives a cache key from a fetcher's arguments.
///
/// Uses the JSON serialization of the arguments, which is stable across calls
/// for the same logical value. If serialization fails (e.g. non-finite floats
/// or map keys JSON cannot represent), falls back to the `Debug` rendering.
/// The fallback can produce over-broad keys for types whose `Debug` output
/// elides distinguishing detail; callers with such argument types should
/// supply an explicit key function instead (see
/// [`CachedFetcher::with_key_fn`](crate::CachedFetcher::with_key_fn)).
pub fn default_cache_key<A>(args: &A) -> String
where
    A: Serialize + Debug,
{
    match serde_json::to_string(args) {
        Ok(key) => key,
        Err(err) => {
            tracing::trace!(error = %err, "cache key serialization failed, using Debug fallback");
            format!("{args:?}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Serialize)]
    struct ProviderQuery {
        zip: String,
        category: Option<String>,
    }

    #[test]
    fn same_arguments_same_key() {
        let a = ProviderQuery {
            zip: "94103".into(),
            category: Some("plumbing".into()),
        };
        let b = ProviderQuery {
            zip: "94103".into(),
            category: Some("plumbing".into()),
        };
        assert_eq!(default_cache_key(&a), default_cache_key(&b));
    }

    #[test]
    fn different_arguments_different_keys() {
        let a = ProviderQuery {
            zip: "94103".into(),
            category: None,
        };
        let b = ProviderQuery {
            zip: "10001".into(),
            category: None,
        };
        assert_ne!(default_cache_key(&a), default_cache_key(&b));
    }

    #[test]
    fn tuple_arguments_serialize() {
        let key = default_cache_key(&("providers", 42));
        assert_eq!(key, r#"["providers",42]"#);
    }

    #[test]
    fn unserializable_arguments_fall_back_to_debug() {
        // JSON has no representation for non-finite floats, so serialization
        // fails and the Debug rendering is used instead.
        let key = default_cache_key(&f64::NAN);
        assert_eq!(key, "NaN");
    }
}
