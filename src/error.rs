//! The caller-visible error type.

use std::fmt;
use std::sync::Arc;

/// A failed fetch, as observed by callers of the cache.
///
/// The underlying fetcher error is kept behind an [`Arc`] so a single
/// rejection can be delivered to every caller that joined the deduplicated
/// in-flight fetch, without requiring the fetcher's error type to be `Clone`.
pub struct FetchError<E> {
    inner: Arc<E>,
}

impl<E> FetchError<E> {
    pub(crate) fn new(inner: Arc<E>) -> Self {
        Self { inner }
    }

    /// The underlying fetcher error.
    pub fn inner(&self) -> &E {
        &self.inner
    }

    /// Consumes the wrapper, returning the shared fetcher error.
    pub fn into_inner(self) -> Arc<E> {
        self.inner
    }
}

impl<E> Clone for FetchError<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: fmt::Debug> fmt::Debug for FetchError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FetchError").field(&self.inner).finish()
    }
}

impl<E: fmt::Display> fmt::Display for FetchError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "request failed: {}", self.inner)
    }
}

impl<E> std::error::Error for FetchError<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&*self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_cause() {
        let err = FetchError::new(Arc::new(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            "upstream timed out",
        )));
        assert_eq!(err.to_string(), "request failed: upstream timed out");
    }

    #[test]
    fn source_points_at_fetcher_error() {
        let err = FetchError::new(Arc::new(std::io::Error::new(
            std::io::ErrorKind::Other,
            "boom",
        )));
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "boom");
    }

    #[test]
    fn clones_share_the_same_error() {
        let err = FetchError::new(Arc::new("nope".to_string()));
        let other = err.clone();
        assert!(Arc::ptr_eq(&err.into_inner(), &other.into_inner()));
    }
}
