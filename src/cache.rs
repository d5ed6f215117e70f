//! Short-TTL settings cache
//!
//! Pricing settings (hourly rate, setup fee, shipping regions) are fetched
//! from a remote configuration source. A multi-item order would otherwise
//! refetch them once per item, so callers hold a [`TtlCache`] and refresh
//! through it. Entries are read-only snapshots replaced wholesale on
//! refresh, never mutated in place; the cache is an explicit injected
//! value, not ambient global state.

use crate::error::Result;
use parking_lot::Mutex;
use std::time::{Duration, Instant};
use tracing::warn;

/// Default time-to-live for cached settings.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// A single-value cache holding `(value, fetched_at)`.
#[derive(Debug)]
pub struct TtlCache<T> {
    ttl: Duration,
    entry: Mutex<Option<(T, Instant)>>,
}

impl<T: Clone> TtlCache<T> {
    /// Create an empty cache with the given time-to-live.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entry: Mutex::new(None),
        }
    }

    /// The value, if present and unexpired.
    pub fn get(&self) -> Option<T> {
        let guard = self.entry.lock();
        guard
            .as_ref()
            .filter(|(_, fetched_at)| fetched_at.elapsed() < self.ttl)
            .map(|(value, _)| value.clone())
    }

    /// Return the cached value, fetching a fresh snapshot if absent or
    /// expired. Guarded check-then-fetch: the lock is held across the
    /// fetch so concurrent callers refresh once.
    pub fn get_or_refresh(&self, fetch: impl FnOnce() -> T) -> T {
        let mut guard = self.entry.lock();
        if let Some((value, fetched_at)) = guard.as_ref()
            && fetched_at.elapsed() < self.ttl
        {
            return value.clone();
        }
        let value = fetch();
        *guard = Some((value.clone(), Instant::now()));
        value
    }

    /// Fallible variant of [`get_or_refresh`](Self::get_or_refresh).
    ///
    /// When the fetch fails but an earlier snapshot exists (even an
    /// expired one), the stale snapshot keeps serving and the failure is
    /// logged; the error only propagates when there is nothing to serve.
    pub fn try_get_or_refresh(&self, fetch: impl FnOnce() -> Result<T>) -> Result<T> {
        let mut guard = self.entry.lock();
        if let Some((value, fetched_at)) = guard.as_ref()
            && fetched_at.elapsed() < self.ttl
        {
            return Ok(value.clone());
        }
        match fetch() {
            Ok(value) => {
                *guard = Some((value.clone(), Instant::now()));
                Ok(value)
            }
            Err(err) => match guard.as_ref() {
                Some((value, _)) => {
                    warn!(error = %err, "settings refresh failed, serving stale snapshot");
                    Ok(value.clone())
                }
                None => Err(err),
            },
        }
    }

    /// Drop the cached snapshot, forcing the next read to fetch.
    pub fn invalidate(&self) {
        *self.entry.lock() = None;
    }
}

impl<T: Clone> Default for TtlCache<T> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_fetches_once_within_ttl() {
        let cache = TtlCache::new(Duration::from_secs(60));
        let mut calls = 0;
        for _ in 0..3 {
            let value = cache.get_or_refresh(|| {
                calls += 1;
                42
            });
            assert_eq!(value, 42);
        }
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_zero_ttl_always_refreshes() {
        let cache = TtlCache::new(Duration::ZERO);
        let mut calls = 0;
        for _ in 0..3 {
            cache.get_or_refresh(|| {
                calls += 1;
                calls
            });
        }
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_invalidate_forces_fetch() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.get_or_refresh(|| 1);
        cache.invalidate();
        assert_eq!(cache.get(), None);
        assert_eq!(cache.get_or_refresh(|| 2), 2);
    }

    #[test]
    fn test_failed_refresh_serves_stale() {
        let cache = TtlCache::new(Duration::ZERO);
        cache.get_or_refresh(|| 7);
        let value = cache
            .try_get_or_refresh(|| Err(Error::ParseError("source down".to_string())))
            .unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn test_failed_refresh_with_empty_cache_errors() {
        let cache: TtlCache<i32> = TtlCache::new(Duration::from_secs(60));
        let err = cache
            .try_get_or_refresh(|| Err(Error::ParseError("source down".to_string())))
            .unwrap_err();
        assert!(matches!(err, Error::ParseError(_)));
    }
}
