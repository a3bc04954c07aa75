// TTL cache backing every resolver, to avoid redundant remote calls

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::errors::PipelineResult;

/// Expiration window shared by all cached entities. A configuration constant,
/// not a per-call parameter.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60 * 60);

struct CacheEntry<T> {
    value: T,
    expires_at: Instant,
}

/// Get-or-populate cache with a fixed expiration window.
///
/// Population is not de-duplicated across concurrent callers: two tasks
/// missing the same key both run their populate future and both write the
/// result (last write wins). The contract is "avoid redundant remote calls
/// within a TTL window", not exactly-once population. The lock is held only
/// across map operations, never across an await.
///
/// Capacity is unbounded; embedding applications can use [`TtlCache::clear`]
/// or [`TtlCache::invalidate`] as a manual pressure valve.
pub struct TtlCache<T> {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry<T>>>,
}

impl<T: Clone> TtlCache<T> {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return the live value under `key`, dropping it if expired.
    pub fn get(&self, key: &str) -> Option<T> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn insert(&self, key: &str, value: T) {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Return the cached value, or run `populate` and store its result.
    ///
    /// `Ok(None)` from `populate` (remote entity absent) is never retained as
    /// a negative entry: any stale entry is evicted and the next call runs
    /// `populate` again.
    pub async fn get_or_populate<F, Fut>(&self, key: &str, populate: F) -> PipelineResult<Option<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = PipelineResult<Option<T>>>,
    {
        if let Some(value) = self.get(key) {
            tracing::trace!("[cache] hit: {}", key);
            return Ok(Some(value));
        }

        tracing::trace!("[cache] miss: {}", key);
        match populate().await? {
            Some(value) => {
                self.insert(key, value.clone());
                Ok(Some(value))
            }
            None => {
                self.invalidate(key);
                Ok(None)
            }
        }
    }

    pub fn invalidate(&self, key: &str) {
        self.entries.lock().unwrap().remove(key);
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone> Default for TtlCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::errors::PipelineError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn second_lookup_within_ttl_does_not_repopulate() {
        let cache: TtlCache<String> = TtlCache::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let value = cache
                .get_or_populate("Video-https://example.com/watch?v=a", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(Some("hello".to_string()))
                })
                .await
                .unwrap();
            assert_eq!(value.as_deref(), Some("hello"));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn absent_result_is_not_retained() {
        let cache: TtlCache<String> = TtlCache::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let value = cache
                .get_or_populate("Video-missing", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(None)
                })
                .await
                .unwrap();
            assert!(value.is_none());
        }

        // No negative caching: every lookup retries
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn expired_entries_are_repopulated() {
        let cache: TtlCache<u32> = TtlCache::with_ttl(Duration::from_millis(20));
        let calls = AtomicUsize::new(0);

        let populate = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some(7u32))
        };

        assert_eq!(cache.get_or_populate("k", populate).await.unwrap(), Some(7));
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(cache.get_or_populate("k", populate).await.unwrap(), Some(7));

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn populate_errors_propagate_and_cache_nothing() {
        let cache: TtlCache<u32> = TtlCache::new();

        let result = cache
            .get_or_populate("k", || async {
                Err(PipelineError::TransferFailed("network down".into()))
            })
            .await;
        assert!(result.is_err());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn invalidate_and_clear_drop_entries() {
        let cache: TtlCache<u32> = TtlCache::new();
        cache
            .get_or_populate("a", || async { Ok(Some(1)) })
            .await
            .unwrap();
        cache
            .get_or_populate("b", || async { Ok(Some(2)) })
            .await
            .unwrap();
        assert_eq!(cache.len(), 2);

        cache.invalidate("a");
        assert!(cache.get("a").is_none());
        assert_eq!(cache.get("b"), Some(2));

        cache.clear();
        assert!(cache.is_empty());
    }
}
