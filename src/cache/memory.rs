//! Process-local [`ExternalCache`] backed by moka.

use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;

use crate::error::CacheError;
use crate::traits::ExternalCache;

/// Bounded LRU + TTL byte cache.
///
/// Stands in for a shared cache in single-instance deployments and tests.
/// Default capacity: 100,000 entries; default TTL: 24 hours.
pub struct MemoryCache {
    entries: Cache<String, Vec<u8>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::with_limits(100_000, Duration::from_secs(24 * 60 * 60))
    }

    pub fn with_limits(max_entries: u64, ttl: Duration) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();
        Self { entries }
    }

    pub async fn invalidate(&self, key: &str) {
        self.entries.invalidate(key).await;
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExternalCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(self.entries.get(key).await)
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), CacheError> {
        self.entries.insert(key.to_string(), value).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get() {
        let cache = MemoryCache::new();
        assert_eq!(cache.get("k").await, Ok(None));
        cache.put("k", b"v".to_vec()).await.unwrap();
        assert_eq!(cache.get("k").await, Ok(Some(b"v".to_vec())));
        cache.invalidate("k").await;
        assert_eq!(cache.get("k").await, Ok(None));
    }
}
