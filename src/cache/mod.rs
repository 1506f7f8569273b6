//! Caching subsystem.
//!
//! Three read-through caches, each coalescing concurrent misses per key:
//!
//! - [`ApiKeyResolver`]: bearer token → [`EnvironmentApiKey`](crate::types::EnvironmentApiKey).
//!   In-process moka tier, then the shared [`ExternalCache`] tier, then the
//!   account service.
//!
//! - [`FeatureCatalog`]: environment → servable features. Shared tier, then
//!   a paginated listing from the feature service.
//!
//! - [`SegmentUsersCache`]: (environment, segment) → membership snapshot.
//!   Shared tier, then the feature service.
//!
//! Cache entries are advisory: a read failure counts as a miss and a
//! write-back failure is logged, never returned. Concurrent writers simply
//! overwrite each other.
//!
//! Two [`ExternalCache`] backends ship with the crate: [`MemoryCache`]
//! (process-local, the default) and `RedisCache` (feature `redis`).

mod api_key;
mod features;
mod memory;
#[cfg(feature = "redis")]
mod redis;
mod segments;

use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;

pub use api_key::ApiKeyResolver;
pub use features::{FeatureCatalog, LIST_PAGE_SIZE};
pub use memory::MemoryCache;
#[cfg(feature = "redis")]
pub use redis::RedisCache;
pub use segments::SegmentUsersCache;

use crate::error::CacheError;
use crate::traits::ExternalCache;

/// Configuration for the gateway's caches.
///
/// ```rust
/// # use heimdall::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .api_key_max_entries(50_000)
///     .api_key_ttl(Duration::from_secs(60));
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of API keys held in process. Default: 10,000.
    pub api_key_max_entries: u64,
    /// Time-to-live of in-process API keys. Default: 5 minutes.
    pub api_key_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            api_key_max_entries: 10_000,
            api_key_ttl: Duration::from_secs(5 * 60),
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn api_key_max_entries(mut self, n: u64) -> Self {
        self.api_key_max_entries = n;
        self
    }

    pub fn api_key_ttl(mut self, ttl: Duration) -> Self {
        self.api_key_ttl = ttl;
        self
    }
}

// Shared-tier keys. Each entity type has its own prefix so keys of
// unrelated entities cannot collide.

pub(crate) fn api_key_key(token: &str) -> String {
    format!("api_key:{token}")
}

pub(crate) fn features_key(environment_id: &str) -> String {
    format!("features:{environment_id}")
}

pub(crate) fn segment_users_key(environment_id: &str, segment_id: &str) -> String {
    format!("segment_users:{}", environment_scoped(environment_id, segment_id))
}

/// `environment_id:id`, with the environment id length-prefixed so ids that
/// contain `:` cannot be split two ways.
pub(crate) fn environment_scoped(environment_id: &str, id: &str) -> String {
    format!("{}:{environment_id}:{id}", environment_id.len())
}

pub(crate) async fn get_json<T: DeserializeOwned>(
    cache: &dyn ExternalCache,
    key: &str,
) -> Result<Option<T>, CacheError> {
    match cache.get(key).await? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

pub(crate) async fn put_json<T: Serialize>(
    cache: &dyn ExternalCache,
    key: &str,
    value: &T,
) -> Result<(), CacheError> {
    let bytes = serde_json::to_vec(value)?;
    cache.put(key, bytes).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced_per_entity() {
        assert_ne!(features_key("env"), segment_users_key("env", ""));
        assert_ne!(api_key_key("env"), features_key("env"));
        assert_eq!(segment_users_key("e1", "s1"), "segment_users:2:e1:s1");
    }

    #[test]
    fn colons_in_ids_do_not_collide() {
        assert_ne!(segment_users_key("a:b", "c"), segment_users_key("a", "b:c"));
        assert_ne!(environment_scoped("a:b", "c"), environment_scoped("a", "b:c"));
        assert_ne!(environment_scoped("", "1:a:"), environment_scoped("1:a", ""));
    }
}
