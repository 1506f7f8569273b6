//! Redis-backed [`ExternalCache`] shared by every gateway instance.

use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Config, Pool, Runtime};
use redis::AsyncCommands;

use crate::error::CacheError;
use crate::traits::ExternalCache;

/// Pooled redis client. Entries expire after `ttl`.
#[derive(Clone)]
pub struct RedisCache {
    pool: Pool,
    ttl: Duration,
}

impl RedisCache {
    pub fn new(url: &str, pool_max: usize, ttl: Duration) -> Result<Self, CacheError> {
        let mut cfg = Config::from_url(url);
        cfg.pool = Some(deadpool_redis::PoolConfig::new(pool_max));
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| CacheError::Backend(e.to_string()))?;
        Ok(Self { pool, ttl })
    }

    async fn connection(&self) -> Result<deadpool_redis::Connection, CacheError> {
        self.pool
            .get()
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))
    }
}

#[async_trait]
impl ExternalCache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.connection().await?;
        conn.get(key)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        conn.set_ex::<_, _, ()>(key, value, self.ttl.as_secs())
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))
    }
}
