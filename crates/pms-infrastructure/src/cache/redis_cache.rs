//! Redis cache backed by a deadpool connection pool

use async_trait::async_trait;
use deadpool_redis::redis::cmd;
use deadpool_redis::{Config, Connection, Pool, PoolConfig, Runtime};
use tracing::{debug, info};

use pms_core::cache::{CacheError, CacheStore};
use pms_shared::config::RedisSettings;

const SCAN_BATCH: usize = 200;

pub struct RedisCache {
    pool: Pool,
}

impl RedisCache {
    pub fn new(settings: &RedisSettings) -> Result<Self, CacheError> {
        let mut cfg = Config::from_url(settings.url.clone());
        cfg.pool = Some(PoolConfig::new(settings.max_connections));
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| CacheError::Connection(e.to_string()))?;
        info!("Redis pool created (max {} connections)", settings.max_connections);
        Ok(Self { pool })
    }

    async fn conn(&self) -> Result<Connection, CacheError> {
        self.pool
            .get()
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))
    }
}

fn command_error(e: deadpool_redis::redis::RedisError) -> CacheError {
    CacheError::Command(e.to_string())
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn().await?;
        cmd("GET")
            .arg(key)
            .query_async::<Option<String>>(&mut conn)
            .await
            .map_err(command_error)
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), CacheError> {
        let mut conn = self.conn().await?;
        cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl_secs.max(1))
            .query_async::<()>(&mut conn)
            .await
            .map_err(command_error)
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn().await?;
        cmd("DEL")
            .arg(key)
            .query_async::<i64>(&mut conn)
            .await
            .map_err(command_error)?;
        Ok(())
    }

    /// SCAN + DEL; never blocks the server with KEYS
    async fn delete_by_pattern(&self, pattern: &str) -> Result<u64, CacheError> {
        let mut conn = self.conn().await?;
        let mut cursor: u64 = 0;
        let mut deleted: u64 = 0;

        loop {
            let (next, keys): (u64, Vec<String>) = cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(command_error)?;

            if !keys.is_empty() {
                let removed: i64 = cmd("DEL")
                    .arg(&keys)
                    .query_async(&mut conn)
                    .await
                    .map_err(command_error)?;
                deleted += removed.max(0) as u64;
            }

            cursor = next;
            if cursor == 0 {
                break;
            }
        }

        debug!(pattern, deleted, "cache pattern invalidated");
        Ok(deleted)
    }
}
