//! Cache port and cache-aside policy

pub mod cache_aside;
pub mod keys;

use async_trait::async_trait;
use thiserror::Error;

pub use cache_aside::{CacheAside, CacheTtl};

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache connection error: {0}")]
    Connection(String),

    #[error("Cache command error: {0}")]
    Command(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Delete every key matching a glob-style pattern (`prefix:*`)
    async fn delete_by_pattern(&self, pattern: &str) -> Result<u64, CacheError>;
}

/// Cache used when caching is disabled; every read misses
pub struct NoopCache;

#[async_trait]
impl CacheStore for NoopCache {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str, _ttl_secs: u64) -> Result<(), CacheError> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        Ok(())
    }

    async fn delete_by_pattern(&self, _pattern: &str) -> Result<u64, CacheError> {
        Ok(0)
    }
}
