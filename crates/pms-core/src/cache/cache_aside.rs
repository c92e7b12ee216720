//! Cache-aside policy.
//!
//! Reads try the cache first and fall back to the loader; writes invalidate.
//! The cache is never allowed to fail a request: read errors count as a miss
//! and write/delete errors are logged and dropped.

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use pms_shared::config::CacheSettings;

use super::keys;
use super::CacheStore;
use crate::error::DomainError;

#[derive(Debug, Clone, Copy)]
pub struct CacheTtl {
    pub list: u64,
    pub detail: u64,
    pub stats: u64,
}

impl From<&CacheSettings> for CacheTtl {
    fn from(settings: &CacheSettings) -> Self {
        Self {
            list: settings.list_ttl_secs,
            detail: settings.detail_ttl_secs,
            stats: settings.stats_ttl_secs,
        }
    }
}

impl Default for CacheTtl {
    fn default() -> Self {
        use pms_shared::constants::*;
        Self {
            list: LIST_CACHE_TTL_SECS,
            detail: DETAIL_CACHE_TTL_SECS,
            stats: STATS_CACHE_TTL_SECS,
        }
    }
}

#[derive(Clone)]
pub struct CacheAside {
    store: Arc<dyn CacheStore>,
    pub ttl: CacheTtl,
}

impl CacheAside {
    pub fn new(store: Arc<dyn CacheStore>, ttl: CacheTtl) -> Self {
        Self { store, ttl }
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        match self.store.get(key).await {
            Ok(Some(value)) => {
                debug!(key, "cache hit");
                Some(value)
            }
            Ok(None) => {
                debug!(key, "cache miss");
                None
            }
            Err(e) => {
                warn!(key, error = %e, "cache read failed, treating as miss");
                None
            }
        }
    }

    pub async fn put(&self, key: &str, value: &str, ttl_secs: u64) {
        if let Err(e) = self.store.set(key, value, ttl_secs).await {
            warn!(key, error = %e, "cache write failed");
        }
    }

    /// Cached value for `key`, or the loader's output stored with `ttl_secs`.
    /// Loader errors are returned and nothing is cached.
    pub async fn get_or_load<F, Fut>(
        &self,
        key: &str,
        ttl_secs: u64,
        load: F,
    ) -> Result<String, DomainError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, DomainError>>,
    {
        if let Some(hit) = self.get(key).await {
            return Ok(hit);
        }
        let value = load().await?;
        self.put(key, &value, ttl_secs).await;
        Ok(value)
    }

    /// Drop every list page of the collection, the document's detail entry
    /// and the owning tenant's stats.
    pub async fn invalidate(&self, collection: &str, id: Option<Uuid>, tenant_id: Uuid) {
        let pattern = keys::list_pattern(collection);
        if let Err(e) = self.store.delete_by_pattern(&pattern).await {
            warn!(pattern = %pattern, error = %e, "cache invalidation failed");
        }

        let mut keys_to_drop = vec![keys::stats_key(collection, tenant_id)];
        if let Some(id) = id {
            keys_to_drop.push(keys::detail_key(collection, id));
        }
        for key in keys_to_drop {
            if let Err(e) = self.store.delete(&key).await {
                warn!(key = %key, error = %e, "cache invalidation failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheError, MockCacheStore};
    use mockall::predicate::eq;

    fn aside(mock: MockCacheStore) -> CacheAside {
        CacheAside::new(Arc::new(mock), CacheTtl::default())
    }

    #[tokio::test]
    async fn test_hit_skips_loader() {
        let mut mock = MockCacheStore::new();
        mock.expect_get()
            .with(eq("units:detail:1"))
            .returning(|_| Ok(Some("cached".to_string())));
        mock.expect_set().never();

        let value = aside(mock)
            .get_or_load("units:detail:1", 300, || async {
                Err(DomainError::InternalError("loader ran on a hit".into()))
            })
            .await
            .unwrap();
        assert_eq!(value, "cached");
    }

    #[tokio::test]
    async fn test_miss_loads_and_stores_with_ttl() {
        let mut mock = MockCacheStore::new();
        mock.expect_get().returning(|_| Ok(None));
        mock.expect_set()
            .with(eq("k"), eq("fresh"), eq(3600))
            .times(1)
            .returning(|_, _, _| Ok(()));

        let value = aside(mock)
            .get_or_load("k", 3600, || async { Ok("fresh".to_string()) })
            .await
            .unwrap();
        assert_eq!(value, "fresh");
    }

    #[tokio::test]
    async fn test_cache_failures_do_not_fail_request() {
        let mut mock = MockCacheStore::new();
        mock.expect_get()
            .returning(|_| Err(CacheError::Connection("down".into())));
        mock.expect_set()
            .returning(|_, _, _| Err(CacheError::Connection("down".into())));

        let value = aside(mock)
            .get_or_load("k", 300, || async { Ok("fresh".to_string()) })
            .await
            .unwrap();
        assert_eq!(value, "fresh");
    }

    #[tokio::test]
    async fn test_loader_error_is_not_cached() {
        let mut mock = MockCacheStore::new();
        mock.expect_get().returning(|_| Ok(None));
        mock.expect_set().never();

        let result = aside(mock)
            .get_or_load("k", 300, || async { Err(DomainError::NotFound("Unit")) })
            .await;
        assert!(matches!(result, Err(DomainError::NotFound("Unit"))));
    }

    #[tokio::test]
    async fn test_invalidate_drops_list_detail_and_stats() {
        let id = Uuid::new_v4();
        let tenant = Uuid::new_v4();
        let mut mock = MockCacheStore::new();
        mock.expect_delete_by_pattern()
            .with(eq("units:list:*"))
            .times(1)
            .returning(|_| Ok(3));
        mock.expect_delete()
            .with(eq(format!("units:stats:{}", tenant)))
            .times(1)
            .returning(|_| Ok(()));
        mock.expect_delete()
            .with(eq(format!("units:detail:{}", id)))
            .times(1)
            .returning(|_| Ok(()));

        aside(mock).invalidate("units", Some(id), tenant).await;
    }
}
