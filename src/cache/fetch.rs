//! Tag-addressable fetch cache in front of a content store.

use std::sync::Arc;

use async_trait::async_trait;
use metrics::counter;
use serde_json::Value;
use tracing::{debug, info};

use crate::application::queries::ContentQuery;
use crate::application::repos::{ContentStore, StoreError, TagInvalidator};

use super::config::CacheConfig;
use super::keys::{CacheTag, FetchKey};
use super::registry::{EpochSnapshot, TagRegistry};
use super::store::{FetchStore, Lookup};

pub(crate) const METRIC_CACHE_HIT: &str = "blogfront_cache_hit_total";
pub(crate) const METRIC_CACHE_MISS: &str = "blogfront_cache_miss_total";
pub(crate) const METRIC_CACHE_EVICT: &str = "blogfront_cache_evict_total";
pub(crate) const METRIC_CACHE_INVALIDATED: &str = "blogfront_cache_invalidated_total";

/// Decorates a [`ContentStore`], serving repeated queries from memory until
/// one of the query's tags is invalidated.
pub struct CachedContentStore {
    inner: Arc<dyn ContentStore>,
    store: FetchStore,
    registry: TagRegistry,
    enabled: bool,
}

impl CachedContentStore {
    pub fn new(inner: Arc<dyn ContentStore>, config: &CacheConfig) -> Self {
        Self {
            inner,
            store: FetchStore::new(config),
            registry: TagRegistry::new(),
            enabled: config.enabled,
        }
    }

    /// Whether a result for `query` is currently held.
    #[cfg(test)]
    pub fn is_cached(&self, query: &ContentQuery) -> bool {
        self.store
            .contains(&FetchKey::new(query.groq(), &query.params()))
    }

    /// Number of held results.
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    fn remember(
        &self,
        key: FetchKey,
        query: &ContentQuery,
        value: Value,
        snapshot: &EpochSnapshot,
    ) {
        let stored = self.registry.insert_if_current(key, snapshot, || {
            let evicted = self.store.put(key, value);
            if evicted.is_some() {
                counter!(METRIC_CACHE_EVICT).increment(1);
            }
            evicted
        });
        if !stored {
            debug!(
                target = "cache::fetch",
                query = query.name(),
                "Discarded fetch result that raced with an invalidation"
            );
        }
    }
}

#[async_trait]
impl ContentStore for CachedContentStore {
    async fn fetch(&self, query: &ContentQuery) -> Result<Value, StoreError> {
        if !self.enabled {
            return self.inner.fetch(query).await;
        }

        let key = FetchKey::new(query.groq(), &query.params());
        match self.store.get(&key) {
            Lookup::Hit(value) => {
                counter!(METRIC_CACHE_HIT, "query" => query.name()).increment(1);
                return Ok(value);
            }
            Lookup::Expired => {
                self.registry.unregister(&key);
                counter!(METRIC_CACHE_MISS, "query" => query.name()).increment(1);
            }
            Lookup::Miss => {
                counter!(METRIC_CACHE_MISS, "query" => query.name()).increment(1);
            }
        }

        let snapshot = self.registry.snapshot(query.tags());
        let value = self.inner.fetch(query).await?;
        self.remember(key, query, value.clone(), &snapshot);
        Ok(value)
    }
}

impl TagInvalidator for CachedContentStore {
    fn invalidate(&self, tag: &CacheTag) -> usize {
        let keys = self.registry.invalidate(tag);
        let dropped = keys.iter().filter(|key| self.store.remove(key)).count();
        counter!(METRIC_CACHE_INVALIDATED).increment(dropped as u64);
        info!(
            target = "cache::fetch",
            tag = %tag,
            dropped,
            "Cache tag invalidated"
        );
        dropped
    }
}
