//! In-memory storage for fetch results.

use std::sync::RwLock;
use std::time::{Duration, Instant};

use lru::LruCache;
use serde_json::Value;

use super::config::CacheConfig;
use super::keys::FetchKey;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

#[derive(Clone)]
struct StoredFetch {
    value: Value,
    stored_at: Instant,
}

/// Result of a store lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Hit(Value),
    Miss,
    /// The entry outlived `max_age` and has been dropped.
    Expired,
}

/// LRU-bounded fetch result storage with optional entry age limit.
pub struct FetchStore {
    entries: RwLock<LruCache<FetchKey, StoredFetch>>,
    max_age: Option<Duration>,
}

impl FetchStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(config.entry_limit_non_zero())),
            max_age: config.max_age,
        }
    }

    pub fn get(&self, key: &FetchKey) -> Lookup {
        let mut entries = rw_write(&self.entries, SOURCE, "get");
        let (value, expired) = match entries.get(key) {
            Some(entry) => (
                entry.value.clone(),
                self.max_age
                    .is_some_and(|max_age| entry.stored_at.elapsed() >= max_age),
            ),
            None => return Lookup::Miss,
        };
        if expired {
            entries.pop(key);
            return Lookup::Expired;
        }
        Lookup::Hit(value)
    }

    /// Store a value, returning the key evicted to make room for it.
    pub fn put(&self, key: FetchKey, value: Value) -> Option<FetchKey> {
        let stored = StoredFetch {
            value,
            stored_at: Instant::now(),
        };
        rw_write(&self.entries, SOURCE, "put")
            .push(key, stored)
            .map(|(evicted, _)| evicted)
            .filter(|evicted| *evicted != key)
    }

    pub fn remove(&self, key: &FetchKey) -> bool {
        rw_write(&self.entries, SOURCE, "remove").pop(key).is_some()
    }

    #[cfg(test)]
    pub fn contains(&self, key: &FetchKey) -> bool {
        rw_read(&self.entries, SOURCE, "contains").contains(key)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
