//! Bidirectional tag registry.
//!
//! Tracks which cached fetches were filed under which tags, and a per-tag
//! epoch that advances on every invalidation of that tag.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use super::keys::{CacheTag, FetchKey};
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::registry";

/// Invalidation counter for one tag.
pub type Epoch = u64;

/// Epochs of a query's tags, captured before the query runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpochSnapshot(Vec<(CacheTag, Epoch)>);

#[derive(Default)]
struct RegistryState {
    tag_to_keys: HashMap<CacheTag, HashSet<FetchKey>>,
    key_to_tags: HashMap<FetchKey, HashSet<CacheTag>>,
    epochs: HashMap<CacheTag, Epoch>,
}

impl RegistryState {
    fn epoch(&self, tag: &CacheTag) -> Epoch {
        self.epochs.get(tag).copied().unwrap_or_default()
    }

    fn detach(&mut self, key: &FetchKey) {
        if let Some(tags) = self.key_to_tags.remove(key) {
            for tag in tags {
                if let Some(keys) = self.tag_to_keys.get_mut(&tag) {
                    keys.remove(key);
                    if keys.is_empty() {
                        self.tag_to_keys.remove(&tag);
                    }
                }
            }
        }
    }
}

/// Tracks tag → keys and key → tags mappings.
///
/// Both directions live behind one lock so that registration can be checked
/// against tag epochs atomically with respect to invalidation.
#[derive(Default)]
pub struct TagRegistry {
    state: RwLock<RegistryState>,
}

impl TagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture the current epochs of `tags`.
    pub fn snapshot(&self, tags: &[CacheTag]) -> EpochSnapshot {
        let state = rw_read(&self.state, SOURCE, "snapshot");
        EpochSnapshot(
            tags.iter()
                .map(|tag| (tag.clone(), state.epoch(tag)))
                .collect(),
        )
    }

    /// Run `insert` and file `key` under the snapshot's tags, unless any of
    /// them was invalidated after the snapshot was taken.
    ///
    /// `insert` runs while the registry is locked, so no invalidation can
    /// slip between the epoch check and the value becoming visible. It
    /// returns the key it displaced, which is forgotten. Returns `false`
    /// without calling `insert` when the snapshot is stale.
    pub fn insert_if_current<F>(&self, key: FetchKey, snapshot: &EpochSnapshot, insert: F) -> bool
    where
        F: FnOnce() -> Option<FetchKey>,
    {
        let mut state = rw_write(&self.state, SOURCE, "insert_if_current");
        if snapshot
            .0
            .iter()
            .any(|(tag, epoch)| state.epoch(tag) != *epoch)
        {
            return false;
        }

        if let Some(evicted) = insert() {
            state.detach(&evicted);
        }
        state.detach(&key);
        let tags: HashSet<CacheTag> = snapshot.0.iter().map(|(tag, _)| tag.clone()).collect();
        for tag in &tags {
            state.tag_to_keys.entry(tag.clone()).or_default().insert(key);
        }
        state.key_to_tags.insert(key, tags);
        true
    }

    /// Forget a key, e.g. after eviction.
    pub fn unregister(&self, key: &FetchKey) {
        rw_write(&self.state, SOURCE, "unregister").detach(key);
    }

    /// Advance the tag's epoch and remove every key filed under it.
    ///
    /// Returns the removed keys; keys filed under other tags too are removed
    /// from those as well.
    pub fn invalidate(&self, tag: &CacheTag) -> HashSet<FetchKey> {
        let mut state = rw_write(&self.state, SOURCE, "invalidate");
        *state.epochs.entry(tag.clone()).or_default() += 1;
        let keys = state.tag_to_keys.remove(tag).unwrap_or_default();
        for key in &keys {
            state.detach(key);
        }
        keys
    }

    /// Tags a key is filed under.
    #[cfg(test)]
    pub fn tags_for_key(&self, key: &FetchKey) -> HashSet<CacheTag> {
        rw_read(&self.state, SOURCE, "tags_for_key")
            .key_to_tags
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    /// Keys filed under a tag.
    #[cfg(test)]
    pub fn keys_for_tag(&self, tag: &CacheTag) -> HashSet<FetchKey> {
        rw_read(&self.state, SOURCE, "keys_for_tag")
            .tag_to_keys
            .get(tag)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of tracked keys.
    #[cfg(test)]
    pub fn key_count(&self) -> usize {
        rw_read(&self.state, SOURCE, "key_count").key_to_tags.len()
    }

    /// Number of tags with at least one key.
    #[cfg(test)]
    pub fn tag_count(&self) -> usize {
        rw_read(&self.state, SOURCE, "tag_count").tag_to_keys.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(n: u64) -> FetchKey {
        FetchKey {
            query_hash: n,
            params_hash: 0,
        }
    }

    fn register(registry: &TagRegistry, key: FetchKey, snapshot: &EpochSnapshot) -> bool {
        registry.insert_if_current(key, snapshot, || None)
    }

    #[test]
    fn register_and_lookup() {
        let registry = TagRegistry::new();
        let snapshot = registry.snapshot(&[CacheTag::post("a"), CacheTag::Posts]);

        assert!(register(&registry, key(1), &snapshot));

        assert!(registry.keys_for_tag(&CacheTag::post("a")).contains(&key(1)));
        assert!(registry.keys_for_tag(&CacheTag::Posts).contains(&key(1)));
        assert_eq!(registry.tags_for_key(&key(1)).len(), 2);
    }

    #[test]
    fn unregister_cleans_up_mappings() {
        let registry = TagRegistry::new();
        let snapshot = registry.snapshot(&[CacheTag::Posts]);
        register(&registry, key(1), &snapshot);
        assert_eq!(registry.key_count(), 1);
        assert_eq!(registry.tag_count(), 1);

        registry.unregister(&key(1));
        assert_eq!(registry.key_count(), 0);
        assert_eq!(registry.tag_count(), 0);
    }

    #[test]
    fn invalidate_removes_keys_from_every_tag() {
        let registry = TagRegistry::new();
        let detail = registry.snapshot(&[CacheTag::post("a"), CacheTag::Posts]);
        let listing = registry.snapshot(&[CacheTag::Posts, CacheTag::Categories]);
        register(&registry, key(1), &detail);
        register(&registry, key(2), &listing);

        let removed = registry.invalidate(&CacheTag::post("a"));
        assert_eq!(removed, HashSet::from([key(1)]));
        assert_eq!(
            registry.keys_for_tag(&CacheTag::Posts),
            HashSet::from([key(2)])
        );

        let removed = registry.invalidate(&CacheTag::Categories);
        assert_eq!(removed, HashSet::from([key(2)]));
        assert_eq!(registry.key_count(), 0);
    }

    #[test]
    fn stale_snapshot_is_refused() {
        let registry = TagRegistry::new();
        let snapshot = registry.snapshot(&[CacheTag::Posts]);
        registry.invalidate(&CacheTag::Posts);

        assert!(!register(&registry, key(1), &snapshot));
        assert_eq!(registry.key_count(), 0);

        let fresh = registry.snapshot(&[CacheTag::Posts]);
        assert!(register(&registry, key(1), &fresh));
    }

    #[test]
    fn unrelated_invalidation_keeps_snapshot_current() {
        let registry = TagRegistry::new();
        let snapshot = registry.snapshot(&[CacheTag::post("a")]);
        registry.invalidate(&CacheTag::post("b"));
        assert!(register(&registry, key(1), &snapshot));
    }

    #[test]
    fn reregistering_replaces_tags() {
        let registry = TagRegistry::new();
        let first = registry.snapshot(&[CacheTag::Categories]);
        register(&registry, key(1), &first);
        let second = registry.snapshot(&[CacheTag::Posts]);
        register(&registry, key(1), &second);

        assert!(registry.keys_for_tag(&CacheTag::Categories).is_empty());
        assert_eq!(
            registry.tags_for_key(&key(1)),
            HashSet::from([CacheTag::Posts])
        );
    }

    #[test]
    fn stale_snapshot_never_runs_the_insert() {
        let registry = TagRegistry::new();
        let snapshot = registry.snapshot(&[CacheTag::Posts, CacheTag::Categories]);
        registry.invalidate(&CacheTag::Categories);

        let mut inserted = false;
        let accepted = registry.insert_if_current(key(1), &snapshot, || {
            inserted = true;
            None
        });

        assert!(!accepted);
        assert!(!inserted);
        assert_eq!(registry.key_count(), 0);
    }

    #[test]
    fn displaced_key_is_forgotten_on_insert() {
        let registry = TagRegistry::new();
        let snapshot = registry.snapshot(&[CacheTag::Posts]);
        register(&registry, key(1), &snapshot);

        assert!(registry.insert_if_current(key(2), &snapshot, || Some(key(1))));

        assert!(registry.tags_for_key(&key(1)).is_empty());
        assert_eq!(
            registry.keys_for_tag(&CacheTag::Posts),
            HashSet::from([key(2)])
        );
    }
}
