//! Fetch cache configuration.

use std::num::NonZeroUsize;
use std::time::Duration;

const DEFAULT_ENTRY_LIMIT: usize = 512;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Serve repeated fetches from memory.
    pub enabled: bool,
    /// Maximum cached fetch results before LRU eviction.
    pub entry_limit: usize,
    /// Entries older than this are refetched. `None` keeps entries until a
    /// tag invalidation or eviction drops them.
    pub max_age: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            entry_limit: DEFAULT_ENTRY_LIMIT,
            max_age: None,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            entry_limit: settings.entry_limit,
            max_age: settings.max_age_seconds.map(Duration::from_secs),
        }
    }
}

impl CacheConfig {
    /// Returns the entry limit as NonZeroUsize, clamping to 1 if zero.
    pub fn entry_limit_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.entry_limit).unwrap_or(NonZeroUsize::MIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = CacheConfig::default();
        assert!(config.enabled);
        assert_eq!(config.entry_limit, 512);
        assert!(config.max_age.is_none());
    }

    #[test]
    fn non_zero_clamps_to_min() {
        let config = CacheConfig {
            entry_limit: 0,
            ..Default::default()
        };
        assert_eq!(config.entry_limit_non_zero().get(), 1);
    }
}
