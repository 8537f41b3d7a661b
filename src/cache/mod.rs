//! Fetch cache for content store reads.
//!
//! Every cached result is filed under the cache tags its query declares.
//! Invalidating a tag drops exactly the results filed under it:
//!
//! - `posts`: every read touching post collections or post fields
//! - `categories`: category listings and the post slices filtered by them
//! - `post:<slug>`: the detail read of one post
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! enabled = true
//! entry_limit = 512
//! # max_age_seconds = 300
//! ```

mod config;
mod fetch;
mod keys;
mod lock;
mod registry;
mod store;

pub use config::CacheConfig;
pub use fetch::CachedContentStore;
pub use keys::{CacheTag, FetchKey, ParseCacheTagError, hash_params, hash_query, hash_value};
pub use registry::{Epoch, EpochSnapshot, TagRegistry};
pub use store::{FetchStore, Lookup};

pub(crate) use fetch::{
    METRIC_CACHE_EVICT, METRIC_CACHE_HIT, METRIC_CACHE_INVALIDATED, METRIC_CACHE_MISS,
};
