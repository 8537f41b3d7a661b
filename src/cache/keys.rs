//! Cache tag and key definitions.
//!
//! `CacheTag` names a family of content fetches that a revalidation call can
//! drop together. `FetchKey` identifies one cached fetch result.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Serialize, Serializer};
use thiserror::Error;

const POSTS: &str = "posts";
const CATEGORIES: &str = "categories";
const POST_PREFIX: &str = "post:";

/// Opaque invalidation handle attached to content fetches.
///
/// Renders as `posts`, `categories` or `post:<slug>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CacheTag {
    /// Every fetch that reads post collections or post fields.
    Posts,
    /// Every fetch that reads category records or counts.
    Categories,
    /// Fetches scoped to the post with this slug.
    Post(String),
}

impl CacheTag {
    pub fn post(slug: impl Into<String>) -> Self {
        Self::Post(slug.into())
    }
}

impl fmt::Display for CacheTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheTag::Posts => f.write_str(POSTS),
            CacheTag::Categories => f.write_str(CATEGORIES),
            CacheTag::Post(slug) => write!(f, "{POST_PREFIX}{slug}"),
        }
    }
}

impl Serialize for CacheTag {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown cache tag `{0}`")]
pub struct ParseCacheTagError(String);

impl FromStr for CacheTag {
    type Err = ParseCacheTagError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            POSTS => Ok(CacheTag::Posts),
            CATEGORIES => Ok(CacheTag::Categories),
            _ => match raw.strip_prefix(POST_PREFIX) {
                Some(slug) if !slug.is_empty() => Ok(CacheTag::post(slug)),
                _ => Err(ParseCacheTagError(raw.to_string())),
            },
        }
    }
}

/// Identity of one cached fetch: the query text and its bound parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FetchKey {
    pub query_hash: u64,
    pub params_hash: u64,
}

impl FetchKey {
    pub fn new(query: &str, params: &serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            query_hash: hash_query(query),
            params_hash: hash_params(params),
        }
    }
}

/// Compute a hash for any hashable value.
pub fn hash_value<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Hash a query text.
pub fn hash_query(query: &str) -> u64 {
    hash_value(&query)
}

/// Hash bound parameters in key order, independent of insertion order.
pub fn hash_params(params: &serde_json::Map<String, serde_json::Value>) -> u64 {
    let mut entries: Vec<(&String, String)> = params
        .iter()
        .map(|(name, value)| (name, value.to_string()))
        .collect();
    entries.sort();
    hash_value(&entries)
}

#[cfg(test)]
mod tests {
    use serde_json::{Map, json};

    use super::*;

    #[test]
    fn tags_render_wire_names() {
        assert_eq!(CacheTag::Posts.to_string(), "posts");
        assert_eq!(CacheTag::Categories.to_string(), "categories");
        assert_eq!(CacheTag::post("my-post").to_string(), "post:my-post");
    }

    #[test]
    fn tags_parse_from_wire_names() {
        assert_eq!("posts".parse(), Ok(CacheTag::Posts));
        assert_eq!("categories".parse(), Ok(CacheTag::Categories));
        assert_eq!("post:a:b".parse(), Ok(CacheTag::post("a:b")));
        assert!("post:".parse::<CacheTag>().is_err());
        assert!("pages".parse::<CacheTag>().is_err());
    }

    #[test]
    fn tags_serialize_as_strings() {
        let json = serde_json::to_value(vec![CacheTag::Posts, CacheTag::post("x")])
            .expect("serialize tags");
        assert_eq!(json, json!(["posts", "post:x"]));
    }

    #[test]
    fn params_hash_ignores_insertion_order() {
        let mut first = Map::new();
        first.insert("slug".into(), json!("a"));
        first.insert("tags".into(), json!(["x"]));
        let mut second = Map::new();
        second.insert("tags".into(), json!(["x"]));
        second.insert("slug".into(), json!("a"));
        assert_eq!(hash_params(&first), hash_params(&second));
    }

    #[test]
    fn fetch_key_distinguishes_params() {
        let mut a = Map::new();
        a.insert("slug".into(), json!("a"));
        let mut b = Map::new();
        b.insert("slug".into(), json!("b"));
        assert_ne!(FetchKey::new("q", &a), FetchKey::new("q", &b));
        assert_eq!(FetchKey::new("q", &a), FetchKey::new("q", &a.clone()));
    }
}
