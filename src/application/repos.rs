//! Traits describing content store and cache adapters.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::application::queries::ContentQuery;
use crate::cache::CacheTag;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("content store request failed: {0}")]
    Transport(String),
    #[error("content store responded with status {status}: {message}")]
    Upstream { status: u16, message: String },
    #[error("content store payload could not be decoded: {0}")]
    Decode(String),
}

impl StoreError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }

    pub fn decode(err: impl std::fmt::Display) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Executes planned queries against a content store.
///
/// Implementations return the raw `result` value of the query; callers decode
/// it with [`fetch_as`].
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn fetch(&self, query: &ContentQuery) -> Result<Value, StoreError>;
}

/// Drops cached fetch results by tag.
pub trait TagInvalidator: Send + Sync {
    /// Returns how many cached entries were dropped.
    fn invalidate(&self, tag: &CacheTag) -> usize;
}

/// Fetch and decode a query result.
pub async fn fetch_as<T>(store: &dyn ContentStore, query: &ContentQuery) -> Result<T, StoreError>
where
    T: DeserializeOwned,
{
    let value = store.fetch(query).await?;
    serde_json::from_value(value).map_err(StoreError::decode)
}
