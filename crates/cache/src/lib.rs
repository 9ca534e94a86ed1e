//! Key-value cache stores for Folio.
//!
//! [`CacheStore`] is the port the review service caches book snapshots
//! through. Two adapters ship here: [`MokaCacheStore`] keeps entries in
//! process, [`RedisCacheStore`] talks to a shared Redis server.

mod moka_store;
mod redis_store;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

pub use moka_store::MokaCacheStore;
pub use redis_store::RedisCacheStore;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("invalid ttl: {0:?}")]
    InvalidTtl(Duration),
}

pub type Result<T> = std::result::Result<T, CacheError>;

/// String-keyed store of serialized values with per-entry expiry
#[async_trait]
pub trait CacheStore: Send + Sync + 'static {
    /// Return the live value under `key`, if any
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value and expiry
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()>;

    /// Remove `key`; returns whether an entry was present
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Short backend name for logs
    fn backend(&self) -> &'static str;
}
