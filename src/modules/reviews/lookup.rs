//! Read-through cache of catalog books.
//!
//! Reviews only need to know that a book exists, so lookups go through a
//! [`CacheStore`] first and fall back to the remote [`BookFetcher`] on a miss.
//! Only successful fetches are cached; a missing or unreachable book is
//! retried on the next lookup.

use std::sync::Arc;
use std::time::Duration;

use folio_cache::{CacheError, CacheStore};
use thiserror::Error;

use crate::modules::books::models::Book;
use crate::utils::is_blank;

use super::fetcher::BookFetcher;

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("Book ID cannot be null or empty")]
    InvalidBookId,

    #[error("cache store failed: {0}")]
    Cache(#[from] CacheError),
}

pub fn cache_key(book_id: &str) -> String {
    format!("book:{book_id}")
}

pub struct BookLookupCache {
    store: Arc<dyn CacheStore>,
    fetcher: Arc<dyn BookFetcher>,
    ttl: Duration,
}

impl BookLookupCache {
    pub fn new(store: Arc<dyn CacheStore>, fetcher: Arc<dyn BookFetcher>, ttl: Duration) -> Self {
        Self { store, fetcher, ttl }
    }

    /// Resolve `book_id`, returning `None` when the catalog has no such book
    /// or could not be reached.
    pub async fn get(&self, book_id: &str) -> Result<Option<Book>, LookupError> {
        if is_blank(book_id) {
            return Err(LookupError::InvalidBookId);
        }
        let key = cache_key(book_id);

        if let Some(book) = self.cached(&key).await {
            tracing::debug!(book_id, backend = self.store.backend(), "book cache hit");
            return Ok(Some(book));
        }

        let book = match self.fetcher.fetch(book_id).await {
            Ok(book) => book,
            Err(err) if err.is_not_found() => {
                tracing::info!(book_id, outcome = err.outcome(), "book not found in catalog");
                return Ok(None);
            }
            Err(err) => {
                tracing::warn!(
                    book_id,
                    outcome = err.outcome(),
                    transport = self.fetcher.transport(),
                    error = %err,
                    "book lookup failed"
                );
                return Ok(None);
            }
        };

        match serde_json::to_string(&book) {
            Ok(value) => {
                if let Err(err) = self.store.set(&key, value, self.ttl).await {
                    tracing::warn!(book_id, error = %err, "failed to cache book");
                }
            }
            Err(err) => tracing::warn!(book_id, error = %err, "failed to serialize book"),
        }

        Ok(Some(book))
    }

    /// Drop the cached entry so the next lookup goes to the catalog
    pub async fn invalidate(&self, book_id: &str) -> Result<(), LookupError> {
        if is_blank(book_id) {
            return Err(LookupError::InvalidBookId);
        }
        let removed = self.store.delete(&cache_key(book_id)).await?;
        tracing::info!(book_id, removed, "book cache entry invalidated");
        Ok(())
    }

    async fn cached(&self, key: &str) -> Option<Book> {
        let value = match self.store.get(key).await {
            Ok(value) => value?,
            Err(err) => {
                tracing::warn!(key, error = %err, "cache read failed");
                return None;
            }
        };

        match serde_json::from_str(&value) {
            Ok(book) => Some(book),
            Err(err) => {
                tracing::warn!(key, error = %err, "discarding undecodable cache entry");
                None
            }
        }
    }
}
