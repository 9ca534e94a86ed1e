//! Review persistence: a MongoDB collection in production, a vector in tests.

use async_trait::async_trait;
use bson::doc;
use futures::TryStreamExt;
use mongodb::{Collection, IndexModel};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use folio_db::{mongo::MongoClient, Result, StoreError};

use super::models::{Rating, Review};

/// Storage port for reviews
#[async_trait]
pub trait ReviewStore: Send + Sync {
    async fn insert(&self, review: Review) -> Result<Review>;
    async fn by_book(&self, book_id: &str) -> Result<Vec<Review>>;
    async fn all(&self) -> Result<Vec<Review>>;
    /// Returns whether a review was removed
    async fn delete(&self, review_id: &str) -> Result<bool>;
    fn backend(&self) -> &'static str;
}

/// Process-local [`ReviewStore`]
#[derive(Default)]
pub struct InMemoryReviewStore {
    reviews: RwLock<Vec<Review>>,
}

impl InMemoryReviewStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReviewStore for InMemoryReviewStore {
    async fn insert(&self, review: Review) -> Result<Review> {
        let mut reviews = self.reviews.write().await;
        reviews.retain(|existing| existing.id != review.id);
        reviews.push(review.clone());
        Ok(review)
    }

    async fn by_book(&self, book_id: &str) -> Result<Vec<Review>> {
        let reviews = self.reviews.read().await;
        Ok(reviews
            .iter()
            .filter(|review| review.book_id == book_id)
            .cloned()
            .collect())
    }

    async fn all(&self) -> Result<Vec<Review>> {
        Ok(self.reviews.read().await.clone())
    }

    async fn delete(&self, review_id: &str) -> Result<bool> {
        let mut reviews = self.reviews.write().await;
        let before = reviews.len();
        reviews.retain(|review| review.id != review_id);
        Ok(reviews.len() < before)
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

/// Stored shape of a review; the review id is the document `_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReviewDocument {
    #[serde(rename = "_id")]
    id: String,
    book_id: String,
    reviewer_name: String,
    rating: i32,
    comment: String,
    timestamp: i64,
}

impl From<&Review> for ReviewDocument {
    fn from(review: &Review) -> Self {
        Self {
            id: review.id.clone(),
            book_id: review.book_id.clone(),
            reviewer_name: review.reviewer_name.clone(),
            rating: i32::from(review.rating().get()),
            comment: review.comment.clone(),
            timestamp: review.timestamp,
        }
    }
}

impl TryFrom<ReviewDocument> for Review {
    type Error = StoreError;

    fn try_from(document: ReviewDocument) -> Result<Self> {
        let rating = Rating::new(i64::from(document.rating))
            .map_err(|err| StoreError::Corrupt(format!("review {}: {err}", document.id)))?;
        Ok(Review::restore(
            document.id,
            document.book_id,
            document.reviewer_name,
            rating,
            document.comment,
            document.timestamp,
        ))
    }
}

/// MongoDB-backed [`ReviewStore`]
#[derive(Clone)]
pub struct MongoReviewStore {
    collection: Collection<ReviewDocument>,
}

impl MongoReviewStore {
    pub fn new(client: &MongoClient, collection: &str) -> Self {
        Self {
            collection: client.collection(collection),
        }
    }

    /// Create the `bookId` lookup index if it does not exist yet
    pub async fn ensure_indexes(&self) -> Result<()> {
        let index = IndexModel::builder().keys(doc! { "bookId": 1 }).build();
        self.collection.create_index(index).await?;
        Ok(())
    }

    async fn find(&self, filter: bson::Document) -> Result<Vec<Review>> {
        let documents: Vec<ReviewDocument> = self.collection.find(filter).await?.try_collect().await?;
        documents.into_iter().map(Review::try_from).collect()
    }
}

#[async_trait]
impl ReviewStore for MongoReviewStore {
    async fn insert(&self, review: Review) -> Result<Review> {
        self.collection.insert_one(ReviewDocument::from(&review)).await?;
        Ok(review)
    }

    async fn by_book(&self, book_id: &str) -> Result<Vec<Review>> {
        self.find(doc! { "bookId": book_id }).await
    }

    async fn all(&self) -> Result<Vec<Review>> {
        self.find(doc! {}).await
    }

    async fn delete(&self, review_id: &str) -> Result<bool> {
        let result = self.collection.delete_one(doc! { "_id": review_id }).await?;
        Ok(result.deleted_count > 0)
    }

    fn backend(&self) -> &'static str {
        "mongo"
    }
}
