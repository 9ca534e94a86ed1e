use std::sync::Arc;

use crate::error::{ServiceError, ServiceResult};
use crate::modules::books::models::Book;

use super::lookup::{BookLookupCache, LookupError};
use super::models::{AverageRating, BookReviews, NewReview, Review};
use super::rating::{average, RatingAggregator};
use super::store::ReviewStore;
use super::validation::validate_review;

impl From<LookupError> for ServiceError {
    fn from(error: LookupError) -> Self {
        match error {
            LookupError::InvalidBookId => ServiceError::invalid("bookId", error.to_string()),
            LookupError::Cache(err) => ServiceError::Internal(anyhow::Error::new(err)),
        }
    }
}

/// Review operations; every book-scoped call first confirms the book exists
#[derive(Clone)]
pub struct ReviewService {
    books: Arc<BookLookupCache>,
    store: Arc<dyn ReviewStore>,
    ratings: RatingAggregator,
}

impl ReviewService {
    pub fn new(books: Arc<BookLookupCache>, store: Arc<dyn ReviewStore>) -> Self {
        let ratings = RatingAggregator::new(store.clone());
        Self {
            books,
            store,
            ratings,
        }
    }

    async fn require_book(&self, book_id: &str) -> ServiceResult<Book> {
        self.books
            .get(book_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("Book with ID {book_id} not found")))
    }

    /// `body` is `None` when the request carried no usable review.
    /// Reviews are filed under the id the catalog reports for the book.
    pub async fn add_review(&self, book_id: &str, body: Option<NewReview>) -> ServiceResult<Review> {
        let book = self.require_book(book_id).await?;
        let body = body.ok_or_else(|| ServiceError::invalid("review", "Review cannot be null"))?;
        let valid = validate_review(body)?;

        let review = Review::new(&book.id, valid.reviewer_name, valid.rating, valid.comment);
        let review = self.store.insert(review).await?;
        tracing::info!(book_id = %book.id, review_id = %review.id, backend = self.store.backend(), "review added");
        Ok(review)
    }

    pub async fn reviews_for_book(&self, book_id: &str) -> ServiceResult<BookReviews> {
        let book = self.require_book(book_id).await?;
        let reviews = self.store.by_book(&book.id).await?;
        let average_rating = average(reviews.iter().map(Review::rating));
        tracing::info!(book_id = %book.id, count = reviews.len(), "reviews retrieved");
        Ok(BookReviews {
            reviews,
            average_rating,
            book_id: book.id,
        })
    }

    pub async fn average_rating(&self, book_id: &str) -> ServiceResult<AverageRating> {
        let book = self.require_book(book_id).await?;
        let average_rating = self.ratings.average_rating(&book.id).await?;
        tracing::info!(book_id = %book.id, average_rating, "average rating computed");
        Ok(AverageRating {
            book_id: book.id,
            average_rating,
        })
    }

    pub async fn all_reviews(&self) -> ServiceResult<Vec<Review>> {
        Ok(self.store.all().await?)
    }

    /// Succeeds whether or not the review existed
    pub async fn delete_review(&self, review_id: &str) -> ServiceResult<()> {
        let removed = self.store.delete(review_id).await?;
        tracing::info!(review_id, removed, "review deleted");
        Ok(())
    }

    pub async fn invalidate_book(&self, book_id: &str) -> ServiceResult<()> {
        Ok(self.books.invalidate(book_id).await?)
    }
}
