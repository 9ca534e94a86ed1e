use std::sync::Arc;

use folio_db::Result;

use super::models::Rating;
use super::store::ReviewStore;

/// Mean rating of a book's reviews
#[derive(Clone)]
pub struct RatingAggregator {
    store: Arc<dyn ReviewStore>,
}

impl RatingAggregator {
    pub fn new(store: Arc<dyn ReviewStore>) -> Self {
        Self { store }
    }

    /// `0.0` when the book has no reviews
    pub async fn average_rating(&self, book_id: &str) -> Result<f64> {
        let reviews = self.store.by_book(book_id).await?;
        Ok(average(reviews.iter().map(|review| review.rating())))
    }
}

/// Arithmetic mean rounded half-up to two decimals.
///
/// Rounding happens on integer hundredths so ties such as `x.xx5` are exact.
pub fn average(ratings: impl IntoIterator<Item = Rating>) -> f64 {
    let (sum, count) = ratings
        .into_iter()
        .fold((0u64, 0u64), |(sum, count), rating| (sum + u64::from(rating.get()), count + 1));
    if count == 0 {
        return 0.0;
    }
    let hundredths = (200 * sum + count) / (2 * count);
    hundredths as f64 / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::reviews::models::Review;
    use crate::modules::reviews::store::InMemoryReviewStore;

    fn ratings(values: &[i64]) -> Vec<Rating> {
        values.iter().map(|value| Rating::new(*value).unwrap()).collect()
    }

    #[test]
    fn empty_is_zero() {
        assert_eq!(average(ratings(&[])), 0.0);
    }

    #[test]
    fn simple_means() {
        assert_eq!(average(ratings(&[5, 3])), 4.0);
        assert_eq!(average(ratings(&[1, 2])), 1.5);
        assert_eq!(average(ratings(&[4])), 4.0);
    }

    #[test]
    fn rounds_to_two_decimals_half_up() {
        assert_eq!(average(ratings(&[1, 1, 2])), 1.33);
        assert_eq!(average(ratings(&[1, 2, 2])), 1.67);
        // 9 / 8 = 1.125
        assert_eq!(average(ratings(&[1, 1, 1, 1, 1, 1, 1, 2])), 1.13);
    }

    #[tokio::test]
    async fn aggregates_only_the_requested_book() {
        let store = Arc::new(InMemoryReviewStore::new());
        for (book_id, rating) in [("1", 5), ("1", 3), ("2", 1)] {
            store
                .insert(Review::new(book_id, "Ann", Rating::new(rating).unwrap(), "ok"))
                .await
                .unwrap();
        }
        let aggregator = RatingAggregator::new(store);

        assert_eq!(aggregator.average_rating("1").await.unwrap(), 4.0);
        assert_eq!(aggregator.average_rating("2").await.unwrap(), 1.0);
        assert_eq!(aggregator.average_rating("3").await.unwrap(), 0.0);
    }
}
