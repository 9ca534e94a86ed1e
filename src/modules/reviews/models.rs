use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Rating must be between 1 and 5")]
pub struct RatingOutOfRange;

/// A star rating in `1..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: i64) -> Result<Self, RatingOutOfRange> {
        match u8::try_from(value) {
            Ok(value) if (Self::MIN..=Self::MAX).contains(&value) => Ok(Self(value)),
            _ => Err(RatingOutOfRange),
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Rating {
    type Error = RatingOutOfRange;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

/// A stored review of a catalog book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: String,
    pub book_id: String,
    pub reviewer_name: String,
    rating: Rating,
    pub comment: String,
    /// Creation time in milliseconds since the Unix epoch
    pub timestamp: i64,
}

impl Review {
    /// New review with a fresh id, stamped with the current time
    pub fn new(
        book_id: impl Into<String>,
        reviewer_name: impl Into<String>,
        rating: Rating,
        comment: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            book_id: book_id.into(),
            reviewer_name: reviewer_name.into(),
            rating,
            comment: comment.into(),
            timestamp: now_millis(),
        }
    }

    /// Rebuild a review read back from storage
    pub fn restore(
        id: String,
        book_id: String,
        reviewer_name: String,
        rating: Rating,
        comment: String,
        timestamp: i64,
    ) -> Self {
        Self {
            id,
            book_id,
            reviewer_name,
            rating,
            comment,
            timestamp,
        }
    }

    pub fn rating(&self) -> Rating {
        self.rating
    }

    /// Leaves the review untouched when `value` is out of range.
    pub fn set_rating(&mut self, value: i64) -> Result<(), RatingOutOfRange> {
        self.rating = Rating::new(value)?;
        Ok(())
    }
}

fn now_millis() -> i64 {
    i64::try_from(OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000).unwrap_or(i64::MAX)
}

/// Body of `POST /api/reviews/book/{bookId}`.
///
/// Every field is optional on the wire so validation can name the first
/// missing one.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReview {
    #[serde(default)]
    pub reviewer_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_rating")]
    pub rating: Option<i64>,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Accepts `5`, `5.0` and `"5"`. Any other number or string reads as no
/// rating, which validation then rejects as out of range.
fn lenient_rating<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Wire {
        Int(i64),
        Float(f64),
        Text(String),
    }

    Ok(Option::<Wire>::deserialize(deserializer)?.and_then(|wire| match wire {
        Wire::Int(value) => Some(value),
        Wire::Float(value) if value.fract() == 0.0 && value.abs() <= 1e15 => Some(value as i64),
        Wire::Float(_) => None,
        Wire::Text(text) => text.trim().parse().ok(),
    }))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookReviews {
    pub reviews: Vec<Review>,
    pub average_rating: f64,
    pub book_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AverageRating {
    pub book_id: String,
    pub average_rating: f64,
}
