use crate::error::{ServiceError, ServiceResult};
use crate::utils::is_missing;

use super::models::{NewReview, Rating, RatingOutOfRange};

/// Review fields that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidReview {
    pub reviewer_name: String,
    pub rating: Rating,
    pub comment: String,
}

/// Check the body fields in order: reviewer name, rating, comment.
pub fn validate_review(body: NewReview) -> ServiceResult<ValidReview> {
    if is_missing(body.reviewer_name.as_deref()) {
        return Err(ServiceError::invalid(
            "reviewerName",
            "Reviewer name cannot be null or empty",
        ));
    }
    let rating = body
        .rating
        .ok_or(RatingOutOfRange)
        .and_then(Rating::new)
        .map_err(|err| ServiceError::invalid("rating", err.to_string()))?;
    if is_missing(body.comment.as_deref()) {
        return Err(ServiceError::invalid(
            "comment",
            "Review comment cannot be null or empty",
        ));
    }

    Ok(ValidReview {
        reviewer_name: body.reviewer_name.unwrap_or_default(),
        rating,
        comment: body.comment.unwrap_or_default(),
    })
}
