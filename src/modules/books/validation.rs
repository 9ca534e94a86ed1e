use crate::error::{ServiceError, ServiceResult};
use crate::utils::is_blank;

use super::models::BookInput;

/// Check a create/update payload; the first failing field wins.
pub fn validate_book(input: &BookInput) -> ServiceResult<()> {
    if is_blank(&input.title) {
        return Err(ServiceError::invalid("title", "Title cannot be null or empty"));
    }
    if is_blank(&input.author) {
        return Err(ServiceError::invalid("author", "Author cannot be null or empty"));
    }
    if input.year < 0 {
        return Err(ServiceError::invalid("year", "Year must be non-negative"));
    }
    Ok(())
}
