//! Service-level error taxonomy shared by the catalog and review modules.

use folio_db::StoreError;
use folio_http::error::{AppError, PlainTextError};
use thiserror::Error;

/// Errors surfaced by service operations
///
/// Maps onto HTTP as invalid-argument → 400, not-found → 404, internal → 500.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{message}")]
    InvalidArgument {
        field: &'static str,
        message: String,
    },

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }
}

impl From<StoreError> for ServiceError {
    fn from(error: StoreError) -> Self {
        Self::Internal(anyhow::Error::new(error))
    }
}

impl From<ServiceError> for AppError {
    fn from(error: ServiceError) -> Self {
        match error {
            ServiceError::InvalidArgument { field, message } => {
                AppError::invalid_field(field, message)
            }
            ServiceError::NotFound(message) => AppError::not_found(message),
            ServiceError::Internal(error) => AppError::Internal(error),
        }
    }
}

impl From<ServiceError> for PlainTextError {
    fn from(error: ServiceError) -> Self {
        PlainTextError(error.into())
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
