use std::sync::Arc;

use crate::error::{ServiceError, ServiceResult};

use super::models::{Book, BookInput};
use super::repository::BookRepository;
use super::validation::validate_book;

/// Catalog operations shared by the GraphQL and REST surfaces
#[derive(Clone)]
pub struct BookService {
    repository: Arc<dyn BookRepository>,
}

impl BookService {
    pub fn new(repository: Arc<dyn BookRepository>) -> Self {
        Self { repository }
    }

    pub async fn all_books(&self) -> ServiceResult<Vec<Book>> {
        Ok(self.repository.list().await?)
    }

    pub async fn book(&self, id: &str) -> ServiceResult<Option<Book>> {
        Ok(self.repository.get(id).await?)
    }

    pub async fn books_by_author(&self, author: &str) -> ServiceResult<Vec<Book>> {
        Ok(self.repository.by_author(author).await?)
    }

    pub async fn add_book(&self, input: BookInput) -> ServiceResult<Book> {
        validate_book(&input)?;
        let book = self.repository.insert(input).await?;
        tracing::info!(book_id = %book.id, "book added");
        Ok(book)
    }

    pub async fn update_book(&self, id: &str, input: BookInput) -> ServiceResult<Book> {
        validate_book(&input)?;
        let book = self
            .repository
            .update(id, input)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("Book with ID {id} not found for update")))?;
        tracing::info!(book_id = %book.id, "book updated");
        Ok(book)
    }

    pub async fn delete_book(&self, id: &str) -> ServiceResult<()> {
        if !self.repository.delete(id).await? {
            return Err(ServiceError::not_found(format!(
                "Book with ID {id} not found for deletion"
            )));
        }
        tracing::info!(book_id = %id, "book deleted");
        Ok(())
    }
}
