//! REST surface of the catalog, mounted under `/api/books`.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use folio_http::error::AppError;

use super::models::{Book, BookInput, BookQuery};
use super::service::BookService;

pub fn router(service: BookService) -> Router {
    Router::new()
        .route("/", get(list_books).post(create_book))
        .route("/health", get(health_check))
        .route("/{id}", get(get_book).put(update_book).delete(delete_book))
        .with_state(service)
}

async fn health_check() -> &'static str {
    "Book catalog is healthy"
}

async fn list_books(
    State(service): State<BookService>,
    Query(query): Query<BookQuery>,
) -> Result<Json<Vec<Book>>, AppError> {
    let books = match query.author.as_deref() {
        Some(author) => service.books_by_author(author).await?,
        None => service.all_books().await?,
    };
    Ok(Json(books))
}

async fn get_book(
    State(service): State<BookService>,
    Path(id): Path<String>,
) -> Result<Json<Book>, AppError> {
    service
        .book(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("Book with ID {id} not found")))
}

async fn create_book(
    State(service): State<BookService>,
    body: Result<Json<BookInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Book>), AppError> {
    let Json(input) = body.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
    let book = service.add_book(input).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

async fn update_book(
    State(service): State<BookService>,
    Path(id): Path<String>,
    body: Result<Json<BookInput>, JsonRejection>,
) -> Result<Json<Book>, AppError> {
    let Json(input) = body.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
    Ok(Json(service.update_book(&id, input).await?))
}

async fn delete_book(
    State(service): State<BookService>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    service.delete_book(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
