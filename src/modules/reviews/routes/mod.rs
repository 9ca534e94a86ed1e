//! REST surface of the review service, mounted under `/api/reviews`.
//!
//! Errors are answered as plain text bodies.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use folio_http::error::{AppError, PlainTextError};

use crate::error::ServiceError;

use super::models::{AverageRating, BookReviews, NewReview, Review};
use super::service::ReviewService;

pub fn router(service: ReviewService) -> Router {
    Router::new()
        .route("/", get(all_reviews))
        .route("/health", get(health_check))
        .route("/book/{book_id}", get(reviews_for_book).post(add_review))
        .route("/book/{book_id}/average-rating", get(average_rating))
        .route("/cache/book/{book_id}", delete(invalidate_book))
        .route("/{review_id}", delete(delete_review))
        .with_state(service)
}

/// Prefix internal failures with `context`; client errors pass through.
fn failure(context: &'static str) -> impl FnOnce(ServiceError) -> PlainTextError {
    move |error| match error {
        ServiceError::Internal(err) => PlainTextError(AppError::Internal(err.context(context))),
        other => other.into(),
    }
}

async fn health_check() -> &'static str {
    "Review service is healthy"
}

async fn add_review(
    State(service): State<ReviewService>,
    Path(book_id): Path<String>,
    body: Result<Json<NewReview>, JsonRejection>,
) -> Result<Json<Review>, PlainTextError> {
    let body = match body {
        Ok(Json(body)) => Some(body),
        Err(rejection) => {
            tracing::debug!(book_id, error = %rejection, "unusable review body");
            None
        }
    };
    service
        .add_review(&book_id, body)
        .await
        .map(Json)
        .map_err(failure("Error adding review"))
}

async fn reviews_for_book(
    State(service): State<ReviewService>,
    Path(book_id): Path<String>,
) -> Result<Json<BookReviews>, PlainTextError> {
    service
        .reviews_for_book(&book_id)
        .await
        .map(Json)
        .map_err(failure("Error getting reviews"))
}

async fn average_rating(
    State(service): State<ReviewService>,
    Path(book_id): Path<String>,
) -> Result<Json<AverageRating>, PlainTextError> {
    service
        .average_rating(&book_id)
        .await
        .map(Json)
        .map_err(failure("Error getting average rating"))
}

async fn all_reviews(
    State(service): State<ReviewService>,
) -> Result<Json<Vec<Review>>, PlainTextError> {
    service
        .all_reviews()
        .await
        .map(Json)
        .map_err(failure("Error getting reviews"))
}

async fn delete_review(
    State(service): State<ReviewService>,
    Path(review_id): Path<String>,
) -> Result<StatusCode, PlainTextError> {
    service
        .delete_review(&review_id)
        .await
        .map_err(failure("Error deleting review"))?;
    Ok(StatusCode::OK)
}

async fn invalidate_book(
    State(service): State<ReviewService>,
    Path(book_id): Path<String>,
) -> Result<StatusCode, PlainTextError> {
    service
        .invalidate_book(&book_id)
        .await
        .map_err(failure("Error invalidating cached book"))?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::reviews::lookup::tests::CountingFetcher;
    use crate::modules::reviews::service::tests::service;
    use async_trait::async_trait;
    use axum::{body::Body, http::Request, response::Response};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app(fetcher: Arc<CountingFetcher>) -> Router {
        router(service(fetcher))
    }

    fn post(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn text(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn json_body(response: Response) -> Value {
        serde_json::from_str(&text(response).await).unwrap()
    }

    fn review_json(rating: i64) -> String {
        json!({"reviewerName": "Ann", "rating": rating, "comment": "Loved it"}).to_string()
    }

    #[tokio::test]
    async fn add_review_returns_stored_review() {
        let app = app(Arc::new(CountingFetcher::with_books(&[("1", "Dune")])));

        let response = app.oneshot(post("/book/1", &review_json(5))).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["bookId"], "1");
        assert_eq!(body["rating"], 5);
        assert!(body["id"].as_str().is_some_and(|id| !id.is_empty()));
        assert!(body["timestamp"].as_i64().is_some());
    }

    #[tokio::test]
    async fn unknown_book_is_404_plain_text() {
        let app = app(Arc::new(CountingFetcher::with_books(&[])));

        let response = app.oneshot(post("/book/77", &review_json(5))).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(text(response).await, "Book with ID 77 not found");
    }

    #[tokio::test]
    async fn invalid_ratings_are_400() {
        let app = app(Arc::new(CountingFetcher::with_books(&[("1", "Dune")])));

        for rating in [0, 6] {
            let response = app.clone().oneshot(post("/book/1", &review_json(rating))).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(text(response).await, "Rating must be between 1 and 5");
        }
        for rating in [1, 5] {
            let response = app.clone().oneshot(post("/book/1", &review_json(rating))).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn rating_may_be_a_numeric_string_or_whole_float() {
        let app = app(Arc::new(CountingFetcher::with_books(&[("1", "Dune")])));

        for rating in [json!("5"), json!(4.0)] {
            let body = json!({"reviewerName": "Ann", "rating": rating, "comment": "Loved it"});
            let response = app.clone().oneshot(post("/book/1", &body.to_string())).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let body = json!({"reviewerName": "Ann", "rating": "great", "comment": "Loved it"});
        let response = app.oneshot(post("/book/1", &body.to_string())).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(text(response).await, "Rating must be between 1 and 5");
    }

    #[tokio::test]
    async fn non_canonical_book_id_shares_the_catalog_bucket() {
        let fetcher = Arc::new(CountingFetcher::with_books(&[("1", "Dune")]));
        fetcher.alias("01", "1");
        let app = app(fetcher);

        app.clone().oneshot(post("/book/1", &review_json(5))).await.unwrap();
        let response = app.clone().oneshot(post("/book/01", &review_json(1))).await.unwrap();
        assert_eq!(json_body(response).await["bookId"], "1");

        let average = json_body(app.oneshot(get("/book/1/average-rating")).await.unwrap()).await;
        assert_eq!(average, json!({"bookId": "1", "averageRating": 3.0}));
    }

    #[tokio::test]
    async fn blank_book_id_is_400_before_lookup() {
        let fetcher = Arc::new(CountingFetcher::with_books(&[]));
        let app = app(fetcher.clone());

        let response = app.oneshot(post("/book/%20", &review_json(3))).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(text(response).await, "Book ID cannot be null or empty");
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn missing_or_malformed_body_is_400() {
        let app = app(Arc::new(CountingFetcher::with_books(&[("1", "Dune")])));

        for body in ["", "null", "{broken"] {
            let response = app.clone().oneshot(post("/book/1", body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(text(response).await, "Review cannot be null");
        }

        let response = app
            .oneshot(post("/book/1", r#"{"rating": 3, "comment": "ok"}"#))
            .await
            .unwrap();
        assert_eq!(text(response).await, "Reviewer name cannot be null or empty");
    }

    #[tokio::test]
    async fn reviews_and_average_rating() {
        let app = app(Arc::new(CountingFetcher::with_books(&[("1", "Dune")])));
        for rating in [5, 3] {
            app.clone().oneshot(post("/book/1", &review_json(rating))).await.unwrap();
        }

        let reviews = json_body(app.clone().oneshot(get("/book/1")).await.unwrap()).await;
        assert_eq!(reviews["bookId"], "1");
        assert_eq!(reviews["averageRating"], 4.0);
        assert_eq!(reviews["reviews"].as_array().unwrap().len(), 2);

        let average = json_body(app.clone().oneshot(get("/book/1/average-rating")).await.unwrap()).await;
        assert_eq!(average, json!({"bookId": "1", "averageRating": 4.0}));

        let all = json_body(app.oneshot(get("/")).await.unwrap()).await;
        assert_eq!(all.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn reviews_for_unknown_book_are_404() {
        let app = app(Arc::new(CountingFetcher::with_books(&[])));

        let response = app.clone().oneshot(get("/book/5")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app.oneshot(get("/book/5/average-rating")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(text(response).await, "Book with ID 5 not found");
    }

    #[tokio::test]
    async fn delete_is_200_even_when_absent() {
        let app = app(Arc::new(CountingFetcher::with_books(&[])));

        let response = app
            .oneshot(Request::builder().method("DELETE").uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn cache_invalidation_endpoint_forces_refetch() {
        let fetcher = Arc::new(CountingFetcher::with_books(&[("1", "Dune")]));
        let app = app(fetcher.clone());

        app.clone().oneshot(get("/book/1/average-rating")).await.unwrap();
        app.clone().oneshot(get("/book/1/average-rating")).await.unwrap();
        assert_eq!(fetcher.calls(), 1);

        let response = app
            .clone()
            .oneshot(Request::builder().method("DELETE").uri("/cache/book/1").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        app.oneshot(get("/book/1/average-rating")).await.unwrap();
        assert_eq!(fetcher.calls(), 2);
    }

    struct BrokenStore;

    #[async_trait]
    impl crate::modules::reviews::store::ReviewStore for BrokenStore {
        async fn insert(&self, _review: Review) -> folio_db::Result<Review> {
            Err(folio_db::StoreError::Corrupt("disk full".into()))
        }
        async fn by_book(&self, _book_id: &str) -> folio_db::Result<Vec<Review>> {
            Err(folio_db::StoreError::Corrupt("disk full".into()))
        }
        async fn all(&self) -> folio_db::Result<Vec<Review>> {
            Err(folio_db::StoreError::Corrupt("disk full".into()))
        }
        async fn delete(&self, _review_id: &str) -> folio_db::Result<bool> {
            Err(folio_db::StoreError::Corrupt("disk full".into()))
        }
        fn backend(&self) -> &'static str {
            "broken"
        }
    }

    #[tokio::test]
    async fn store_failures_are_500_with_operation_prefix() {
        let fetcher = Arc::new(CountingFetcher::with_books(&[("1", "Dune")]));
        let lookup = crate::modules::reviews::lookup::tests::lookup(fetcher);
        let app = router(ReviewService::new(Arc::new(lookup), Arc::new(BrokenStore)));

        let response = app.clone().oneshot(post("/book/1", &review_json(4))).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(text(response).await.starts_with("Error adding review: "));

        let response = app.clone().oneshot(get("/book/1")).await.unwrap();
        assert!(text(response).await.starts_with("Error getting reviews: "));

        let response = app.oneshot(get("/book/1/average-rating")).await.unwrap();
        assert!(text(response).await.starts_with("Error getting average rating: "));
    }
}
