//! Review service: reviews of catalog books, stored in MongoDB, with book
//! existence checked through a read-through cache of remote lookups.

pub mod fetcher;
pub mod lookup;
pub mod models;
pub mod rating;
pub mod routes;
pub mod service;
pub mod store;
pub mod validation;

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use axum::Router;
use folio_cache::{CacheStore, MokaCacheStore, RedisCacheStore};
use folio_db::mongo::MongoClient;
use folio_kernel::settings::{CacheBackend, ReviewStoreBackend, Settings};
use folio_kernel::{InitCtx, Module, ModuleFactory};

use lookup::BookLookupCache;
use service::ReviewService;
use store::{InMemoryReviewStore, MongoReviewStore, ReviewStore};

/// Assemble the review service from settings, connecting to its backends.
pub async fn build_service(settings: &Settings) -> anyhow::Result<ReviewService> {
    let cache: Arc<dyn CacheStore> = match settings.cache.backend {
        CacheBackend::Memory => Arc::new(MokaCacheStore::new("books", settings.cache.max_entries)),
        CacheBackend::Redis => Arc::new(
            RedisCacheStore::connect(&settings.cache.redis_url)
                .await
                .context("failed to connect to redis")?,
        ),
    };

    let fetcher = fetcher::from_settings(&settings.catalog).context("invalid catalog settings")?;

    let store: Arc<dyn ReviewStore> = match settings.reviews.store {
        ReviewStoreBackend::Mongo => {
            let client = MongoClient::connect(&settings.mongo.uri, &settings.mongo.database)
                .await
                .context("failed to connect to mongodb")?;
            let store = MongoReviewStore::new(&client, &settings.mongo.collection);
            store
                .ensure_indexes()
                .await
                .context("failed to create review indexes")?;
            tracing::info!(
                database = client.db_name(),
                collection = %settings.mongo.collection,
                "review collection ready"
            );
            Arc::new(store)
        }
        ReviewStoreBackend::Memory => Arc::new(InMemoryReviewStore::new()),
    };

    tracing::info!(
        cache = cache.backend(),
        transport = fetcher.transport(),
        store = store.backend(),
        catalog = %settings.catalog.base_url,
        "review service assembled"
    );

    let lookup = BookLookupCache::new(cache, fetcher, Duration::from_secs(settings.cache.ttl_secs));
    Ok(ReviewService::new(Arc::new(lookup), store))
}

pub struct ReviewsModule {
    service: OnceLock<ReviewService>,
}

impl ReviewsModule {
    pub const fn new() -> Self {
        Self {
            service: OnceLock::new(),
        }
    }
}

impl Default for ReviewsModule {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Module for ReviewsModule {
    fn name(&self) -> &'static str {
        "reviews"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let service = build_service(ctx.settings).await?;
        if self.service.set(service).is_err() {
            anyhow::bail!("reviews module initialized twice");
        }
        tracing::info!(module = self.name(), "reviews module initialized");
        Ok(())
    }

    fn routes(&self) -> Router {
        match self.service.get() {
            Some(service) => routes::router(service.clone()),
            None => {
                tracing::warn!(module = self.name(), "routes requested before init");
                Router::new()
            }
        }
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let text_error = |description: &str| {
            serde_json::json!({
                "description": description,
                "content": { "text/plain": { "schema": { "type": "string" } } }
            })
        };
        let book_id = serde_json::json!([{
            "name": "bookId",
            "in": "path",
            "required": true,
            "schema": { "type": "string" }
        }]);

        Some(serde_json::json!({
            "paths": {
                "": {
                    "get": {
                        "summary": "List all reviews",
                        "tags": ["Reviews"],
                        "responses": {
                            "200": {
                                "description": "Reviews",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "array",
                                            "items": { "$ref": "#/components/schemas/Review" }
                                        }
                                    }
                                }
                            },
                            "500": text_error("Store failure")
                        }
                    }
                },
                "/book/{bookId}": {
                    "post": {
                        "summary": "Add a review for a book",
                        "tags": ["Reviews"],
                        "parameters": book_id,
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/NewReview" }
                                }
                            }
                        },
                        "responses": {
                            "200": {
                                "description": "Stored review",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/Review" }
                                    }
                                }
                            },
                            "400": text_error("Invalid review"),
                            "404": text_error("Unknown book"),
                            "500": text_error("Store failure")
                        }
                    },
                    "get": {
                        "summary": "Reviews of a book with their average rating",
                        "tags": ["Reviews"],
                        "parameters": book_id,
                        "responses": {
                            "200": {
                                "description": "Reviews",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/BookReviews" }
                                    }
                                }
                            },
                            "404": text_error("Unknown book")
                        }
                    }
                },
                "/book/{bookId}/average-rating": {
                    "get": {
                        "summary": "Average rating of a book",
                        "tags": ["Reviews"],
                        "parameters": book_id,
                        "responses": {
                            "200": {
                                "description": "Average rating",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/AverageRating" }
                                    }
                                }
                            },
                            "404": text_error("Unknown book")
                        }
                    }
                },
                "/cache/book/{bookId}": {
                    "delete": {
                        "summary": "Drop the cached copy of a book",
                        "tags": ["Reviews"],
                        "parameters": book_id,
                        "responses": {
                            "204": { "description": "Invalidated" },
                            "400": text_error("Blank book id")
                        }
                    }
                },
                "/{reviewId}": {
                    "delete": {
                        "summary": "Delete a review",
                        "tags": ["Reviews"],
                        "parameters": [{
                            "name": "reviewId",
                            "in": "path",
                            "required": true,
                            "schema": { "type": "string" }
                        }],
                        "responses": { "200": { "description": "Deleted or absent" } }
                    }
                },
                "/health": {
                    "get": {
                        "summary": "Review service health check",
                        "tags": ["Reviews"],
                        "responses": {
                            "200": {
                                "description": "OK",
                                "content": { "text/plain": { "schema": { "type": "string" } } }
                            }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Review": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string" },
                            "bookId": { "type": "string" },
                            "reviewerName": { "type": "string" },
                            "rating": { "type": "integer", "minimum": 1, "maximum": 5 },
                            "comment": { "type": "string" },
                            "timestamp": { "type": "integer", "format": "int64" }
                        },
                        "required": ["id", "bookId", "reviewerName", "rating", "comment", "timestamp"]
                    },
                    "NewReview": {
                        "type": "object",
                        "properties": {
                            "reviewerName": { "type": "string" },
                            "rating": { "type": "integer", "minimum": 1, "maximum": 5 },
                            "comment": { "type": "string" }
                        },
                        "required": ["reviewerName", "rating", "comment"]
                    },
                    "BookReviews": {
                        "type": "object",
                        "properties": {
                            "reviews": {
                                "type": "array",
                                "items": { "$ref": "#/components/schemas/Review" }
                            },
                            "averageRating": { "type": "number" },
                            "bookId": { "type": "string" }
                        }
                    },
                    "AverageRating": {
                        "type": "object",
                        "properties": {
                            "bookId": { "type": "string" },
                            "averageRating": { "type": "number" }
                        }
                    }
                }
            }
        }))
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "reviews module stopped");
        Ok(())
    }
}

inventory::submit! {
    ModuleFactory {
        name: "reviews",
        create: || Arc::new(ReviewsModule::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, http::StatusCode};
    use folio_kernel::Resources;
    use tower::ServiceExt;

    fn memory_settings() -> Settings {
        let mut settings = Settings::default();
        settings.reviews.store = ReviewStoreBackend::Memory;
        settings.cache.backend = CacheBackend::Memory;
        settings
    }

    #[tokio::test]
    async fn init_with_in_memory_backends_serves_routes() {
        let module = ReviewsModule::new();
        let settings = memory_settings();
        let resources = Resources::new();

        module
            .init(&InitCtx {
                settings: &settings,
                resources: &resources,
            })
            .await
            .unwrap();

        let response = module
            .routes()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn invalid_catalog_url_fails_init() {
        let mut settings = memory_settings();
        settings.catalog.base_url = "not a url".to_string();

        let err = build_service(&settings).await.err().unwrap();
        assert!(format!("{err:#}").contains("invalid catalog endpoint"));
    }

    #[test]
    fn openapi_documents_every_route() {
        let spec = ReviewsModule::new().openapi().unwrap();
        let paths = spec["paths"].as_object().unwrap();
        for path in ["", "/book/{bookId}", "/book/{bookId}/average-rating", "/cache/book/{bookId}", "/{reviewId}"] {
            assert!(paths.contains_key(path), "missing {path}");
        }
    }
}
