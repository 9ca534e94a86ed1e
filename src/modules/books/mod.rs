//! Book catalog: GraphQL at `/graphql`, REST under `/api/books`.

pub mod graphql;
pub mod models;
pub mod repository;
pub mod routes;
pub mod service;
pub mod validation;

use std::sync::{Arc, OnceLock};

use anyhow::Context;
use async_graphql::dynamic::Schema;
use async_trait::async_trait;
use axum::{routing::get, Router};
use folio_db::sqlite::Database;
use folio_kernel::{InitCtx, Migration, Module, ModuleFactory};

use repository::SqliteBookRepository;
use service::BookService;

struct BooksState {
    service: BookService,
    schema: Schema,
}

/// Catalog module backed by the shared SQLite [`Database`] resource
pub struct BooksModule {
    state: OnceLock<BooksState>,
}

impl BooksModule {
    pub const fn new() -> Self {
        Self {
            state: OnceLock::new(),
        }
    }

    fn state(&self) -> Option<&BooksState> {
        let state = self.state.get();
        if state.is_none() {
            tracing::warn!(module = self.name(), "routes requested before init");
        }
        state
    }
}

impl Default for BooksModule {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let db = ctx.resource::<Database>()?.clone();
        let service = BookService::new(Arc::new(SqliteBookRepository::new(db)));
        let schema = graphql::build_schema(service.clone()).context("invalid catalog schema")?;

        if self.state.set(BooksState { service, schema }).is_err() {
            anyhow::bail!("books module initialized twice");
        }

        tracing::info!(
            module = self.name(),
            database = %ctx.settings.database.path,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        match self.state() {
            Some(state) => routes::router(state.service.clone()),
            None => Router::new(),
        }
    }

    fn root_routes(&self) -> Router {
        match self.state() {
            Some(state) => Router::new()
                .route("/graphql", axum::routing::post(graphql::graphql_handler))
                .route("/graphql/schema", get(graphql::schema_sdl))
                .with_state(state.schema.clone()),
            None => Router::new(),
        }
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let error = serde_json::json!({
            "description": "Error envelope",
            "content": {
                "application/json": {
                    "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                }
            }
        });
        let book = serde_json::json!({
            "description": "Book",
            "content": {
                "application/json": { "schema": { "$ref": "#/components/schemas/Book" } }
            }
        });
        let book_input = serde_json::json!({
            "required": true,
            "content": {
                "application/json": { "schema": { "$ref": "#/components/schemas/BookInput" } }
            }
        });
        let id_param = serde_json::json!([{
            "name": "id",
            "in": "path",
            "required": true,
            "schema": { "type": "string" }
        }]);

        Some(serde_json::json!({
            "paths": {
                "": {
                    "get": {
                        "summary": "List books, optionally filtered by author",
                        "tags": ["Books"],
                        "parameters": [{
                            "name": "author",
                            "in": "query",
                            "required": false,
                            "schema": { "type": "string" }
                        }],
                        "responses": {
                            "200": {
                                "description": "Books",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "array",
                                            "items": { "$ref": "#/components/schemas/Book" }
                                        }
                                    }
                                }
                            },
                            "500": error
                        }
                    },
                    "post": {
                        "summary": "Add a book",
                        "tags": ["Books"],
                        "requestBody": book_input,
                        "responses": { "201": book, "400": error }
                    }
                },
                "/{id}": {
                    "get": {
                        "summary": "Get a book by id",
                        "tags": ["Books"],
                        "parameters": id_param,
                        "responses": { "200": book, "404": error }
                    },
                    "put": {
                        "summary": "Replace a book",
                        "tags": ["Books"],
                        "parameters": id_param,
                        "requestBody": book_input,
                        "responses": { "200": book, "400": error, "404": error }
                    },
                    "delete": {
                        "summary": "Delete a book",
                        "tags": ["Books"],
                        "parameters": id_param,
                        "responses": {
                            "204": { "description": "Deleted" },
                            "404": error
                        }
                    }
                },
                "/health": {
                    "get": {
                        "summary": "Catalog health check",
                        "tags": ["Books"],
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
                    "Book": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string" },
                            "title": { "type": "string" },
                            "author": { "type": "string" },
                            "year": { "type": "integer" }
                        },
                        "required": ["id", "title", "author", "year"]
                    },
                    "BookInput": {
                        "type": "object",
                        "properties": {
                            "title": { "type": "string" },
                            "author": { "type": "string" },
                            "year": { "type": "integer", "minimum": 0 }
                        },
                        "required": ["title", "author", "year"]
                    }
                }
            }
        }))
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![
            Migration {
                id: "001_init",
                up: r#"
                CREATE TABLE IF NOT EXISTS books (
                    id     INTEGER PRIMARY KEY AUTOINCREMENT,
                    title  TEXT NOT NULL,
                    author TEXT NOT NULL,
                    year   INTEGER NOT NULL
                );
                "#,
            },
            Migration {
                id: "002_author_index",
                up: "CREATE INDEX IF NOT EXISTS books_author_idx ON books (author);",
            },
        ]
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

inventory::submit! {
    ModuleFactory {
        name: "books",
        create: || Arc::new(BooksModule::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, http::StatusCode};
    use folio_kernel::{settings::Settings, Resources};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn initialized() -> BooksModule {
        let module = BooksModule::new();
        let db = Database::open_in_memory().unwrap();
        let migrations = module
            .migrations()
            .into_iter()
            .map(|migration| ("books".to_string(), migration))
            .collect();
        db.migrate(migrations).await.unwrap();

        let mut resources = Resources::new();
        resources.insert(db);
        let settings = Settings::default();
        module
            .init(&InitCtx {
                settings: &settings,
                resources: &resources,
            })
            .await
            .unwrap();
        module
    }

    #[tokio::test]
    async fn init_requires_database_resource() {
        let module = BooksModule::new();
        let resources = Resources::new();
        let settings = Settings::default();

        let err = module
            .init(&InitCtx {
                settings: &settings,
                resources: &resources,
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Database"));
    }

    #[tokio::test]
    async fn routes_are_empty_before_init() {
        let module = BooksModule::new();
        let response = module
            .root_routes()
            .oneshot(Request::builder().uri("/graphql/schema").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn graphql_endpoint_executes_queries() {
        let module = initialized().await;

        let response = module
            .root_routes()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/graphql")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"query":"{ allBooks { id } }"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["data"]["allBooks"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn schema_endpoint_serves_sdl() {
        let module = initialized().await;

        let response = module
            .root_routes()
            .oneshot(Request::builder().uri("/graphql/schema").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert!(String::from_utf8_lossy(&bytes).contains("type Book"));
    }

    #[test]
    fn migrations_are_ordered() {
        let ids: Vec<_> = BooksModule::new().migrations().iter().map(|m| m.id).collect();
        assert_eq!(ids, ["001_init", "002_author_index"]);
    }
}
