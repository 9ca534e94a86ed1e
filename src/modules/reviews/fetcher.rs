//! Remote lookups of catalog books, over GraphQL or REST.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use folio_kernel::settings::{CatalogSettings, CatalogTransport};

use crate::modules::books::models::Book;

const BOOK_QUERY: &str = "query Book($id: ID!) { book(id: $id) { id title author year } }";

/// Why a remote lookup produced no book
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("book {0} does not exist in the catalog")]
    NotFound(String),

    #[error("catalog request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("catalog answered with status {0}")]
    Status(StatusCode),

    #[error("catalog response is malformed: {0}")]
    Malformed(String),

    #[error("catalog reported errors: {0}")]
    Upstream(String),

    #[error("invalid catalog endpoint {url}: {reason}")]
    InvalidEndpoint { url: String, reason: String },
}

impl FetchError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Log label separating a missing book from an unreachable catalog
    pub fn outcome(&self) -> &'static str {
        if self.is_not_found() {
            "not_found"
        } else {
            "upstream_failure"
        }
    }
}

/// Fetches a single book from the catalog service
#[async_trait]
pub trait BookFetcher: Send + Sync {
    async fn fetch(&self, book_id: &str) -> Result<Book, FetchError>;

    /// Short transport name for logs
    fn transport(&self) -> &'static str;
}

/// Build the fetcher selected by `settings.transport`
pub fn from_settings(settings: &CatalogSettings) -> Result<Arc<dyn BookFetcher>, FetchError> {
    let client = http_client(settings)?;
    let fetcher: Arc<dyn BookFetcher> = match settings.transport {
        CatalogTransport::Graphql => Arc::new(GraphqlBookFetcher::new(
            client,
            &join_url(&settings.base_url, &settings.graphql_path),
        )?),
        CatalogTransport::Rest => Arc::new(RestBookFetcher::new(
            client,
            &join_url(&settings.base_url, &settings.rest_path),
        )?),
    };
    Ok(fetcher)
}

fn http_client(settings: &CatalogSettings) -> Result<Client, FetchError> {
    Ok(Client::builder()
        .connect_timeout(Duration::from_millis(settings.connect_timeout_ms))
        .timeout(Duration::from_millis(settings.request_timeout_ms))
        .build()?)
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

fn parse_endpoint(url: &str) -> Result<Url, FetchError> {
    let parsed = Url::parse(url).map_err(|err| FetchError::InvalidEndpoint {
        url: url.to_string(),
        reason: err.to_string(),
    })?;
    if parsed.cannot_be_a_base() {
        return Err(FetchError::InvalidEndpoint {
            url: url.to_string(),
            reason: "not a base URL".to_string(),
        });
    }
    Ok(parsed)
}

/// Book as the catalog serializes it; REST ids may be numbers.
#[derive(Debug, Deserialize)]
struct RemoteBook {
    id: serde_json::Value,
    title: String,
    author: String,
    year: i32,
}

impl TryFrom<RemoteBook> for Book {
    type Error = FetchError;

    fn try_from(remote: RemoteBook) -> Result<Self, FetchError> {
        let id = match remote.id {
            serde_json::Value::String(id) => id,
            serde_json::Value::Number(id) => id.to_string(),
            other => return Err(FetchError::Malformed(format!("book id {other} is not a scalar"))),
        };
        Ok(Book {
            id,
            title: remote.title,
            author: remote.author,
            year: remote.year,
        })
    }
}

#[derive(Debug, Deserialize)]
struct GraphqlEnvelope {
    data: Option<BookData>,
    #[serde(default)]
    errors: Vec<GraphqlErrorMessage>,
}

#[derive(Debug, Deserialize)]
struct BookData {
    book: Option<RemoteBook>,
}

#[derive(Debug, Deserialize)]
struct GraphqlErrorMessage {
    message: String,
}

/// Issues the catalog's `book(id:)` query
pub struct GraphqlBookFetcher {
    client: Client,
    endpoint: Url,
}

impl GraphqlBookFetcher {
    pub fn new(client: Client, endpoint: &str) -> Result<Self, FetchError> {
        Ok(Self {
            client,
            endpoint: parse_endpoint(endpoint)?,
        })
    }
}

#[async_trait]
impl BookFetcher for GraphqlBookFetcher {
    async fn fetch(&self, book_id: &str) -> Result<Book, FetchError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&json!({ "query": BOOK_QUERY, "variables": { "id": book_id } }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let bytes = response.bytes().await?;
        let envelope: GraphqlEnvelope =
            serde_json::from_slice(&bytes).map_err(|err| FetchError::Malformed(err.to_string()))?;

        if !envelope.errors.is_empty() {
            let messages: Vec<_> = envelope.errors.into_iter().map(|e| e.message).collect();
            return Err(FetchError::Upstream(messages.join("; ")));
        }

        match envelope.data.and_then(|data| data.book) {
            Some(remote) => Book::try_from(remote),
            None => Err(FetchError::NotFound(book_id.to_string())),
        }
    }

    fn transport(&self) -> &'static str {
        "graphql"
    }
}

/// Reads `GET {endpoint}/{id}` from the catalog REST surface
pub struct RestBookFetcher {
    client: Client,
    endpoint: Url,
}

impl RestBookFetcher {
    pub fn new(client: Client, endpoint: &str) -> Result<Self, FetchError> {
        Ok(Self {
            client,
            endpoint: parse_endpoint(endpoint)?,
        })
    }

    fn book_url(&self, book_id: &str) -> Url {
        let mut url = self.endpoint.clone();
        // cannot_be_a_base was rejected in parse_endpoint
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(book_id);
        }
        url
    }
}

#[async_trait]
impl BookFetcher for RestBookFetcher {
    async fn fetch(&self, book_id: &str) -> Result<Book, FetchError> {
        let response = self.client.get(self.book_url(book_id)).send().await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(book_id.to_string()));
        }
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let bytes = response.bytes().await?;
        let remote: RemoteBook =
            serde_json::from_slice(&bytes).map_err(|err| FetchError::Malformed(err.to_string()))?;
        Book::try_from(remote)
    }

    fn transport(&self) -> &'static str {
        "rest"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings(server: &MockServer, transport: CatalogTransport) -> CatalogSettings {
        CatalogSettings {
            base_url: server.uri(),
            transport,
            request_timeout_ms: 500,
            ..CatalogSettings::default()
        }
    }

    #[tokio::test]
    async fn graphql_fetch_returns_book() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .and(body_partial_json(json!({ "variables": { "id": "7" } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "book": { "id": "7", "title": "Dune", "author": "Frank Herbert", "year": 1965 } }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = from_settings(&settings(&server, CatalogTransport::Graphql)).unwrap();
        let book = fetcher.fetch("7").await.unwrap();

        assert_eq!(book.title, "Dune");
        assert_eq!(fetcher.transport(), "graphql");
    }

    #[tokio::test]
    async fn graphql_null_book_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "book": null } })))
            .mount(&server)
            .await;

        let fetcher = from_settings(&settings(&server, CatalogTransport::Graphql)).unwrap();
        let err = fetcher.fetch("404").await.unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(err.outcome(), "not_found");
    }

    #[tokio::test]
    async fn graphql_errors_are_upstream_failures() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": null,
                "errors": [{ "message": "boom" }]
            })))
            .mount(&server)
            .await;

        let fetcher = from_settings(&settings(&server, CatalogTransport::Graphql)).unwrap();
        let err = fetcher.fetch("1").await.unwrap_err();

        assert!(matches!(err, FetchError::Upstream(ref message) if message == "boom"));
        assert_eq!(err.outcome(), "upstream_failure");
    }

    #[tokio::test]
    async fn server_errors_and_garbage_are_upstream_failures() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/books/1"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/books/2"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let fetcher = from_settings(&settings(&server, CatalogTransport::Rest)).unwrap();

        let status = fetcher.fetch("1").await.unwrap_err();
        assert!(matches!(status, FetchError::Status(code) if code == StatusCode::SERVICE_UNAVAILABLE));

        let malformed = fetcher.fetch("2").await.unwrap_err();
        assert!(matches!(malformed, FetchError::Malformed(_)));
    }

    #[tokio::test]
    async fn rest_fetch_accepts_numeric_ids_and_maps_404() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/books/3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 3, "title": "Emma", "author": "Jane Austen", "year": 1815
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/books/4"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = from_settings(&settings(&server, CatalogTransport::Rest)).unwrap();

        assert_eq!(fetcher.fetch("3").await.unwrap().id, "3");
        assert!(fetcher.fetch("4").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn slow_catalog_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_secs(2))
                    .set_body_json(json!({ "data": { "book": null } })),
            )
            .mount(&server)
            .await;

        let fetcher = from_settings(&settings(&server, CatalogTransport::Graphql)).unwrap();
        let err = fetcher.fetch("1").await.unwrap_err();

        assert!(matches!(err, FetchError::Transport(_)));
    }

    #[test]
    fn rejects_unusable_endpoints() {
        let client = Client::new();
        assert!(matches!(
            GraphqlBookFetcher::new(client.clone(), "not a url"),
            Err(FetchError::InvalidEndpoint { .. })
        ));
        assert!(matches!(
            RestBookFetcher::new(client, "mailto:catalog@example.com"),
            Err(FetchError::InvalidEndpoint { .. })
        ));
    }

    #[test]
    fn rest_urls_escape_ids() {
        let fetcher = RestBookFetcher::new(Client::new(), "http://catalog:8080/api/books/").unwrap();
        assert_eq!(fetcher.book_url("a b").as_str(), "http://catalog:8080/api/books/a%20b");
    }

    #[test]
    fn join_url_normalizes_slashes() {
        assert_eq!(join_url("http://h:1/", "/graphql"), "http://h:1/graphql");
        assert_eq!(join_url("http://h:1", "api/books"), "http://h:1/api/books");
    }
}
