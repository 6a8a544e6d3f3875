//! `reqwest` implementation of [`BookRepository`]

use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

use super::BookRepository;
use crate::{
    config::ApiConfig,
    error::{AppError, AppResult},
    models::Book,
};

#[derive(Clone)]
pub struct HttpBookRepository {
    client: Client,
    base_url: String,
}

impl HttpBookRepository {
    /// Create a repository talking to `config.base_url`
    pub fn new(config: &ApiConfig) -> AppResult<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout())
            .build()
            .map_err(|e| AppError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request and turn non-2xx statuses into classified errors
    async fn send(&self, request: RequestBuilder, url: &str) -> AppResult<Response> {
        let response = request.send().await.map_err(|e| {
            tracing::warn!("Request to {} failed: {}", url, e);
            AppError::from(e)
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let error = AppError::from_status(status, &body);
        tracing::debug!("HTTP {} from {}: {}", status.as_u16(), url, error);
        Err(error)
    }

    async fn read_json<T: DeserializeOwned>(response: Response, url: &str) -> AppResult<T> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            tracing::warn!("Unexpected response body from {}: {}", url, e);
            AppError::Unknown(format!("unexpected response format from {}: {}", url, e))
        })
    }
}

#[async_trait]
impl BookRepository for HttpBookRepository {
    async fn list_all(&self) -> AppResult<Vec<Book>> {
        let url = self.url("/books/all");
        tracing::debug!("GET {}", url);

        match self.send(self.client.get(&url), &url).await {
            Ok(response) => Self::read_json(response, &url).await,
            // The API reports an empty library as 404
            Err(AppError::NotFound(_)) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    async fn get(&self, id: i64) -> AppResult<Book> {
        let url = self.url(&format!("/books/{}", id));
        tracing::debug!("GET {}", url);
        let response = self.send(self.client.get(&url), &url).await?;
        Self::read_json(response, &url).await
    }

    async fn exists(&self, id: i64) -> AppResult<bool> {
        let url = self.url(&format!("/books/exists/{}", id));
        tracing::debug!("GET {}", url);
        let response = self.send(self.client.get(&url), &url).await?;
        Self::read_json(response, &url).await
    }

    async fn count(&self) -> AppResult<u64> {
        let url = self.url("/books/count");
        tracing::debug!("GET {}", url);
        let response = self.send(self.client.get(&url), &url).await?;
        Self::read_json(response, &url).await
    }

    async fn create(&self, book: &Book) -> AppResult<Book> {
        if book.is_persisted() {
            return Err(AppError::field("id", "A new book must not carry an id"));
        }

        let url = self.url("/books/add");
        tracing::debug!("POST {}", url);
        let response = self.send(self.client.post(&url).json(book), &url).await?;
        let created: Book = Self::read_json(response, &url).await?;
        tracing::info!("Created book id={:?}", created.id);
        Ok(created)
    }

    async fn update(&self, id: i64, book: &Book) -> AppResult<Book> {
        if book.id.is_some_and(|own| own != id) {
            return Err(AppError::field("id", "Book id does not match the update target"));
        }

        let url = self.url("/books/update");
        tracing::debug!("PUT {}?id={}", url, id);
        let request = self.client.put(&url).query(&[("id", id)]).json(book);
        let response = self.send(request, &url).await?;
        let updated: Book = Self::read_json(response, &url).await?;
        tracing::info!("Updated book id={}", id);
        Ok(updated)
    }

    async fn delete(&self, id: i64) -> AppResult<()> {
        let url = self.url(&format!("/books/delete/{}", id));
        tracing::debug!("DELETE {}", url);
        let response = self.send(self.client.delete(&url), &url).await?;
        if response.status() != StatusCode::NO_CONTENT {
            tracing::debug!("Delete of id={} answered {}", id, response.status());
        }
        tracing::info!("Deleted book id={}", id);
        Ok(())
    }
}
