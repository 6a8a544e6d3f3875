//! Repository layer for the library REST API

pub mod http;

use async_trait::async_trait;

use crate::{error::AppResult, models::Book};

pub use http::HttpBookRepository;

/// CRUD access to the remote book collection.
///
/// Every call is a single request/response: no retries and no local caching.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// All books, in the order the server returns them
    async fn list_all(&self) -> AppResult<Vec<Book>>;

    async fn get(&self, id: i64) -> AppResult<Book>;

    async fn exists(&self, id: i64) -> AppResult<bool>;

    async fn count(&self) -> AppResult<u64>;

    /// Persist an unsaved book; the result carries the server-assigned id and creation date
    async fn create(&self, book: &Book) -> AppResult<Book>;

    async fn update(&self, id: i64, book: &Book) -> AppResult<Book>;

    async fn delete(&self, id: i64) -> AppResult<()>;
}
