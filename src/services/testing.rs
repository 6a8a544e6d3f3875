//! In-memory repository for service tests

use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Semaphore;

use crate::{
    error::{AppError, AppResult},
    models::Book,
    repository::BookRepository,
};

/// Holds books in memory. `list_all` reads the books on arrival, then waits
/// for [`GatedRepository::release`];
/// writes wait for [`GatedRepository::release_write`] once `gate_writes` was called.
pub(crate) struct GatedRepository {
    books: Mutex<Vec<Book>>,
    next_id: AtomicI64,
    list_gate: Option<Semaphore>,
    write_gate: Option<Semaphore>,
    fail_next_write: Mutex<Option<AppError>>,
    list_calls: AtomicUsize,
    write_calls: AtomicUsize,
}

impl GatedRepository {
    pub(crate) fn new(books: Vec<Book>) -> Self {
        Self::build(books, true)
    }

    /// No gate on reads
    pub(crate) fn open(books: Vec<Book>) -> Self {
        Self::build(books, false)
    }

    fn build(books: Vec<Book>, gated: bool) -> Self {
        let next_id = books.iter().filter_map(|b| b.id).max().unwrap_or(0) + 1;
        Self {
            books: Mutex::new(books),
            next_id: AtomicI64::new(next_id),
            list_gate: gated.then(|| Semaphore::new(0)),
            write_gate: None,
            fail_next_write: Mutex::new(None),
            list_calls: AtomicUsize::new(0),
            write_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn gate_writes(mut self) -> Self {
        self.write_gate = Some(Semaphore::new(0));
        self
    }

    pub(crate) fn release(&self) {
        if let Some(gate) = &self.list_gate {
            gate.add_permits(1);
        }
    }

    pub(crate) fn release_write(&self) {
        if let Some(gate) = &self.write_gate {
            gate.add_permits(1);
        }
    }

    pub(crate) fn fail_next_write(&self, error: AppError) {
        *self.fail_next_write.lock().unwrap() = Some(error);
    }

    pub(crate) fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn write_calls(&self) -> usize {
        self.write_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn ids(&self) -> Vec<i64> {
        self.books.lock().unwrap().iter().filter_map(|b| b.id).collect()
    }

    async fn pass_write_gate(&self) -> AppResult<()> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.write_gate {
            gate.acquire().await.unwrap().forget();
        }
        match self.fail_next_write.lock().unwrap().take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl BookRepository for GatedRepository {
    async fn list_all(&self) -> AppResult<Vec<Book>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        // Answer with the collection as it was when the request arrived
        let books = self.books.lock().unwrap().clone();
        if let Some(gate) = &self.list_gate {
            gate.acquire().await.unwrap().forget();
        }
        Ok(books)
    }

    async fn get(&self, id: i64) -> AppResult<Book> {
        self.books
            .lock()
            .unwrap()
            .iter()
            .find(|b| b.id == Some(id))
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Book not found with id: {}", id)))
    }

    async fn exists(&self, id: i64) -> AppResult<bool> {
        Ok(self.books.lock().unwrap().iter().any(|b| b.id == Some(id)))
    }

    async fn count(&self) -> AppResult<u64> {
        Ok(self.books.lock().unwrap().len() as u64)
    }

    async fn create(&self, book: &Book) -> AppResult<Book> {
        self.pass_write_gate().await?;
        let created = Book {
            id: Some(self.next_id.fetch_add(1, Ordering::SeqCst)),
            title: book.title.clone(),
            author: book.author.clone(),
            created_on: Some(Utc::now()),
        };
        self.books.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: i64, book: &Book) -> AppResult<Book> {
        self.pass_write_gate().await?;
        let mut books = self.books.lock().unwrap();
        let stored = books
            .iter_mut()
            .find(|b| b.id == Some(id))
            .ok_or_else(|| AppError::NotFound(format!("Book not found with id: {}", id)))?;
        stored.title = book.title.clone();
        stored.author = book.author.clone();
        Ok(stored.clone())
    }

    async fn delete(&self, id: i64) -> AppResult<()> {
        self.pass_write_gate().await?;
        let mut books = self.books.lock().unwrap();
        let before = books.len();
        books.retain(|b| b.id != Some(id));
        if books.len() == before {
            return Err(AppError::NotFound(format!("Book not found with id: {}", id)));
        }
        Ok(())
    }
}
