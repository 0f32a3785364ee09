//! Repository layer for book persistence

pub mod books;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{AuthorCount, Book, CreateBook, ListParams, UpdateBook},
};

/// Storage port for the `books` table
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookStore: Send + Sync {
    /// Filtered, sorted page of books plus the filtered total
    async fn list(&self, params: &ListParams) -> AppResult<(Vec<Book>, i64)>;

    async fn get_by_id(&self, id: i32) -> AppResult<Book>;

    async fn create(&self, book: &CreateBook) -> AppResult<Book>;

    /// Write the fields present in `changes`, returning the stored row
    async fn update(&self, id: i32, changes: &UpdateBook) -> AppResult<Book>;

    async fn delete(&self, id: i32) -> AppResult<()>;

    /// Books with `start <= year <= end`
    async fn list_by_year_range(&self, start: i32, end: i32) -> AppResult<Vec<Book>>;

    /// Set the publisher of every book in one transaction
    async fn set_publisher_for_all(&self, publisher: i32) -> AppResult<u64>;

    async fn count_by_author(&self) -> AppResult<Vec<AuthorCount>>;

    /// Connectivity check used by the readiness endpoint
    async fn ping(&self) -> AppResult<()>;
}

/// Main repository struct holding the storage adapters
#[derive(Clone)]
pub struct Repository {
    pub books: Arc<dyn BookStore>,
}

impl Repository {
    /// Create a repository backed by PostgreSQL
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self::with_books(Arc::new(books::BooksRepository::new(pool)))
    }

    /// Create a repository backed by the in-process store
    pub fn in_memory() -> Self {
        Self::with_books(Arc::new(memory::MemoryBookStore::new()))
    }

    pub fn with_books(books: Arc<dyn BookStore>) -> Self {
        Self { books }
    }
}
