//! Catalog service: book queries and mutations

use std::time::Duration;

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{AuthorCount, Book, BookPage, BookQuery, CreateBook, ListParams, UpdateBook},
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
    query_timeout: Duration,
}

impl CatalogService {
    pub fn new(repository: Repository, query_timeout: Duration) -> Self {
        Self {
            repository,
            query_timeout,
        }
    }

    /// Filtered, sorted and paginated listing
    pub async fn list_books(&self, query: &BookQuery) -> AppResult<BookPage> {
        let params = ListParams::from_query(query)?;
        let (data, total) = self.repository.books.list(&params).await?;

        Ok(BookPage {
            data,
            total,
            page: params.page,
            limit: params.limit,
        })
    }

    /// Same as [`list_books`](Self::list_books), abandoned once the query
    /// budget is spent
    pub async fn list_books_with_timeout(&self, query: &BookQuery) -> AppResult<BookPage> {
        tokio::time::timeout(self.query_timeout, self.list_books(query))
            .await
            .map_err(|_| {
                tracing::warn!("Book listing exceeded {:?}, cancelled", self.query_timeout);
                AppError::Timeout("request timed out".to_string())
            })?
    }

    pub async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.repository.books.get_by_id(id).await
    }

    pub async fn create_book(&self, book: CreateBook) -> AppResult<Book> {
        book.validate()?;
        let created = self.repository.books.create(&book).await?;
        tracing::info!("Created book id={} title={:?}", created.id, created.title);
        Ok(created)
    }

    pub async fn update_book(&self, id: i32, changes: UpdateBook) -> AppResult<Book> {
        let blank = |field: &Option<String>| matches!(field.as_deref(), Some(""));
        if blank(&changes.title) || blank(&changes.author) {
            return Err(AppError::BadRequest(
                "title and author must not be empty".to_string(),
            ));
        }
        self.repository.books.update(id, &changes).await
    }

    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        self.repository.books.delete(id).await?;
        tracing::info!("Deleted book id={}", id);
        Ok(())
    }

    /// Books published between `start` and `end`, both inclusive
    pub async fn books_by_year_range(&self, start: i32, end: i32) -> AppResult<Vec<Book>> {
        self.repository.books.list_by_year_range(start, end).await
    }

    /// Set the publisher of every book, all or nothing
    pub async fn set_publisher_for_all(&self, publisher: i32) -> AppResult<u64> {
        let updated = self.repository.books.set_publisher_for_all(publisher).await?;
        tracing::info!("Publisher set to {} on {} books", publisher, updated);
        Ok(updated)
    }

    pub async fn count_by_author(&self) -> AppResult<Vec<AuthorCount>> {
        self.repository.books.count_by_author().await
    }

    pub async fn ping(&self) -> AppResult<()> {
        self.repository.books.ping().await
    }
}
