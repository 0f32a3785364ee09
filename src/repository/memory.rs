//! In-process book store
//!
//! Used when `database.url` is `memory:` and by the test suites. Writes are
//! serialized by a single `RwLock`; bulk updates are staged on a copy of the
//! table and swapped in only when every row succeeded.

use std::{cmp::Ordering, collections::BTreeMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::BookStore;
use crate::{
    error::{AppError, AppResult},
    models::{
        book::{SortField, SortOrder},
        AuthorCount, Book, CreateBook, ListParams, UpdateBook,
    },
};

struct Table {
    next_id: i32,
    rows: BTreeMap<i32, Book>,
}

pub struct MemoryBookStore {
    table: RwLock<Table>,
}

impl Default for MemoryBookStore {
    fn default() -> Self {
        Self::new()
    }
}

fn compare(a: &Book, b: &Book, sort: SortField, order: SortOrder) -> Ordering {
    let by_field = match sort {
        SortField::Id => a.id.cmp(&b.id),
        SortField::Title => a.title.cmp(&b.title),
        SortField::Author => a.author.cmp(&b.author),
        SortField::Year => a.year.cmp(&b.year),
        SortField::Publisher => a.publisher.cmp(&b.publisher),
    };
    let by_field = match order {
        SortOrder::Asc => by_field,
        SortOrder::Desc => by_field.reverse(),
    };
    by_field.then(a.id.cmp(&b.id))
}

fn not_found() -> AppError {
    AppError::NotFound("Book not found".to_string())
}

impl MemoryBookStore {
    pub fn new() -> Self {
        Self {
            table: RwLock::new(Table {
                next_id: 1,
                rows: BTreeMap::new(),
            }),
        }
    }

    /// Apply `change` to every row atomically.
    ///
    /// Rows are modified on a staged copy; the first error discards the copy
    /// and leaves the table untouched.
    pub async fn update_all<F>(&self, mut change: F) -> AppResult<u64>
    where
        F: FnMut(&mut Book) -> AppResult<()> + Send,
    {
        let mut table = self.table.write().await;
        let mut staged = table.rows.clone();

        for book in staged.values_mut() {
            change(book)?;
        }

        let updated = staged.len() as u64;
        table.rows = staged;
        Ok(updated)
    }
}

#[async_trait]
impl BookStore for MemoryBookStore {
    async fn list(&self, params: &ListParams) -> AppResult<(Vec<Book>, i64)> {
        let table = self.table.read().await;
        let needle = params.title.as_ref().map(|t| t.to_lowercase());

        let mut matching: Vec<Book> = table
            .rows
            .values()
            .filter(|book| {
                needle
                    .as_deref()
                    .map_or(true, |needle| book.title.to_lowercase().contains(needle))
            })
            .cloned()
            .collect();

        let total = matching.len() as i64;
        matching.sort_by(|a, b| compare(a, b, params.sort, params.order));

        let offset = usize::try_from(params.offset()).unwrap_or(usize::MAX);
        let limit = params
            .row_limit()
            .map(|limit| usize::try_from(limit).unwrap_or(usize::MAX))
            .unwrap_or(usize::MAX);

        let page = matching.into_iter().skip(offset).take(limit).collect();
        Ok((page, total))
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        self.table
            .read()
            .await
            .rows
            .get(&id)
            .cloned()
            .ok_or_else(not_found)
    }

    async fn create(&self, book: &CreateBook) -> AppResult<Book> {
        let mut table = self.table.write().await;
        let id = table.next_id;
        table.next_id += 1;

        let created = Book {
            id,
            title: book.title.clone(),
            author: book.author.clone(),
            year: book.year,
            publisher: book.publisher,
        };
        table.rows.insert(id, created.clone());
        Ok(created)
    }

    async fn update(&self, id: i32, changes: &UpdateBook) -> AppResult<Book> {
        let mut table = self.table.write().await;
        let book = table.rows.get_mut(&id).ok_or_else(not_found)?;
        changes.apply_to(book);
        Ok(book.clone())
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        self.table
            .write()
            .await
            .rows
            .remove(&id)
            .map(|_| ())
            .ok_or_else(not_found)
    }

    async fn list_by_year_range(&self, start: i32, end: i32) -> AppResult<Vec<Book>> {
        let table = self.table.read().await;
        let mut books: Vec<Book> = table
            .rows
            .values()
            .filter(|book| book.year >= start && book.year <= end)
            .cloned()
            .collect();
        books.sort_by(|a, b| compare(a, b, SortField::Year, SortOrder::Asc));
        Ok(books)
    }

    async fn set_publisher_for_all(&self, publisher: i32) -> AppResult<u64> {
        self.update_all(|book| {
            book.publisher = publisher;
            Ok(())
        })
        .await
    }

    async fn count_by_author(&self) -> AppResult<Vec<AuthorCount>> {
        let table = self.table.read().await;
        let mut counts: BTreeMap<&str, i64> = BTreeMap::new();
        for book in table.rows.values() {
            *counts.entry(book.author.as_str()).or_default() += 1;
        }

        Ok(counts
            .into_iter()
            .map(|(author, count)| AuthorCount {
                author: author.to_string(),
                count,
            })
            .collect())
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}
