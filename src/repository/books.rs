//! PostgreSQL book store

use async_trait::async_trait;
use sqlx::{PgConnection, Pool, Postgres};

use super::BookStore;
use crate::{
    error::{AppError, AppResult},
    models::{AuthorCount, Book, CreateBook, ListParams, UpdateBook},
};

const TITLE_FILTER: &str = "($1::text IS NULL OR title ILIKE $1)";

/// Build an ILIKE pattern matching `needle` anywhere, with wildcards escaped
fn contains_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// Set the publisher of every row; the caller owns the transaction
async fn update_publisher(conn: &mut PgConnection, publisher: i32) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE books SET publisher = $1")
        .bind(publisher)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookStore for BooksRepository {
    async fn list(&self, params: &ListParams) -> AppResult<(Vec<Book>, i64)> {
        let pattern = params.title.as_deref().map(contains_pattern);

        let count_query = format!("SELECT COUNT(*) FROM books WHERE {}", TITLE_FILTER);
        let total: i64 = sqlx::query_scalar(&count_query)
            .bind(&pattern)
            .fetch_one(&self.pool)
            .await?;

        // Sort column and direction come from closed enums, never from raw input
        let select_query = format!(
            r#"
            SELECT id, title, author, year, publisher
            FROM books
            WHERE {}
            ORDER BY {} {}, id
            LIMIT $2 OFFSET $3
            "#,
            TITLE_FILTER,
            params.sort.column(),
            params.order.as_sql()
        );

        let books = sqlx::query_as::<_, Book>(&select_query)
            .bind(&pattern)
            .bind(params.row_limit())
            .bind(params.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok((books, total))
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(
            "SELECT id, title, author, year, publisher FROM books WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Book not found".to_string()))
    }

    async fn create(&self, book: &CreateBook) -> AppResult<Book> {
        let row = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (title, author, year, publisher)
            VALUES ($1, $2, $3, $4)
            RETURNING id, title, author, year, publisher
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.year)
        .bind(book.publisher)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn update(&self, id: i32, changes: &UpdateBook) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(
            r#"
            UPDATE books SET
                title = COALESCE($1::text, title),
                author = COALESCE($2::text, author),
                year = COALESCE($3::int, year),
                publisher = COALESCE($4::int, publisher)
            WHERE id = $5
            RETURNING id, title, author, year, publisher
            "#,
        )
        .bind(&changes.title)
        .bind(&changes.author)
        .bind(changes.year)
        .bind(changes.publisher)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Book not found".to_string()))
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Book not found".to_string()));
        }
        Ok(())
    }

    async fn list_by_year_range(&self, start: i32, end: i32) -> AppResult<Vec<Book>> {
        let rows = sqlx::query_as::<_, Book>(
            r#"
            SELECT id, title, author, year, publisher
            FROM books
            WHERE year BETWEEN $1 AND $2
            ORDER BY year, id
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn set_publisher_for_all(&self, publisher: i32) -> AppResult<u64> {
        // Dropping the transaction on an early return rolls it back
        let mut tx = self.pool.begin().await?;

        let updated = update_publisher(&mut tx, publisher).await?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn count_by_author(&self) -> AppResult<Vec<AuthorCount>> {
        let rows = sqlx::query_as::<_, AuthorCount>(
            r#"
            SELECT author, COUNT(*) AS count
            FROM books
            GROUP BY author
            ORDER BY author
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::book::SortOrder;
    use sqlx::PgPool;

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("war"), "%war%");
        assert_eq!(contains_pattern("100%"), "%100\\%%");
        assert_eq!(contains_pattern("a_b"), "%a\\_b%");
    }

    // The tests below need a PostgreSQL server.
    // Run with: DATABASE_URL=postgres://... cargo test -- --ignored

    async fn seeded(pool: PgPool) -> BooksRepository {
        let repo = BooksRepository::new(pool);
        for (title, author, year) in [
            ("War and Peace", "Tolstoy", 1869),
            ("Anna Karenina", "Tolstoy", 1878),
            ("The Art of War", "Sun Tzu", -500),
            ("100% Cotton", "Weaver", 2001),
        ] {
            repo.create(&CreateBook {
                title: title.to_string(),
                author: author.to_string(),
                year,
                publisher: 1,
            })
            .await
            .unwrap();
        }
        repo
    }

    async fn publishers(repo: &BooksRepository) -> Vec<i32> {
        let (books, _) = repo
            .list(&ListParams {
                limit: -1,
                ..Default::default()
            })
            .await
            .unwrap();
        books.iter().map(|b| b.publisher).collect()
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore]
    async fn test_list_filters_sorts_and_limits(pool: PgPool) {
        let repo = seeded(pool).await;

        let (books, total) = repo
            .list(&ListParams {
                title: Some("WAR".to_string()),
                sort: "year".parse().unwrap(),
                order: SortOrder::Desc,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(total, 2);
        let titles: Vec<_> = books.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["War and Peace", "The Art of War"]);

        // `%` in the filter is literal
        let (books, total) = repo
            .list(&ListParams {
                title: Some("0%".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(books[0].title, "100% Cotton");

        let (books, total) = repo
            .list(&ListParams {
                page: 2,
                limit: 3,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(total, 4);
        assert_eq!(books.len(), 1);

        let (books, _) = repo
            .list(&ListParams {
                limit: -1,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(books.len(), 4);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore]
    async fn test_partial_update_keeps_absent_fields(pool: PgPool) {
        let repo = seeded(pool).await;
        let (books, _) = repo.list(&ListParams::default()).await.unwrap();
        let original = books[0].clone();

        let updated = repo
            .update(
                original.id,
                &UpdateBook {
                    year: Some(1870),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.year, 1870);
        assert_eq!(updated.title, original.title);
        assert_eq!(updated.author, original.author);
        assert_eq!(updated.publisher, original.publisher);
        assert_eq!(repo.get_by_id(original.id).await.unwrap(), updated);

        let missing = repo.update(9999, &UpdateBook::default()).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore]
    async fn test_delete_missing_is_not_found(pool: PgPool) {
        let repo = seeded(pool).await;
        let (books, _) = repo.list(&ListParams::default()).await.unwrap();
        let id = books[0].id;

        repo.delete(id).await.unwrap();
        assert!(matches!(repo.delete(id).await, Err(AppError::NotFound(_))));
        assert!(matches!(repo.get_by_id(id).await, Err(AppError::NotFound(_))));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore]
    async fn test_year_range_and_author_counts(pool: PgPool) {
        let repo = seeded(pool).await;

        let books = repo.list_by_year_range(1869, 1878).await.unwrap();
        assert_eq!(books.len(), 2);

        let counts = repo.count_by_author().await.unwrap();
        let tolstoy = counts.iter().find(|c| c.author == "Tolstoy").unwrap();
        assert_eq!(tolstoy.count, 2);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore]
    async fn test_publisher_update_commits(pool: PgPool) {
        let repo = seeded(pool).await;

        assert_eq!(repo.set_publisher_for_all(7).await.unwrap(), 4);
        assert_eq!(publishers(&repo).await, vec![7; 4]);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore]
    async fn test_publisher_update_rolls_back_when_a_row_fails(pool: PgPool) {
        let repo = seeded(pool.clone()).await;

        sqlx::query(
            r#"
            CREATE FUNCTION reject_cotton() RETURNS trigger AS $$
            BEGIN
                IF NEW.title = '100% Cotton' THEN
                    RAISE EXCEPTION 'publisher rejected';
                END IF;
                RETURN NEW;
            END
            $$ LANGUAGE plpgsql
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(
            "CREATE TRIGGER reject_cotton BEFORE UPDATE ON books \
             FOR EACH ROW EXECUTE FUNCTION reject_cotton()",
        )
        .execute(&pool)
        .await
        .unwrap();

        let result = repo.set_publisher_for_all(7).await;
        assert!(matches!(result, Err(AppError::Database(_))));
        assert_eq!(publishers(&repo).await, vec![1; 4]);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore]
    async fn test_uncommitted_publisher_update_is_discarded(pool: PgPool) {
        let repo = seeded(pool.clone()).await;

        {
            let mut tx = pool.begin().await.unwrap();
            assert_eq!(update_publisher(&mut tx, 7).await.unwrap(), 4);

            // A later statement in the same transaction fails before commit
            let failed = sqlx::query("SELECT 1 / 0").execute(&mut *tx).await;
            assert!(failed.is_err());
        }

        assert_eq!(publishers(&repo).await, vec![1; 4]);
    }
}
