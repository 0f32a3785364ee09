//! Book model and catalog query types

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::error::{AppError, AppResult};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 10;

/// A catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    /// Server-generated identifier
    pub id: i32,
    pub title: String,
    pub author: String,
    pub year: i32,
    /// Publisher code
    pub publisher: i32,
}

/// Create book request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub title: String,
    #[validate(length(min = 1, message = "author must not be empty"))]
    pub author: String,
    #[serde(default)]
    pub year: i32,
    #[serde(default)]
    pub publisher: i32,
}

/// Partial update; absent fields keep their stored value
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateBook {
    pub title: Option<String>,
    pub author: Option<String>,
    pub year: Option<i32>,
    pub publisher: Option<i32>,
}

impl UpdateBook {
    /// Apply the present fields onto `book`
    pub fn apply_to(&self, book: &mut Book) {
        if let Some(ref title) = self.title {
            book.title = title.clone();
        }
        if let Some(ref author) = self.author {
            book.author = author.clone();
        }
        if let Some(year) = self.year {
            book.year = year;
        }
        if let Some(publisher) = self.publisher {
            book.publisher = publisher;
        }
    }
}

/// Column a listing can be sorted on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    Id,
    Title,
    Author,
    Year,
    Publisher,
}

impl SortField {
    pub fn column(&self) -> &'static str {
        match self {
            SortField::Id => "id",
            SortField::Title => "title",
            SortField::Author => "author",
            SortField::Year => "year",
            SortField::Publisher => "publisher",
        }
    }
}

impl std::str::FromStr for SortField {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(SortField::Id),
            "title" => Ok(SortField::Title),
            "author" => Ok(SortField::Author),
            "year" => Ok(SortField::Year),
            "publisher" => Ok(SortField::Publisher),
            other => Err(AppError::BadRequest(format!("unknown sort field: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// Anything other than `desc` sorts ascending
    pub fn parse_lenient(s: &str) -> Self {
        match s {
            "desc" => SortOrder::Desc,
            _ => SortOrder::Asc,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Raw query string of the book listing endpoints
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BookQuery {
    /// Page number (default: 1)
    pub page: Option<i64>,
    /// Books per page (default: 10)
    pub limit: Option<i64>,
    /// Sort column: id, title, author, year, publisher (default: id)
    pub sort: Option<String>,
    /// asc or desc (default: asc)
    pub order: Option<String>,
    /// Case-insensitive substring of the title
    pub title: Option<String>,
}

/// Normalized listing parameters handed to the book store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListParams {
    pub page: i64,
    pub limit: i64,
    pub sort: SortField,
    pub order: SortOrder,
    pub title: Option<String>,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
            sort: SortField::default(),
            order: SortOrder::default(),
            title: None,
        }
    }
}

impl ListParams {
    pub fn from_query(query: &BookQuery) -> AppResult<Self> {
        let sort = match query.sort.as_deref() {
            Some(sort) if !sort.is_empty() => sort.parse()?,
            _ => SortField::default(),
        };

        Ok(Self {
            page: query.page.unwrap_or(DEFAULT_PAGE),
            limit: query.limit.unwrap_or(DEFAULT_LIMIT),
            sort,
            order: query
                .order
                .as_deref()
                .map(SortOrder::parse_lenient)
                .unwrap_or_default(),
            title: query.title.clone().filter(|t| !t.is_empty()),
        })
    }

    /// Rows to skip: `(page - 1) * limit`, never negative
    pub fn offset(&self) -> i64 {
        self.page
            .saturating_sub(1)
            .saturating_mul(self.limit)
            .max(0)
    }

    /// Row cap; a negative limit means no cap
    pub fn row_limit(&self) -> Option<i64> {
        (self.limit >= 0).then_some(self.limit)
    }
}

/// One page of books
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BookPage {
    pub data: Vec<Book>,
    /// Number of books matching the filter, across all pages
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct YearRangeQuery {
    /// First year, inclusive
    pub start_year: i32,
    /// Last year, inclusive
    pub end_year: i32,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PublisherQuery {
    /// Publisher code applied to every book
    pub publisher: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AuthorCount {
    pub author: String,
    pub count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_order_falls_back_to_asc() {
        for order in ["asc", "", "ASC", "DESC", "sideways"] {
            assert_eq!(SortOrder::parse_lenient(order), SortOrder::Asc, "{order}");
        }
        assert_eq!(SortOrder::parse_lenient("desc"), SortOrder::Desc);
    }

    #[test]
    fn test_from_query_defaults() {
        let params = ListParams::from_query(&BookQuery::default()).unwrap();
        assert_eq!(params, ListParams::default());
        assert_eq!(params.offset(), 0);
        assert_eq!(params.row_limit(), Some(10));
    }

    #[test]
    fn test_from_query_rejects_unknown_sort_column() {
        let query = BookQuery {
            sort: Some("title; DROP TABLE books".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            ListParams::from_query(&query),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_empty_title_is_no_filter() {
        let query = BookQuery {
            title: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(ListParams::from_query(&query).unwrap().title, None);
    }

    #[test]
    fn test_pagination_boundaries_pass_through() {
        let page = |page, limit| ListParams {
            page,
            limit,
            ..Default::default()
        };

        assert_eq!(page(3, 10).offset(), 20);
        assert_eq!(page(0, 10).offset(), 0);
        assert_eq!(page(-5, 10).offset(), 0);
        assert_eq!(page(2, 0).row_limit(), Some(0));
        assert_eq!(page(2, -1).row_limit(), None);
        assert_eq!(page(2, -1).offset(), 0);
        assert_eq!(page(0, -1).offset(), 1);
        assert_eq!(page(i64::MAX, i64::MAX).offset(), i64::MAX);
    }

    #[test]
    fn test_partial_update_keeps_absent_fields() {
        let mut book = Book {
            id: 1,
            title: "War and Peace".to_string(),
            author: "Tolstoy".to_string(),
            year: 1869,
            publisher: 7,
        };

        UpdateBook {
            year: Some(1867),
            ..Default::default()
        }
        .apply_to(&mut book);

        assert_eq!(book.title, "War and Peace");
        assert_eq!(book.author, "Tolstoy");
        assert_eq!(book.year, 1867);
        assert_eq!(book.publisher, 7);
    }

    #[test]
    fn test_create_book_requires_title() {
        let book = CreateBook {
            title: String::new(),
            author: "Tolstoy".to_string(),
            year: 1869,
            publisher: 1,
        };
        assert!(book.validate().is_err());
    }
}
