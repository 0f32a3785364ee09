//! Book catalog endpoints

use axum::{extract::State, http::StatusCode, Json};

use crate::{
    error::AppResult,
    models::{
        book::{PublisherQuery, YearRangeQuery},
        user::MessageResponse,
        AuthorCount, Book, BookPage, BookQuery, CreateBook, UpdateBook,
    },
    AppState,
};

use super::{AuthenticatedUser, JsonBody, PathParam, QueryParams};

/// List books with title filter, sorting and pagination
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    security(("token" = [])),
    params(BookQuery),
    responses(
        (status = 200, description = "Page of books", body = BookPage),
        (status = 400, description = "Invalid query", body = crate::error::ErrorResponse),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_books(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<BookQuery>,
) -> AppResult<Json<BookPage>> {
    let page = state.services.catalog.list_books(&query).await?;
    Ok(Json(page))
}

/// List books, giving up when the query exceeds its time budget
#[utoipa::path(
    get,
    path = "/books/with-timeout",
    tag = "books",
    security(("token" = [])),
    params(BookQuery),
    responses(
        (status = 200, description = "Page of books", body = BookPage),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse),
        (status = 408, description = "Request timed out", body = crate::error::ErrorResponse),
        (status = 500, description = "Failed to fetch books", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_books_with_timeout(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<BookQuery>,
) -> AppResult<Json<BookPage>> {
    let page = state.services.catalog.list_books_with_timeout(&query).await?;
    Ok(Json(page))
}

/// Get a book by ID
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    security(("token" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book", body = Book),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_book(
    State(state): State<AppState>,
    PathParam(id): PathParam<i32>,
) -> AppResult<Json<Book>> {
    let book = state.services.catalog.get_book(id).await?;
    Ok(Json(book))
}

/// Create a book (admin only)
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    security(("token" = [])),
    request_body = CreateBook,
    responses(
        (status = 201, description = "Book created", body = Book),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 403, description = "Admin role required", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    JsonBody(book): JsonBody<CreateBook>,
) -> AppResult<(StatusCode, Json<Book>)> {
    let created = state.services.catalog.create_book(book).await?;
    tracing::debug!("Book {} created by {}", created.id, claims.username);
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update the given fields of a book (admin only)
#[utoipa::path(
    put,
    path = "/books/{id}",
    tag = "books",
    security(("token" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    request_body = UpdateBook,
    responses(
        (status = 200, description = "Book updated", body = Book),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 403, description = "Admin role required", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_book(
    State(state): State<AppState>,
    PathParam(id): PathParam<i32>,
    JsonBody(changes): JsonBody<UpdateBook>,
) -> AppResult<Json<Book>> {
    let updated = state.services.catalog.update_book(id, changes).await?;
    Ok(Json(updated))
}

/// Delete a book (admin only)
#[utoipa::path(
    delete,
    path = "/books/{id}",
    tag = "books",
    security(("token" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book deleted", body = MessageResponse),
        (status = 403, description = "Admin role required", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_book(
    State(state): State<AppState>,
    PathParam(id): PathParam<i32>,
) -> AppResult<Json<MessageResponse>> {
    state.services.catalog.delete_book(id).await?;
    Ok(Json(MessageResponse::new("Book deleted")))
}

/// Books published within a year range, both ends inclusive
#[utoipa::path(
    get,
    path = "/books/year-range",
    tag = "books",
    security(("token" = [])),
    params(YearRangeQuery),
    responses(
        (status = 200, description = "Matching books", body = Vec<Book>),
        (status = 400, description = "Missing or non-numeric year", body = crate::error::ErrorResponse),
        (status = 500, description = "Error fetching books", body = crate::error::ErrorResponse)
    )
)]
pub async fn books_by_year_range(
    State(state): State<AppState>,
    QueryParams(range): QueryParams<YearRangeQuery>,
) -> AppResult<Json<Vec<Book>>> {
    let books = state
        .services
        .catalog
        .books_by_year_range(range.start_year, range.end_year)
        .await?;
    Ok(Json(books))
}

/// Number of books per author
#[utoipa::path(
    get,
    path = "/books/count-by-author",
    tag = "books",
    security(("token" = [])),
    responses(
        (status = 200, description = "Book count per author", body = Vec<AuthorCount>)
    )
)]
pub async fn count_by_author(State(state): State<AppState>) -> AppResult<Json<Vec<AuthorCount>>> {
    let counts = state.services.catalog.count_by_author().await?;
    Ok(Json(counts))
}

/// Set the publisher of every book in a single transaction
#[utoipa::path(
    post,
    path = "/books/publisher",
    tag = "books",
    security(("token" = [])),
    params(PublisherQuery),
    responses(
        (status = 200, description = "Publisher updated", body = MessageResponse),
        (status = 400, description = "Missing or non-numeric publisher", body = crate::error::ErrorResponse),
        (status = 500, description = "Error updating publisher", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_publisher(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<PublisherQuery>,
) -> AppResult<Json<MessageResponse>> {
    state
        .services
        .catalog
        .set_publisher_for_all(query.publisher)
        .await?;
    Ok(Json(MessageResponse::new("Publisher updated successfully")))
}
