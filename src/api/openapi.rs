//! OpenAPI documentation

use axum::Router;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, books, health};

/// Registers the `Authorization` header scheme used by protected routes
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "token",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                "Authorization",
                "Token from POST /login, raw or prefixed with `Bearer `",
            ))),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Bookshelf API",
        version = "1.0.0",
        description = "Book catalog REST API with token authentication"
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::login,
        auth::register,
        auth::refresh,
        // Books
        books::list_books,
        books::list_books_with_timeout,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        books::books_by_year_range,
        books::count_by_author,
        books::update_publisher,
    ),
    components(
        schemas(
            // Auth
            crate::models::user::LoginRequest,
            crate::models::user::RegisterRequest,
            crate::models::user::TokenResponse,
            crate::models::user::MessageResponse,
            // Books
            crate::models::book::Book,
            crate::models::book::CreateBook,
            crate::models::book::UpdateBook,
            crate::models::book::BookPage,
            crate::models::book::AuthorCount,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Login, registration and token refresh"),
        (name = "books", description = "Book catalog")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_book_routes_and_token_scheme() {
        let doc = ApiDoc::openapi();

        for path in ["/books", "/books/{id}", "/books/year-range", "/login", "/refresh"] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
        let schemes = doc
            .components
            .as_ref()
            .map(|c| c.security_schemes.contains_key("token"));
        assert_eq!(schemes, Some(true));
    }
}
