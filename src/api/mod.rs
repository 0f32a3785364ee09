//! API handlers for Bookshelf REST endpoints

pub mod auth;
pub mod books;
pub mod health;
pub mod middleware;
pub mod openapi;

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts},
    http::request::Parts,
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{error::AppError, models::user::ADMIN_ROLE, models::TokenClaims, AppState};

use self::middleware::RequiredRole;

/// JSON request body; malformed bodies become a 400 with the usual error shape
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

/// Query string; unparsable values become a 400
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct QueryParams<T>(pub T);

/// Path segment; unparsable values become a 400
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct PathParam<T>(pub T);

/// Claims attached by [`middleware::require_auth`]
pub struct AuthenticatedUser(pub TokenClaims);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<TokenClaims>()
            .cloned()
            .map(AuthenticatedUser)
            .ok_or_else(|| AppError::Unauthorized("unauthorized".to_string()))
    }
}

/// Create the application router with all routes
pub fn router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let admin_only = axum::middleware::from_fn_with_state(
        RequiredRole::new(&state, ADMIN_ROLE),
        middleware::require_role,
    );

    // Token required; writes additionally need the admin role
    let protected = Router::new()
        .route(
            "/books",
            get(books::list_books).merge(post(books::create_book).route_layer(admin_only.clone())),
        )
        .route("/books/with-timeout", get(books::list_books_with_timeout))
        .route("/books/year-range", get(books::books_by_year_range))
        .route("/books/count-by-author", get(books::count_by_author))
        .route("/books/publisher", post(books::update_publisher))
        .route(
            "/books/:id",
            get(books::get_book).merge(
                put(books::update_book)
                    .delete(books::delete_book)
                    .route_layer(admin_only),
            ),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    let public = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Authentication
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .route("/refresh", post(auth::refresh));

    Router::new()
        .merge(public)
        .merge(protected)
        .with_state(state)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
