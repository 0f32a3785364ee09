//! Authentication endpoints

use axum::{extract::State, http::HeaderMap, http::StatusCode, Json};
use validator::Validate;

use crate::{
    error::AppResult,
    models::user::{LoginRequest, MessageResponse, RegisterRequest, TokenResponse},
    AppState,
};

use super::{middleware::token_from_headers, JsonBody};

/// Exchange credentials for a token
#[utoipa::path(
    post,
    path = "/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Access token", body = TokenResponse),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 401, description = "Unknown user, wrong password or no role", body = crate::error::ErrorResponse),
        (status = 500, description = "Could not create token", body = crate::error::ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    request.validate()?;

    let role = state
        .services
        .users
        .authenticate(&request.username, &request.password)
        .await?;
    let token = state.services.tokens.issue(&request.username, &role)?;

    tracing::info!("User {} logged in", request.username);
    Ok(Json(TokenResponse { token }))
}

/// Register a new account
#[utoipa::path(
    post,
    path = "/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = MessageResponse),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 409, description = "User already exists", body = crate::error::ErrorResponse)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<RegisterRequest>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    request.validate()?;

    state
        .services
        .users
        .register(&request.username, &request.password, request.role_or_default())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("user registered successfully")),
    ))
}

/// Swap a token that is about to expire, or expired moments ago, for a fresh one
#[utoipa::path(
    post,
    path = "/refresh",
    tag = "auth",
    security(("token" = [])),
    responses(
        (status = 200, description = "New access token", body = TokenResponse),
        (status = 400, description = "Token not expired enough", body = crate::error::ErrorResponse),
        (status = 401, description = "Missing, forged or long expired token", body = crate::error::ErrorResponse),
        (status = 500, description = "Could not create token", body = crate::error::ErrorResponse)
    )
)]
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<TokenResponse>> {
    let token = state.services.tokens.refresh(token_from_headers(&headers)?)?;
    Ok(Json(TokenResponse { token }))
}
