//! Token and role guards
//!
//! Both guards short-circuit with the standard error body; on success the
//! verified claims travel in the request extensions.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::{
    error::{AppError, AppResult},
    models::TokenClaims,
    services::tokens::TokenService,
    AppState,
};

/// Token from the `Authorization` header: the raw value, or the part after `Bearer `
pub fn token_from_headers(headers: &HeaderMap) -> AppResult<&str> {
    let value = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::Unauthorized("unauthorized".to_string()))?;

    Ok(value.strip_prefix("Bearer ").unwrap_or(value))
}

/// Reject requests without a valid, unexpired token
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = state.services.tokens.verify(token_from_headers(req.headers())?)?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Role a route demands, fixed when the route is registered
#[derive(Clone)]
pub struct RequiredRole {
    tokens: TokenService,
    role: Arc<str>,
}

impl RequiredRole {
    pub fn new(state: &AppState, role: &str) -> Self {
        Self {
            tokens: state.services.tokens.clone(),
            role: Arc::from(role),
        }
    }
}

/// Reject requests whose token role differs from the required one
pub async fn require_role(
    State(required): State<RequiredRole>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let attached = req.extensions().get::<TokenClaims>().cloned();
    let claims = match attached {
        Some(claims) => claims,
        None => {
            let claims = required.tokens.verify(token_from_headers(req.headers())?)?;
            req.extensions_mut().insert(claims.clone());
            claims
        }
    };

    if !claims.has_role(&required.role) {
        tracing::debug!(
            "User {} with role {:?} denied, {:?} required",
            claims.username,
            claims.role,
            required.role
        );
        return Err(AppError::Forbidden("forbidden".to_string()));
    }

    Ok(next.run(req).await)
}
